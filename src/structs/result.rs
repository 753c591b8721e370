use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{convert::Infallible, fmt::Display, str::FromStr};

/// Outcome of a finished build, as reported in the `result` field.
///
/// Jenkins leaves the field `null` while the build is running, so it is
/// always held in an [`Option`]. Values unknown to this crate are kept
/// verbatim in [`BuildResult::Other`].
#[derive(DeserializeFromStr, SerializeDisplay, Debug, Clone, PartialEq, Eq)]
pub enum BuildResult {
    /// `SUCCESS`
    Success,
    /// `UNSTABLE`, e.g. with failing tests
    Unstable,
    /// `FAILURE`
    Failure,
    /// `NOT_BUILT`
    NotBuilt,
    /// `ABORTED`
    Aborted,
    /// Any other value
    Other(String),
}

impl FromStr for BuildResult {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "SUCCESS" => Self::Success,
            "UNSTABLE" => Self::Unstable,
            "FAILURE" => Self::Failure,
            "NOT_BUILT" => Self::NotBuilt,
            "ABORTED" => Self::Aborted,
            x => Self::Other(x.into()),
        })
    }
}

impl Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
            Self::Other(x) => x,
        };
        write!(f, "{result}")
    }
}

#[test]
fn parse_and_display_results() {
    for result in ["SUCCESS", "UNSTABLE", "FAILURE", "NOT_BUILT", "ABORTED", "CYCLE"] {
        let parsed: BuildResult = serde_json::from_str(&format!(r#""{result}""#)).unwrap();
        debug_assert_eq!(parsed.to_string(), result);
    }
    let parsed: BuildResult = "FAILURE".parse().unwrap();
    assert_eq!(parsed, BuildResult::Failure);
    let parsed: BuildResult = "CYCLE".parse().unwrap();
    assert_eq!(parsed, BuildResult::Other("CYCLE".into()));
    let serialized = serde_json::to_string(&BuildResult::NotBuilt).unwrap();
    assert_eq!(serialized, r#""NOT_BUILT""#);
}
