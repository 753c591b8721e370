use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
/// Environment variables injected into a build,
/// decoded from `{build}/injectedEnvVars/api/json`.
pub struct EnvironmentMap {
    /// Variables in the order of the document, see [`EnvironmentMap::sorted`]
    pub env_map: IndexMap<String, String>,
}

impl EnvironmentMap {
    /// Sorts the variables by name, so that reports are reproducible.
    #[must_use]
    pub fn sorted(mut self) -> Self {
        self.env_map.sort_unstable_keys();
        self
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.env_map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.env_map.len()
    }

    /// Whether no variable was injected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.env_map.is_empty()
    }
}

/// Raw console output of a build, kept byte for byte.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsoleLog(pub Vec<u8>);

impl ConsoleLog {
    /// The log as it was received.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ConsoleLog {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[test]
fn decode_and_sort_environment() {
    let body = r#"{
        "_class": "org.jenkinsci.plugins.envinject.EnvInjectVarList",
        "envMap": {"BUILD_ID": "42", "BRANCH": "main", "HOME": "/var/lib/jenkins"}
    }"#;
    let env: EnvironmentMap = serde_json::from_str(body).unwrap();
    let names: Vec<_> = env.iter().map(|(k, _)| k).collect();
    assert_eq!(names, ["BUILD_ID", "BRANCH", "HOME"]);
    let env = env.sorted();
    let pairs: Vec<_> = env.iter().collect();
    assert_eq!(
        pairs,
        [
            ("BRANCH", "main"),
            ("BUILD_ID", "42"),
            ("HOME", "/var/lib/jenkins")
        ]
    );
    assert_eq!(env.len(), 3);
}

#[test]
fn environment_requires_env_map() {
    let err = serde_json::from_str::<EnvironmentMap>(r#"{"_class": "x"}"#).unwrap_err();
    assert!(err.to_string().contains("envMap"));
    let env: EnvironmentMap = serde_json::from_str(r#"{"envMap": {}}"#).unwrap();
    assert!(env.is_empty());
}
