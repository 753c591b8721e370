//! Derivation of the request urls of a build, from a build url like
//! <https://ci.example.com/job/foo/42>.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::{
    API_SUFFIX, ARTIFACT_BASE_PATTERN, ARTIFACT_SEGMENT, CONSOLE_SUFFIX, ENV_VARS_SUFFIX,
};

static ARTIFACT_BASE_REGEX: OnceLock<Regex> = OnceLock::new();

/// The resources of a build that make up a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resource {
    Metadata,
    Console,
    Environment,
}

impl Resource {
    pub(crate) const ALL: [Self; 3] = [Self::Metadata, Self::Console, Self::Environment];

    pub(crate) fn description(self) -> &'static str {
        match self {
            Self::Metadata => "build metadata",
            Self::Console => "console log",
            Self::Environment => "injected environment variables",
        }
    }
}

/// Urls derived from a single build reference, by plain string concatenation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildEndpoints {
    /// The build reference as given on the command line
    pub build: String,
    /// `{build}/api/json`
    pub metadata: String,
    /// `{build}/consoleText`
    pub console: String,
    /// `{build}/injectedEnvVars/api/json`
    pub environment: String,
}

impl BuildEndpoints {
    /// Derives the request urls of a build. The reference is not validated.
    #[must_use]
    pub fn new(build: &str) -> Self {
        Self {
            build: build.into(),
            metadata: format!("{build}{API_SUFFIX}"),
            console: format!("{build}{CONSOLE_SUFFIX}"),
            environment: format!("{build}{ENV_VARS_SUFFIX}"),
        }
    }

    pub(crate) fn url(&self, resource: Resource) -> &str {
        match resource {
            Resource::Metadata => &self.metadata,
            Resource::Console => &self.console,
            Resource::Environment => &self.environment,
        }
    }

    /// Base path for artifact download links: the first five `/`-terminated
    /// segments of the build reference plus the one after them.
    /// Empty if the reference is too short to match.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn artifact_base(&self) -> &str {
        let re = ARTIFACT_BASE_REGEX
            .get_or_init(|| Regex::new(ARTIFACT_BASE_PATTERN).expect("the pattern should be valid"));
        re.find(&self.build).map_or("", |x| x.as_str())
    }

    /// Download link of an artifact, given its path relative to the build.
    #[must_use]
    pub fn artifact_url(&self, relative_path: &str) -> String {
        format!("{}{ARTIFACT_SEGMENT}{relative_path}", self.artifact_base())
    }
}

#[test]
fn derive_request_urls() {
    let build = "https://ci.example.com/job/foo/42";
    let endpoints = BuildEndpoints::new(build);
    debug_assert_eq!(endpoints.metadata, format!("{build}/api/json"));
    debug_assert_eq!(endpoints.console, format!("{build}/consoleText"));
    debug_assert_eq!(
        endpoints.environment,
        format!("{build}/injectedEnvVars/api/json")
    );
    for (resource, url) in Resource::ALL.into_iter().zip([
        &endpoints.metadata,
        &endpoints.console,
        &endpoints.environment,
    ]) {
        debug_assert_eq!(endpoints.url(resource), url);
    }
}

#[test]
fn derive_without_normalizing() {
    // trailing slashes are kept as is, Jenkins tolerates the double slash
    let endpoints = BuildEndpoints::new("http://localhost:8080/job/bar/7/");
    debug_assert_eq!(endpoints.metadata, "http://localhost:8080/job/bar/7//api/json");
    let endpoints = BuildEndpoints::new("");
    debug_assert_eq!(endpoints.console, "/consoleText");
}

#[test]
fn artifact_base_path() {
    let cases = [
        (
            "https://ci.example.com/job/foo/42",
            "https://ci.example.com/job/foo/42",
        ),
        (
            "https://ci.example.com/job/foo/42/console",
            "https://ci.example.com/job/foo/42",
        ),
        (
            "https://ci.example.com/job/foo/42?depth=1",
            "https://ci.example.com/job/foo/42?depth=1",
        ),
        // jobs in folders lose their build number
        (
            "https://ci.example.com/job/team/job/foo/42",
            "https://ci.example.com/job/team/job",
        ),
        ("https://ci.example.com/job", ""),
        ("https://ci.example.com/job/foo/", ""),
        ("", ""),
    ];
    for (build, base) in cases {
        eprintln!("{build} => {base}");
        debug_assert_eq!(BuildEndpoints::new(build).artifact_base(), base);
    }
}

#[test]
fn artifact_download_url() {
    let endpoints = BuildEndpoints::new("https://ci.example.com/job/foo/42");
    debug_assert_eq!(
        endpoints.artifact_url("out/app.zip"),
        "https://ci.example.com/job/foo/42/artifact/out/app.zip"
    );
    // degrades to an empty prefix
    let endpoints = BuildEndpoints::new("https://ci.example.com");
    debug_assert_eq!(endpoints.artifact_url("out/app.zip"), "/artifact/out/app.zip");
}
