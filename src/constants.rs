//! Useful constants shared across the program

/// Suffix of the JSON API of a Jenkins resource.
///
/// See <http://jenkinsapi.readthedocs.io/en/latest> for the conventions
/// used by Jenkins to expose its objects.
///
/// ```
/// assert_eq!(jenkins_build_report::constants::API_SUFFIX, "/api/json");
/// ```
///
pub const API_SUFFIX: &str = "/api/json";

/// Suffix of the plain text console output of a build.
pub const CONSOLE_SUFFIX: &str = "/consoleText";

/// Suffix of the environment variables injected into a build,
/// provided by the [EnvInject](https://plugins.jenkins.io/envinject/) plugin.
///
/// ```
/// assert_eq!(
///     jenkins_build_report::constants::ENV_VARS_SUFFIX,
///     "/injectedEnvVars/api/json"
/// );
/// ```
///
pub const ENV_VARS_SUFFIX: &str = "/injectedEnvVars/api/json";

/// Path segment under which Jenkins serves the archived artifacts of a build.
pub const ARTIFACT_SEGMENT: &str = "/artifact/";

/// Positional pattern that cuts a build url down to its build number segment,
/// e.g. `https://ci.example.com/job/foo/42`.
///
/// Note that this only accounts for top level jobs: jobs nested in folders
/// are truncated before their build number.
pub const ARTIFACT_BASE_PATTERN: &str = r"^(?:[^/]*/){5}[^/]+";

/// User agent header that we send along to Jenkins for identifying this app.
///
/// ```
/// assert!(
///     jenkins_build_report::constants::APP_USER_AGENT.starts_with("jenkins-build-report/")
/// );
/// ```
///
pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
