use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull};
use std::fmt::Display;

use crate::BuildResult;

#[serde_as]
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
/// Metadata of a single build, decoded from `{build}/api/json`.
///
/// Decoding is tolerant: unknown fields are ignored, and missing fields
/// (or `null` strings, as Jenkins sends for e.g. an empty description)
/// fall back to their default.
pub struct BuildRecord {
    /// Java class of the build, e.g. `hudson.model.FreeStyleBuild`
    #[serde(rename = "_class")]
    pub class: Option<String>,
    /// Job name followed by the build name, e.g. `foo #42`
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub full_display_name: String,
    /// Build name, `#42` unless renamed
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub display_name: String,
    /// Free text set by the job or by a user
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub description: String,
    /// Whether the build is still running
    #[serde(default)]
    pub building: bool,
    /// Duration in milliseconds, `0` while building
    #[serde(default)]
    pub duration: u64,
    /// Estimated duration in milliseconds, `-1` if unknown
    #[serde(default)]
    pub estimated_duration: i64,
    /// Start time in milliseconds since the unix epoch
    #[serde(default)]
    pub timestamp: u64,
    /// Absent while building
    pub result: Option<BuildResult>,
    /// Name of the agent that ran the build, empty for the built-in node
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub built_on: String,
    /// Canonical url of the build, as known to Jenkins
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub url: String,
    /// Build id, same as the number for recent Jenkins
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub id: String,
    /// Build number
    #[serde(default)]
    pub number: u64,
    /// Id of the queue item the build started from
    #[serde(default)]
    pub queue_id: u64,
    /// Whether the build is kept forever
    #[serde(default)]
    pub keep_log: bool,
    /// Actions attached to the build, most of them are empty objects
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub actions: Vec<ActionRecord>,
    /// Archived artifacts
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub artifacts: Vec<ArtifactRecord>,
    /// Executor running the build, `null` once it finished
    pub executor: Option<ExecutorRecord>,
}

impl BuildRecord {
    /// Build parameters of all actions, in their original order.
    pub fn parameters(&self) -> impl Iterator<Item = &ParameterRecord> {
        self.actions.iter().flat_map(|x| &x.parameters)
    }

    /// Causes of all actions, in their original order.
    pub fn causes(&self) -> impl Iterator<Item = &CauseRecord> {
        self.actions.iter().flat_map(|x| &x.causes)
    }

    /// Duration in whole seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration / 1000
    }

    /// Duration in whole minutes.
    #[must_use]
    pub fn duration_mins(&self) -> u64 {
        self.duration_secs() / 60
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Default, Clone)]
/// A single entry of the `actions` of a build.
pub struct ActionRecord {
    /// Java class of the action
    #[serde(rename = "_class")]
    pub class: Option<String>,
    /// Parameters of a `hudson.model.ParametersAction`
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub parameters: Vec<ParameterRecord>,
    /// Causes of a `hudson.model.CauseAction`
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnNull")]
    pub causes: Vec<CauseRecord>,
}

#[derive(Deserialize, Debug, Default, Clone)]
/// A build parameter, whose value may be any JSON scalar
/// depending on the parameter type (string, boolean, ...).
pub struct ParameterRecord {
    /// Java class of the parameter, e.g. `hudson.model.StringParameterValue`
    #[serde(rename = "_class")]
    pub class: Option<String>,
    /// Parameter name, usually upper case
    #[serde(default)]
    pub name: String,
    /// Parameter value, `null` for e.g. password parameters
    #[serde(default)]
    pub value: Value,
}

impl ParameterRecord {
    /// Unquoted text of the value, empty for `null`.
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::Null => "".into(),
            Value::String(x) => x.clone(),
            x => x.to_string(),
        }
    }
}

impl Display for ParameterRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{{{class} {} {}}}", self.name, self.value_text()),
            None => write!(f, "{{{} {}}}", self.name, self.value_text()),
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
/// Why a build was started, e.g. by a user or an upstream build.
pub struct CauseRecord {
    /// Java class of the cause, e.g. `hudson.model.Cause$UserIdCause`
    #[serde(rename = "_class")]
    pub class: Option<String>,
    /// e.g. `Started by user admin`
    pub short_description: Option<String>,
    /// Number of the upstream build that triggered this one
    pub upstream_build: Option<u64>,
    /// Full name of the upstream job
    pub upstream_project: Option<String>,
    /// Url of the upstream build, relative to the Jenkins root
    pub upstream_url: Option<String>,
    /// Name of the user who started the build
    pub user_name: Option<String>,
}

impl Display for CauseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = self
            .short_description
            .as_deref()
            .or(self.class.as_deref())
            .unwrap_or("unknown cause");
        write!(f, "{description}")?;
        if let (Some(project), Some(build)) = (&self.upstream_project, self.upstream_build) {
            write!(f, " ({project} #{build})")?;
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
/// An archived artifact of a build.
pub struct ArtifactRecord {
    /// Shortened path shown by Jenkins, `null` unless it is ambiguous
    pub display_path: Option<String>,
    /// Base name of the file
    #[serde(default)]
    pub file_name: String,
    /// Path relative to the artifact root of the build
    #[serde(default)]
    pub relative_path: String,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
/// The executor slot of a running build.
pub struct ExecutorRecord {
    /// Whether the executor is idle
    pub idle: Option<bool>,
    /// Whether the build takes much longer than estimated
    pub likely_stuck: Option<bool>,
    /// Slot number, `-1` for flyweight executors
    pub number: Option<i64>,
    /// Estimated progress in percent, `-1` if unknown
    pub progress: Option<i64>,
}

#[cfg(test)]
use insta::assert_snapshot;

#[test]
fn decode_finished_build() {
    let body = r##"{
        "_class": "hudson.model.FreeStyleBuild",
        "actions": [
            {
                "_class": "hudson.model.CauseAction",
                "causes": [
                    {
                        "_class": "hudson.model.Cause$UpstreamCause",
                        "shortDescription": "Started by upstream project \"bar\" build number 7",
                        "upstreamBuild": 7,
                        "upstreamProject": "bar",
                        "upstreamUrl": "job/bar/"
                    }
                ]
            },
            {},
            {
                "_class": "hudson.model.ParametersAction",
                "parameters": [
                    {"_class": "hudson.model.StringParameterValue", "name": "BRANCH", "value": "main"},
                    {"_class": "hudson.model.BooleanParameterValue", "name": "DEPLOY", "value": false}
                ]
            }
        ],
        "artifacts": [
            {"displayPath": null, "fileName": "app.zip", "relativePath": "out/app.zip"}
        ],
        "building": false,
        "builtOn": "agent-1",
        "changeSet": {"_class": "hudson.scm.EmptyChangeLogSet", "items": [], "kind": null},
        "culprits": [],
        "description": null,
        "displayName": "#42",
        "duration": 125000,
        "estimatedDuration": 120000,
        "executor": null,
        "fullDisplayName": "Job #42",
        "id": "42",
        "keepLog": false,
        "number": 42,
        "queueId": 1234,
        "result": "SUCCESS",
        "timestamp": 1700000000000,
        "url": "https://ci.example.com/job/foo/42/"
    }"##;
    let record: BuildRecord = serde_json::from_str(body).unwrap();
    assert_eq!(record.full_display_name, "Job #42");
    assert_eq!(record.description, "");
    assert_eq!(record.result, Some(BuildResult::Success));
    assert_eq!((record.duration_secs(), record.duration_mins()), (125, 2));
    assert!(record.executor.is_none());
    assert_eq!(record.artifacts[0].display_path, None);
    assert_eq!(record.artifacts[0].relative_path, "out/app.zip");
    let parameters: Vec<String> = record.parameters().map(ToString::to_string).collect();
    assert_snapshot!(parameters.join("\n"), @r"
    {hudson.model.StringParameterValue BRANCH main}
    {hudson.model.BooleanParameterValue DEPLOY false}
    ");
    let causes: Vec<String> = record.causes().map(ToString::to_string).collect();
    assert_snapshot!(causes.join("\n"), @r#"Started by upstream project "bar" build number 7 (bar #7)"#);
}

#[test]
fn decode_running_build() {
    let body = r#"{
        "building": true,
        "duration": 0,
        "estimatedDuration": -1,
        "executor": {"_class": "hudson.model.OneOffExecutor", "idle": false, "likelyStuck": false, "number": -1, "progress": -1},
        "fullDisplayName": "Job #43",
        "result": null
    }"#;
    let record: BuildRecord = serde_json::from_str(body).unwrap();
    assert!(record.building);
    assert_eq!(record.result, None);
    assert_eq!(record.estimated_duration, -1);
    assert!(record.actions.is_empty());
    assert_eq!(record.parameters().count(), 0);
    let executor = record.executor.as_ref().unwrap();
    assert_eq!((executor.number, executor.progress), (Some(-1), Some(-1)));
}

#[test]
fn display_parameters() {
    let cases = [
        (None, "NAME", Value::String("value".into()), "{NAME value}"),
        (Some("p.Param"), "EMPTY", Value::Null, "{p.Param EMPTY }"),
        (Some("p.Param"), "COUNT", serde_json::json!(3), "{p.Param COUNT 3}"),
    ];
    for (class, name, value, text) in cases {
        let parameter = ParameterRecord {
            class: class.map(Into::into),
            name: name.into(),
            value,
        };
        assert_eq!(parameter.to_string(), text);
    }
}
