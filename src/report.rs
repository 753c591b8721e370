//! A module that decodes the resources of a build and renders them
//! as a plain text report, in a fixed order of sections.

use anyhow::Context;
use log::debug;
use std::io::Write;

#[cfg(test)]
use insta::assert_snapshot;

use crate::{
    fetch::BuildBodies, BuildEndpoints, BuildRecord, ConsoleLog, EnvironmentMap, ReportConfig,
    Resource,
};

/// Everything that is known about a single build, ready to be printed.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Urls the report was fetched from
    pub endpoints: BuildEndpoints,
    /// Decoded build metadata
    pub record: BuildRecord,
    /// Injected environment variables, sorted by name
    pub environment: EnvironmentMap,
    /// Console output, verbatim
    pub console: ConsoleLog,
}

impl BuildReport {
    /// Decodes the fetched resources. Both JSON documents must decode,
    /// a body that is not what Jenkins would send is an error.
    pub(crate) fn from_bodies(
        endpoints: BuildEndpoints,
        bodies: BuildBodies,
    ) -> anyhow::Result<Self> {
        let record: BuildRecord = serde_json::from_slice(&bodies.metadata).with_context(|| {
            format!(
                "could not decode the {} from {}",
                Resource::Metadata.description(),
                endpoints.metadata
            )
        })?;
        let environment: EnvironmentMap = serde_json::from_slice(&bodies.environment)
            .with_context(|| {
                format!(
                    "could not decode the {} from {}",
                    Resource::Environment.description(),
                    endpoints.environment
                )
            })?;
        Ok(Self {
            endpoints,
            record,
            environment: environment.sorted(),
            console: bodies.console.into(),
        })
    }

    /// Writes the report. The console log is written as raw bytes,
    /// everything before it is UTF-8 text.
    pub fn write_to(&self, w: &mut impl Write) -> std::io::Result<()> {
        let record = &self.record;
        let result = record.result.as_ref().map(ToString::to_string);
        let duration = format!(
            "{} sec | {} min",
            record.duration_secs(),
            record.duration_mins()
        );
        let timestamp = record.timestamp.to_string();
        let header = [
            ("Name", record.full_display_name.as_str()),
            ("Description", record.description.as_str()),
            ("IsBuilding", if record.building { "true" } else { "false" }),
            ("Duration", duration.as_str()),
            ("Build Timestamp", timestamp.as_str()),
            ("URL", record.url.as_str()),
            ("BuiltOn", record.built_on.as_str()),
            ("Result", result.as_deref().unwrap_or_default()),
        ];
        for (key, value) in header {
            match value {
                "" => writeln!(w, "[{key}]")?,
                value => writeln!(w, "[{key}] {value}")?,
            }
        }

        writeln!(w)?; // vertical separation
        writeln!(w, "[Parameters]")?;
        for parameter in record.parameters() {
            writeln!(w, "{parameter}")?;
        }

        writeln!(w)?;
        writeln!(w, "[Environment variables]")?;
        for (name, value) in self.environment.iter() {
            writeln!(w, "{name} = {value}")?;
        }

        writeln!(w)?;
        writeln!(w, "[Artifacts]")?;
        for artifact in &record.artifacts {
            writeln!(w, "{}", self.endpoints.artifact_url(&artifact.relative_path))?;
        }

        writeln!(w)?;
        writeln!(w, "[Console Log]")?;
        w.write_all(self.console.as_bytes())
    }

    /// Renders the whole report into memory.
    #[must_use]
    #[allow(clippy::missing_panics_doc)]
    pub fn render(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)
            .expect("writing into a Vec should not fail");
        buf
    }
}

impl ReportConfig {
    /// Fetches and decodes all resources of the configured build.
    pub fn fetch_report(&self) -> anyhow::Result<BuildReport> {
        let endpoints = BuildEndpoints::new(&self.build);
        let bodies = self.fetch_bodies(&endpoints)?;
        let report = BuildReport::from_bodies(endpoints, bodies)?;
        for cause in report.record.causes() {
            debug!("cause: {cause}");
        }
        Ok(report)
    }

    /// Fetches the report and writes it out in one go.
    /// Nothing is written if any of the fetches fails.
    pub fn write_report(&self, w: &mut impl Write) -> anyhow::Result<()> {
        let report = self.fetch_report()?.render();
        w.write_all(&report)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
const METADATA: &str = r#"{
    "_class": "hudson.model.FreeStyleBuild",
    "actions": [
        {"_class": "hudson.model.CauseAction", "causes": [{"shortDescription": "Started by user admin", "userName": "admin"}]},
        {"_class": "hudson.model.ParametersAction", "parameters": [
            {"_class": "hudson.model.StringParameterValue", "name": "BRANCH", "value": "main"},
            {"_class": "hudson.model.BooleanParameterValue", "name": "DEPLOY", "value": true}
        ]},
        {}
    ],
    "artifacts": [
        {"displayPath": null, "fileName": "app.zip", "relativePath": "out/app.zip"},
        {"displayPath": "report.html", "fileName": "report.html", "relativePath": "docs/report.html"}
    ],
    "building": false,
    "builtOn": "agent-1",
    "description": "nightly",
    "duration": 125000,
    "executor": null,
    "fullDisplayName": "Job #42",
    "number": 42,
    "result": "SUCCESS",
    "timestamp": 1700000000000,
    "url": "https://ci.example.com/job/foo/42/"
}"#;

#[cfg(test)]
const ENVIRONMENT: &str = r#"{"envMap": {"BUILD_ID": "42", "BRANCH": "main"}}"#;

#[cfg(test)]
fn report_from(
    build: &str,
    metadata: &str,
    console: &[u8],
    environment: &str,
) -> anyhow::Result<BuildReport> {
    BuildReport::from_bodies(
        BuildEndpoints::new(build),
        BuildBodies {
            metadata: metadata.into(),
            console: console.into(),
            environment: environment.into(),
        },
    )
}

#[test]
fn render_report() {
    let report = report_from(
        "https://ci.example.com/job/foo/42",
        METADATA,
        b"Building in workspace /var/lib/jenkins/workspace/foo\nFinished: SUCCESS\n",
        ENVIRONMENT,
    )
    .unwrap();
    let text = String::from_utf8(report.render()).unwrap();
    assert_snapshot!(text, @r"
    [Name] Job #42
    [Description] nightly
    [IsBuilding] false
    [Duration] 125 sec | 2 min
    [Build Timestamp] 1700000000000
    [URL] https://ci.example.com/job/foo/42/
    [BuiltOn] agent-1
    [Result] SUCCESS

    [Parameters]
    {hudson.model.StringParameterValue BRANCH main}
    {hudson.model.BooleanParameterValue DEPLOY true}

    [Environment variables]
    BRANCH = main
    BUILD_ID = 42

    [Artifacts]
    https://ci.example.com/job/foo/42/artifact/out/app.zip
    https://ci.example.com/job/foo/42/artifact/docs/report.html

    [Console Log]
    Building in workspace /var/lib/jenkins/workspace/foo
    Finished: SUCCESS
    ");
}

#[test]
fn render_running_build() {
    let metadata = r#"{"building": true, "description": null, "duration": 0, "fullDisplayName": "Job #43", "result": null, "timestamp": 1700000000000}"#;
    let report = report_from(
        "https://ci.example.com/job/foo/43",
        metadata,
        b"",
        r#"{"envMap": {}}"#,
    )
    .unwrap();
    let text = String::from_utf8(report.render()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "[Name] Job #43",
            "[Description]",
            "[IsBuilding] true",
            "[Duration] 0 sec | 0 min",
            "[Build Timestamp] 1700000000000",
            "[URL]",
            "[BuiltOn]",
            "[Result]",
            "",
            "[Parameters]",
            "",
            "[Environment variables]",
            "",
            "[Artifacts]",
            "",
            "[Console Log]",
        ]
    );
}

#[test]
fn duration_is_floored() {
    let metadata = r#"{"duration": 119999}"#;
    let report = report_from("https://ci/job/a/1", metadata, b"", r#"{"envMap": {}}"#).unwrap();
    let text = String::from_utf8(report.render()).unwrap();
    assert!(text.contains("[Duration] 119 sec | 1 min\n"));
}

#[test]
fn list_each_variable_once() {
    let report = report_from("https://ci/job/a/1", METADATA, b"", ENVIRONMENT).unwrap();
    let text = String::from_utf8(report.render()).unwrap();
    for pair in ["BRANCH = main", "BUILD_ID = 42"] {
        assert_eq!(text.lines().filter(|line| *line == pair).count(), 1);
    }
}

#[test]
fn artifacts_without_base_path() {
    // too few segments in the build url: the links lose their prefix
    let report = report_from("https://ci", METADATA, b"", ENVIRONMENT).unwrap();
    let text = String::from_utf8(report.render()).unwrap();
    assert!(text.contains("\n/artifact/out/app.zip\n"));
}

#[test]
fn console_is_verbatim() {
    let console: &[u8] = b"line 1\r\n\x1b[31mred\x1b[0m\n\x00\xff\xfe invalid utf-8\nno trailing newline";
    let report = report_from("https://ci/job/a/1", METADATA, console, ENVIRONMENT).unwrap();
    let rendered = report.render();
    assert!(rendered.ends_with(console));
    let marker = b"[Console Log]\n";
    let start = rendered
        .windows(marker.len())
        .position(|x| x == marker)
        .unwrap()
        + marker.len();
    assert_eq!(&rendered[start..], console);
}

#[test]
fn abort_on_invalid_metadata() {
    let html = "<html><body>Jenkins is getting ready to work</body></html>";
    let err = report_from("https://ci/job/a/1", html, b"", ENVIRONMENT).unwrap_err();
    assert_snapshot!(
        err.to_string(),
        @"could not decode the build metadata from https://ci/job/a/1/api/json"
    );
    // the wrong shape is as fatal as invalid JSON
    let err = report_from("https://ci/job/a/1", r#"{"duration": "long"}"#, b"", ENVIRONMENT).unwrap_err();
    assert!(err.to_string().contains("build metadata"));
}

#[test]
fn abort_on_invalid_environment() {
    let err = report_from("https://ci/job/a/1", METADATA, b"", "[]").unwrap_err();
    assert_snapshot!(
        err.to_string(),
        @"could not decode the injected environment variables from https://ci/job/a/1/injectedEnvVars/api/json"
    );
}

#[test]
fn write_report_from_server() {
    let base = crate::fetch::serve(vec![
        ("/job/foo/42/api/json".into(), 200, METADATA.into()),
        ("/job/foo/42/consoleText".into(), 200, b"Finished: SUCCESS\n".to_vec()),
        ("/job/foo/42/injectedEnvVars/api/json".into(), 200, ENVIRONMENT.into()),
    ]);
    let build = format!("{base}/job/foo/42");
    let mut out = Vec::new();
    ReportConfig::new(&build).write_report(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("[Name] Job #42\n"));
    assert!(text.contains(&format!("{build}/artifact/out/app.zip\n")));
    assert!(text.ends_with("[Console Log]\nFinished: SUCCESS\n"));
}

#[test]
fn write_nothing_on_failure() {
    let base = crate::fetch::serve(vec![
        ("/job/foo/42/api/json".into(), 200, METADATA.into()),
        ("/job/foo/42/consoleText".into(), 200, b"Finished: SUCCESS\n".to_vec()),
        // no environment variables: 404
    ]);
    let mut out = Vec::new();
    let result = ReportConfig::new(&format!("{base}/job/foo/42")).write_report(&mut out);
    assert!(result.is_err());
    assert!(out.is_empty());

    let base = crate::fetch::serve(vec![
        ("/job/foo/42/api/json".into(), 200, b"not json".to_vec()),
        ("/job/foo/42/consoleText".into(), 200, b"Finished: SUCCESS\n".to_vec()),
        ("/job/foo/42/injectedEnvVars/api/json".into(), 200, ENVIRONMENT.into()),
    ]);
    let mut out = Vec::new();
    let result = ReportConfig::new(&format!("{base}/job/foo/42")).write_report(&mut out);
    assert!(result.is_err());
    assert!(out.is_empty());
}
