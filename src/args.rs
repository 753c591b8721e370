use clap::{value_parser, CommandFactory, Parser};
use clap_complete::Shell;
use flexi_logger::Logger;
use log::debug;
use std::{io::Write, time::Duration};

use crate::{log_format, BuildEndpoints};

#[cfg(test)]
use insta::assert_snapshot;

#[derive(Parser, Debug)]
#[command(author, version, verbatim_doc_comment)]
#[allow(rustdoc::bare_urls, clippy::doc_markdown)]
#[deny(missing_docs)]
///
/// Print a summary of a Jenkins build: its metadata, build parameters,
/// injected environment variables, artifact links and console log.
///
/// The build is given by its url, e.g.
///
///   https://ci.example.com/job/foo/42
///
/// from which the following resources are fetched:
///   - {build}/api/json
///   - {build}/consoleText
///   - {build}/injectedEnvVars/api/json
///
pub struct BuildReportCli {
    /// Build link
    #[arg(short, long, required_unless_present = "shell")]
    build: Option<String>,

    /// Only print the request urls, then exit
    #[arg(long)]
    url: bool,

    /// Timeout for each request in seconds, waits forever by default
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print more debugging information
    #[arg(short, long)]
    verbose: bool,

    /// Print generated completions for a given shell
    #[arg(long = "shell-completion", exclusive = true, value_parser = value_parser!(Shell))]
    shell: Option<Shell>,
}

/// Resolved configuration of a report, independent of the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Url of the build
    pub build: String,
    /// Timeout for each request, [`None`] to wait forever
    pub timeout: Option<Duration>,
    /// Only print the request urls
    pub url_only: bool,
}

impl ReportConfig {
    /// Configuration without any timeout, as large console logs
    /// may take a long time to download.
    #[must_use]
    pub fn new(build: &str) -> Self {
        Self {
            build: build.into(),
            timeout: None,
            url_only: false,
        }
    }

    /// Writes the report of the build, or only its urls
    /// followed by the artifact base path.
    pub fn run(&self, w: &mut impl Write) -> anyhow::Result<()> {
        if self.url_only {
            let endpoints = BuildEndpoints::new(&self.build);
            for url in [
                &endpoints.metadata,
                &endpoints.console,
                &endpoints.environment,
            ] {
                writeln!(w, "{url}")?;
            }
            writeln!(w, "{}", endpoints.artifact_base())?;
            return Ok(());
        }
        self.write_report(w)
    }
}

impl From<BuildReportCli> for ReportConfig {
    fn from(args: BuildReportCli) -> Self {
        Self {
            build: args.build.unwrap_or_default(),
            timeout: args.timeout.map(Duration::from_secs),
            url_only: args.url,
        }
    }
}

impl BuildReportCli {
    /// Parses the command line flags, exiting with code 1 on invalid
    /// arguments. Also prints shell completions if asked for.
    pub(crate) fn parse_and_resolve() -> anyhow::Result<ReportConfig> {
        let args = match Self::try_parse() {
            Ok(args) => args,
            Err(err) => {
                // --help and --version are printed to stdout
                let code = i32::from(err.use_stderr());
                err.print()?;
                std::process::exit(code);
            }
        };
        if let Some(shell) = args.shell {
            // generate shell completions
            let mut cmd = Self::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
            std::process::exit(0);
        }
        args.resolve()
    }

    /// Sets the log level and resolves the configuration.
    pub(crate) fn resolve(self) -> anyhow::Result<ReportConfig> {
        let log_level = match self.verbose {
            false => log::LevelFilter::Info,
            true => log::LevelFilter::Trace,
        };
        Logger::with(log_level).format(log_format).start()?;
        let config = ReportConfig::from(self);
        debug!("resolved {config:?}");
        Ok(config)
    }

    /// Runs the program, returning any error that aborted the report.
    pub fn execute() -> anyhow::Result<()> {
        Self::parse_and_resolve()?.run(&mut std::io::stdout().lock())
    }
}

#[test]
fn parse_build_flag() {
    let build = "https://ci.example.com/job/foo/42";
    for flag in ["-b", "--build"] {
        let args = BuildReportCli::parse_from(["jenkins-build-report", flag, build]);
        let config = ReportConfig::from(args);
        debug_assert_eq!(config, ReportConfig::new(build));
    }
}

#[test]
fn parse_other_flags() {
    let args = BuildReportCli::parse_from([
        "jenkins-build-report",
        "--build",
        "https://ci/job/a/1",
        "--timeout",
        "90",
        "--url",
    ]);
    let config = ReportConfig::from(args);
    assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    assert!(config.url_only);
}

#[test]
fn no_timeout_by_default() {
    let args = BuildReportCli::parse_from(["jenkins-build-report", "-b", "https://ci/job/a/1"]);
    assert_eq!(ReportConfig::from(args).timeout, None);
    assert_eq!(ReportConfig::new("https://ci/job/a/1").timeout, None);
}

#[test]
fn print_urls_only() {
    let config = ReportConfig {
        url_only: true,
        ..ReportConfig::new("https://ci.example.com/job/foo/42")
    };
    let mut out = Vec::new();
    config.run(&mut out).unwrap();
    assert_snapshot!(String::from_utf8(out).unwrap(), @r"
    https://ci.example.com/job/foo/42/api/json
    https://ci.example.com/job/foo/42/consoleText
    https://ci.example.com/job/foo/42/injectedEnvVars/api/json
    https://ci.example.com/job/foo/42
    ");

    // too short for an artifact base: the last line is empty
    let config = ReportConfig {
        url_only: true,
        ..ReportConfig::new("https://ci")
    };
    let mut out = Vec::new();
    config.run(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        [
            "https://ci/api/json",
            "https://ci/consoleText",
            "https://ci/injectedEnvVars/api/json",
            "",
        ]
    );
}

#[test]
fn reject_missing_build() {
    let err = BuildReportCli::try_parse_from(["jenkins-build-report"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    assert!(err.use_stderr());
    let err = BuildReportCli::try_parse_from(["jenkins-build-report", "--build"]).unwrap_err();
    assert!(err.use_stderr());
    let err = BuildReportCli::try_parse_from(["jenkins-build-report", "-b", "x", "--json"])
        .unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
}

#[test]
fn shell_completion_without_build() {
    let args =
        BuildReportCli::try_parse_from(["jenkins-build-report", "--shell-completion", "bash"])
            .unwrap();
    assert_eq!(args.shell, Some(Shell::Bash));
}

#[test]
fn verify_cli() {
    BuildReportCli::command().debug_assert();
}
