#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod args;
mod endpoints;
mod fetch;
mod report;
mod structs;

pub mod constants;

pub use args::{BuildReportCli, ReportConfig};
pub use endpoints::BuildEndpoints;
pub use report::BuildReport;
pub use structs::{
    ActionRecord, ArtifactRecord, BuildRecord, BuildResult, CauseRecord, ConsoleLog,
    EnvironmentMap, ExecutorRecord, ParameterRecord,
};

use endpoints::Resource;

use colored::Colorize;

fn log_format(
    w: &mut dyn std::io::Write,
    _now: &mut flexi_logger::DeferredNow,
    record: &log::Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    let color = match level {
        log::Level::Error => "red",
        log::Level::Warn => "yellow",
        _ => "",
    };
    let level = format!("{level}:").to_lowercase().color(color).bold();
    write!(w, "{} {}", level, &record.args())
}
