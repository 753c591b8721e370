use colored::Colorize;
use jenkins_build_report::BuildReportCli;

fn main() {
    if let Err(err) = BuildReportCli::execute() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(2);
    }
}
