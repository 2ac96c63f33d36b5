// src/main.rs

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use clap::error::ErrorKind;
use tracing::{error, info, warn};

mod cleanup;
mod config;
mod error;
mod report;
mod service;
mod sys;

use crate::cleanup::model::Outcome;
use crate::config::RunEnv;
use crate::error::CleanupError;
use crate::report::Report;
use crate::service::{CleanupService, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "cleanup", version, about = "Delete PR staging packages from GitHub Packages")]
struct Cli {
    /// Outcome of the validation run that produced the staging packages
    #[arg(value_enum)]
    outcome: Outcome,

    /// Package owner (user or organization); defaults to the repository owner
    owner: Option<String>,

    /// Select and report, but do not delete anything
    #[arg(long)]
    dry_run: bool,

    /// Keep every staging package for this run
    #[arg(long)]
    preserve: bool,

    /// Also write the JSON report to this file
    #[arg(long)]
    report_path: Option<PathBuf>,

    /// Concurrent delete calls per registry
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Timeout for each gh/git call, in seconds
    #[arg(long, default_value_t = 10)]
    call_timeout_secs: u64,

    /// Timeout for the whole run, in seconds
    #[arg(long, default_value_t = 300)]
    run_timeout_secs: u64,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Help and version requests are not failures; anything else clap rejects
/// (an unknown outcome included) exits 1.
fn parse_failure_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn init_tracing(format: LogFormat) {
    let env = std::env::var("STAGING_CLEANUP_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // ==============================================================================
    // 1. Arguments (invalid outcome => exit 1, help/version => exit 0)
    // ==============================================================================
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(parse_failure_code(&e));
        }
    };

    init_tracing(cli.log_format);

    // ==============================================================================
    // 2. Environment & service wiring
    // ==============================================================================
    let env = RunEnv::load();
    let service = CleanupService::new(env, Duration::from_secs(cli.call_timeout_secs));
    let opts = RunOptions {
        outcome: cli.outcome,
        owner: cli.owner.clone(),
        preserve: cli.preserve,
        dry_run: cli.dry_run,
        concurrency: cli.concurrency,
    };

    // ==============================================================================
    // 3. Run under the overall deadline, map fatal kinds to exit codes
    // ==============================================================================
    let run_timeout = Duration::from_secs(cli.run_timeout_secs);
    let outcome = match tokio::time::timeout(run_timeout, service.run(&opts)).await {
        Ok(result) => result,
        Err(_) => Err(CleanupError::Timeout(run_timeout)),
    };

    match outcome {
        Ok(report) => {
            publish(&report, &cli, &service);
            info!("⚙️ Staging cleanup finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            u8::try_from(e.exit_code()).map(ExitCode::from).unwrap_or(ExitCode::FAILURE)
        }
    }
}

/// JSON on stdout, plus the optional report file and CI job summary.
fn publish(report: &Report, cli: &Cli, service: &CleanupService) {
    let json = report.to_json();
    println!("{}", json);

    if let Some(path) = &cli.report_path {
        if let Err(e) = fs::write(path, &json) {
            warn!(path = %path.display(), error = %e, "failed to write report file");
        }
    }

    if let Some(path) = &service.env().step_summary {
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(report.to_markdown().as_bytes()));
        if let Err(e) = appended {
            warn!(path = %path.display(), error = %e, "failed to append job summary");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_for(args: &[&str]) -> u8 {
        match Cli::try_parse_from(args) {
            Ok(_) => panic!("{args:?} should not parse"),
            Err(e) => parse_failure_code(&e),
        }
    }

    #[test]
    fn invalid_outcome_exits_one() {
        assert_eq!(code_for(&["cleanup", "maybe"]), 1);
        assert_eq!(code_for(&["cleanup"]), 1);
        assert_eq!(code_for(&["cleanup", "success", "--bogus"]), 1);
    }

    #[test]
    fn help_and_version_exit_zero() {
        assert_eq!(code_for(&["cleanup", "--help"]), 0);
        assert_eq!(code_for(&["cleanup", "--version"]), 0);
    }

    #[test]
    fn outcome_owner_and_flags_parse() {
        let cli = Cli::try_parse_from(["cleanup", "failure", "acme", "--dry-run", "--concurrency", "8"]).unwrap();
        assert_eq!(cli.outcome, Outcome::Failure);
        assert_eq!(cli.owner.as_deref(), Some("acme"));
        assert!(cli.dry_run);
        assert_eq!(cli.concurrency, 8);
        assert_eq!(cli.log_format, LogFormat::Text);
    }
}
