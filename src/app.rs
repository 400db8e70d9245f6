//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - sets up logging
//! - parses CLI arguments and resolves them against the environment
//! - runs the update pipeline
//! - prints the delta summary

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::cli::Cli;
use crate::data::{ages, dashboard, source_from_config};
use crate::domain::{SourceKind, UpdateConfig};
use crate::error::AppError;

pub mod pipeline;

const DEFAULT_DATA_DIR: &str = "data";

/// Entry point for the `covid-at` binary.
pub fn run() -> Result<(), AppError> {
    // Logs go to stderr; stdout may carry the CSV table.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();

    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = update_config_from_args(&cli, |key| std::env::var(key).ok())?;

    let source = source_from_config(&config)?;
    log::info!("Using source '{}'.", source.name());

    let outcome = pipeline::run_update(&config, source.as_ref(), std::io::stdout().lock())?;

    if let pipeline::RunOutcome::Appended { summary, .. } = outcome {
        print_summary(
            &summary,
            config.output_file.is_some(),
            std::io::stdout().lock(),
            std::io::stderr().lock(),
        )?;
    }
    Ok(())
}

/// Print the summary to `out`, or to `err` when `out` already carries the CSV
/// table.
fn print_summary(
    summary: &str,
    wrote_file: bool,
    mut out: impl Write,
    mut err: impl Write,
) -> Result<(), AppError> {
    let target: &mut dyn Write = if wrote_file { &mut out } else { &mut err };
    writeln!(target, "{summary}").map_err(|e| AppError::io(format!("Failed to print summary: {e}")))
}

/// Resolve CLI flags against the environment (`env`) and built-in defaults.
///
/// Precedence: flag, then environment variable, then default.
pub fn update_config_from_args(
    args: &Cli,
    env: impl Fn(&str) -> Option<String>,
) -> Result<UpdateConfig, AppError> {
    if args.timeout_secs == 0 {
        return Err(AppError::config("--timeout-secs must be at least 1."));
    }
    if args.input_file.is_some() && args.source != SourceKind::Dashboard {
        return Err(AppError::config("--input-file only applies to --source dashboard."));
    }

    let data_dir = args
        .data_dir
        .clone()
        .or_else(|| env("COVID_AT_DATA_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    Ok(UpdateConfig {
        source: args.source,
        output_file: args.output_file.clone(),
        skip_download: args.skip_download,
        input_file: args.input_file.clone(),
        data_dir,
        ages_base_url: env("COVID_AT_AGES_URL").unwrap_or_else(|| ages::DEFAULT_BASE_URL.to_string()),
        dashboard_url: env("COVID_AT_DASHBOARD_URL").unwrap_or_else(|| dashboard::DEFAULT_URL.to_string()),
        export_observation: args.export_observation.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_without_environment() {
        let cli = Cli::parse_from(["covid-at"]);
        let config = update_config_from_args(&cli, no_env).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.ages_base_url, ages::DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn flag_beats_environment_beats_default() {
        let env = |key: &str| match key {
            "COVID_AT_DATA_DIR" => Some("/var/lib/covid".to_string()),
            "COVID_AT_AGES_URL" => Some("http://mirror.local/data".to_string()),
            _ => None,
        };

        let cli = Cli::parse_from(["covid-at"]);
        let config = update_config_from_args(&cli, env).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/covid"));
        assert_eq!(config.ages_base_url, "http://mirror.local/data");

        let cli = Cli::parse_from(["covid-at", "--data-dir", "here"]);
        let config = update_config_from_args(&cli, env).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("here"));
    }

    #[test]
    fn summary_goes_to_stderr_when_stdout_carries_the_table() {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        print_summary("Tests: 1 (+0)", false, &mut out, &mut err).unwrap();
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(err).unwrap(), "Tests: 1 (+0)\n");

        let (mut out, mut err) = (Vec::new(), Vec::new());
        print_summary("Tests: 1 (+0)", true, &mut out, &mut err).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Tests: 1 (+0)\n");
        assert!(err.is_empty());
    }

    #[test]
    fn rejects_inconsistent_flags() {
        let cli = Cli::parse_from(["covid-at", "--input-file", "page.html"]);
        let err = update_config_from_args(&cli, no_env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);

        let cli = Cli::parse_from(["covid-at", "--timeout-secs", "0"]);
        assert!(update_config_from_args(&cli, no_env).is_err());
    }
}
