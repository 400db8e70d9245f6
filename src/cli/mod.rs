//! Command-line parsing.
//!
//! Only argument parsing lives here; resolving flags against the environment
//! and defaults happens in `app`.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::SourceKind;

/// Append today's Austrian COVID-19 figures to a CSV time series.
#[derive(Debug, Parser, Clone)]
#[command(name = "covid-at", version, about = "Austrian COVID-19 statistics to CSV time series")]
pub struct Cli {
    /// Series file to load, merge into and rewrite. Without it the table is
    /// printed to stdout.
    #[arg(long, value_name = "CSV")]
    pub output_file: Option<PathBuf>,

    /// Use previously downloaded datasets instead of fetching them again.
    #[arg(long)]
    pub skip_download: bool,

    /// Upstream format to read.
    #[arg(long, value_enum, default_value_t = SourceKind::Ages)]
    pub source: SourceKind,

    /// Saved dashboard page to parse instead of fetching it (dashboard source).
    #[arg(long, value_name = "HTML")]
    pub input_file: Option<PathBuf>,

    /// Directory holding the downloaded datasets (default: $COVID_AT_DATA_DIR or `data`).
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Also write the fetched observation as JSON.
    #[arg(long = "export-observation", value_name = "JSON")]
    pub export_observation: Option<PathBuf>,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}
