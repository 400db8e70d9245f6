//! Upstream data sources.
//!
//! Each upstream format is one `ObservationSource`. The rest of the pipeline
//! only sees the resulting `Observation`, so adapters can be swapped as the
//! publishers change their formats.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use chrono_tz::Europe::Vienna;

use crate::domain::{Observation, SourceKind, UpdateConfig};
use crate::error::AppError;

pub mod ages;
pub mod dashboard;
pub mod html;
pub mod http;

pub use ages::AgesSource;
pub use dashboard::DashboardSource;
pub use http::HttpClient;

/// Produces exactly one observation per call, combining as many upstream
/// fetches as the format needs.
pub trait ObservationSource {
    fn name(&self) -> &'static str;

    fn fetch(&self) -> Result<Observation, AppError>;
}

/// Build the source selected in `config`.
pub fn source_from_config(config: &UpdateConfig) -> Result<Box<dyn ObservationSource>, AppError> {
    let http = HttpClient::new(config.timeout)?;
    let source: Box<dyn ObservationSource> = match config.source {
        SourceKind::Ages => Box::new(AgesSource::new(
            http,
            config.ages_base_url.clone(),
            config.data_dir.clone(),
            config.skip_download,
        )),
        SourceKind::Dashboard => Box::new(DashboardSource::new(
            http,
            config.dashboard_url.clone(),
            config.input_file.clone(),
        )),
    };
    Ok(source)
}

/// Parse a count that may carry thousands separators (`1.234`, `1,234`, `1 234`).
pub fn parse_count(raw: &str) -> Result<u64, AppError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | ',' | ' ' | '\u{a0}' | '\u{202f}' | '\''))
        .collect();
    cleaned
        .parse::<u64>()
        .map_err(|e| AppError::parse(format!("Invalid count '{raw}': {e}")))
}

/// Interpret an upstream local timestamp as Vienna wall-clock time.
pub fn vienna_time(raw: &str, format: &str) -> Result<DateTime<FixedOffset>, AppError> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), format)
        .map_err(|e| AppError::parse(format!("Invalid timestamp '{raw}': {e}")))?;
    // Ambiguous instants (the autumn DST switch) resolve to the earlier one.
    Vienna
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| AppError::parse(format!("Timestamp '{raw}' does not exist in Europe/Vienna")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn counts_drop_thousands_separators() {
        assert_eq!(parse_count("1.234.567").unwrap(), 1_234_567);
        assert_eq!(parse_count(" 12,345 ").unwrap(), 12_345);
        assert_eq!(parse_count("9\u{a0}876").unwrap(), 9_876);
        assert_eq!(parse_count("0").unwrap(), 0);
        assert_eq!(parse_count("n/a").unwrap_err().kind(), ErrorKind::Parse);
        assert!(parse_count("").is_err());
    }

    #[test]
    fn vienna_time_carries_dst_offset() {
        let winter = vienna_time("03.03.2021 10:00:00", "%d.%m.%Y %H:%M:%S").unwrap();
        assert_eq!(winter.to_rfc3339(), "2021-03-03T10:00:00+01:00");

        let summer = vienna_time("20.07.2020, 15:00", "%d.%m.%Y, %H:%M").unwrap();
        assert_eq!(summer.to_rfc3339(), "2020-07-20T15:00:00+02:00");
    }
}
