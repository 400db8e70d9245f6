//! The update workflow shared by the binary and the tests:
//! fetch -> consistency check -> merge -> persist or print -> summary.
//!
//! The source is injected so the whole run can be driven without a network.

use std::io::Write;

use crate::data::ObservationSource;
use crate::domain::UpdateConfig;
use crate::error::AppError;
use crate::io::{TimeSeries, write_observation_json};
use crate::merge::{MergeResult, check_consistency, merge};
use crate::report::format_summary;

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The observation's date was already recorded; nothing was written.
    Skipped { date: String },
    Appended { rows: usize, summary: String },
}

/// Execute one update run.
///
/// With `config.output_file` set, the series is loaded from and rewritten to
/// that file. Without it, nothing is read and the table is written to
/// `table_out`.
pub fn run_update<W: Write>(
    config: &UpdateConfig,
    source: &dyn ObservationSource,
    table_out: W,
) -> Result<RunOutcome, AppError> {
    let observation = source.fetch()?;
    for warning in check_consistency(&observation) {
        log::warn!("Upstream inconsistency: {warning}");
    }

    if let Some(path) = &config.export_observation {
        write_observation_json(path, &observation)?;
    }

    let existing = match &config.output_file {
        Some(path) => TimeSeries::load(path)?,
        None => TimeSeries::new(),
    };

    match merge(&existing, &observation) {
        MergeResult::Skipped { date } => {
            log::info!("Data for {date} already recorded, nothing to do.");
            Ok(RunOutcome::Skipped { date })
        }
        MergeResult::Appended {
            updated,
            latest,
            previous,
        } => {
            match &config.output_file {
                Some(path) => updated.persist(path)?,
                None => updated.write_to(table_out)?,
            }
            Ok(RunOutcome::Appended {
                rows: updated.len(),
                summary: format_summary(&latest, &previous),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::domain::{Observation, Region, RegionCounts, SourceKind};
    use crate::io::series::parse_date;

    struct StubSource {
        observation: Observation,
        calls: Cell<usize>,
    }

    impl ObservationSource for StubSource {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn fetch(&self) -> Result<Observation, AppError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.observation.clone())
        }
    }

    fn stub(date: &str) -> StubSource {
        let mut obs = Observation::empty(parse_date(date).unwrap());
        obs.tested = Some(1000);
        obs.confirmed = Some(500);
        obs.deaths = Some(10);
        obs.recovered = Some(400);
        let mut regions = RegionCounts::default();
        for (i, region) in Region::ALL.into_iter().enumerate() {
            regions.set(region, [50, 60, 70, 80, 40, 60, 60, 50, 30][i]);
        }
        obs.confirmed_by_region = regions;
        StubSource {
            observation: obs,
            calls: Cell::new(0),
        }
    }

    fn config(output_file: Option<PathBuf>) -> UpdateConfig {
        UpdateConfig {
            source: SourceKind::Ages,
            output_file,
            skip_download: true,
            input_file: None,
            data_dir: PathBuf::from("data"),
            ages_base_url: String::new(),
            dashboard_url: String::new(),
            export_observation: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn first_run_reports_zero_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let source = stub("2021-03-03T10:00+01:00");

        let outcome = run_update(&config(Some(path.clone())), &source, std::io::sink()).unwrap();
        let RunOutcome::Appended { rows, summary } = outcome else {
            panic!("expected append");
        };

        assert_eq!(rows, 1);
        assert!(summary.contains("Currently infected: 90 (+0)"));
        assert!(summary.contains("Tests:              1000 (+0)"));
        assert!(summary.contains("Compared to 2021-03-03T10:00:00+01:00"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().nth(1).unwrap().starts_with("2021-03-03T10:00:00+01:00,1000,500,10,400,50,60,"));
    }

    #[test]
    fn repeated_run_leaves_file_byte_for_byte_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        let source = stub("2021-03-03T10:00:00+01:00");

        run_update(&config(Some(path.clone())), &source, std::io::sink()).unwrap();
        let before = std::fs::read(&path).unwrap();

        let outcome = run_update(&config(Some(path.clone())), &source, std::io::sink()).unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Skipped {
                date: "2021-03-03T10:00:00+01:00".to_string()
            }
        );
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn next_day_compares_against_yesterday() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        std::fs::write(
            &path,
            "date,tests,confirmed,deaths,recovered\n\
             2021-03-01T10:00:00+01:00,800,400,8,300\n\
             2021-03-02T10:00:00+01:00,900,450,9,350\n",
        )
        .unwrap();

        let outcome = run_update(&config(Some(path.clone())), &stub("2021-03-03T10:00:00+01:00"), std::io::sink())
            .unwrap();
        let RunOutcome::Appended { rows, summary } = outcome else {
            panic!("expected append");
        };

        assert_eq!(rows, 3);
        assert!(summary.contains("Tests:              1000 (+100)"));
        assert!(summary.contains("Currently infected: 90 (-1)"));
        assert!(summary.contains("Compared to 2021-03-02T10:00:00+01:00"));

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.ends_with("hospitalized_total,intensivecare_total"));
        // Older rows are padded and their aggregates backfilled.
        assert!(text.lines().nth(1).unwrap().ends_with(",0,0"));
    }

    #[test]
    fn without_output_file_table_goes_to_writer() {
        let mut out = Vec::new();
        let outcome = run_update(&config(None), &stub("2021-03-03T10:00:00+01:00"), &mut out).unwrap();
        assert!(matches!(outcome, RunOutcome::Appended { rows: 1, .. }));

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("date,tests,confirmed,deaths,recovered,state_1,"));
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn malformed_existing_file_aborts_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("series.csv");
        std::fs::write(&path, "when,tests\nx,1\n").unwrap();

        let err = run_update(&config(Some(path.clone())), &stub("2021-03-03T10:00:00+01:00"), std::io::sink())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedRow);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "when,tests\nx,1\n");
    }

    #[test]
    fn exports_observation_json() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("obs.json");
        let mut cfg = config(None);
        cfg.export_observation = Some(json.clone());

        run_update(&cfg, &stub("2021-03-03T10:00:00+01:00"), std::io::sink()).unwrap();
        assert!(std::fs::read_to_string(&json).unwrap().contains("\"tested\": 1000"));
    }
}
