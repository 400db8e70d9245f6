//! Write the normalized observation as JSON.
//!
//! Useful for diffing what an adapter produced against the upstream pages
//! without touching the time series. Absent values serialize as `null`.

use std::fs::File;
use std::path::Path;

use crate::domain::Observation;
use crate::error::AppError;

/// Write an observation JSON file.
pub fn write_observation_json(path: &Path, observation: &Observation) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create observation JSON '{}': {e}", path.display()))
    })?;

    serde_json::to_writer_pretty(file, observation)
        .map_err(|e| AppError::io(format!("Failed to write observation JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Region, RegionCounts};
    use chrono::DateTime;

    #[test]
    fn absent_values_are_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.json");

        let date = DateTime::parse_from_rfc3339("2021-03-03T10:00:00+01:00").unwrap();
        let mut obs = Observation::empty(date);
        obs.tested = Some(1000);
        obs.confirmed_by_region = RegionCounts::default().with(Region::Wien, 30);
        write_observation_json(&path, &obs).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tested"], 1000);
        assert!(value["deaths"].is_null());
        assert_eq!(value["confirmed_by_region"][8], 30);
        assert!(value["confirmed_by_region"][0].is_null());
        assert_eq!(value["date"], "2021-03-03T10:00:00+01:00");
    }
}
