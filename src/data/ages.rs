//! AGES open-data CSV datasets (the current format).
//!
//! Two semicolon-separated files are combined:
//!
//! - `CovidFaelle_Timeline.csv`: cumulative confirmed/deaths/recovered per day,
//!   one row per region plus an `Österreich` row
//! - `CovidFallzahlen.csv`: tests and hospital occupancy per reporting day, one
//!   row per region plus an `Alle` row
//!
//! The files are updated independently; the observation is dated at the later
//! of the two latest dates.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

use crate::data::{HttpClient, ObservationSource, parse_count, vienna_time};
use crate::domain::{Observation, Region, RegionCounts};
use crate::error::AppError;

pub const DEFAULT_BASE_URL: &str = "https://covid19-dashboard.ages.at/data";

const TIMELINE_FILE: &str = "CovidFaelle_Timeline.csv";
const HOSPITAL_FILE: &str = "CovidFallzahlen.csv";
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Names used for the nationwide rows.
const FEDERAL_NAMES: [&str; 2] = ["Österreich", "Alle"];

pub struct AgesSource {
    http: HttpClient,
    base_url: String,
    data_dir: PathBuf,
    skip_download: bool,
}

impl AgesSource {
    pub fn new(http: HttpClient, base_url: String, data_dir: PathBuf, skip_download: bool) -> Self {
        Self {
            http,
            base_url,
            data_dir,
            skip_download,
        }
    }

    fn download_all(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            AppError::io(format!("Failed to create data dir '{}': {e}", self.data_dir.display()))
        })?;
        for file in [TIMELINE_FILE, HOSPITAL_FILE] {
            let url = format!("{}/{file}", self.base_url.trim_end_matches('/'));
            self.http.download(&url, &self.data_dir.join(file))?;
        }
        Ok(())
    }
}

impl ObservationSource for AgesSource {
    fn name(&self) -> &'static str {
        "ages"
    }

    fn fetch(&self) -> Result<Observation, AppError> {
        if self.skip_download {
            log::info!("Skipping download, using datasets in '{}'.", self.data_dir.display());
        } else {
            self.download_all()?;
        }

        let cases = parse_timeline(open(&self.data_dir.join(TIMELINE_FILE))?)?;
        let hospital = parse_hospital(open(&self.data_dir.join(HOSPITAL_FILE))?)?;
        Ok(combine(cases, hospital))
    }
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::io(format!("Failed to open dataset '{}': {e}", path.display())))
}

/// Latest day of the case timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSnapshot {
    pub date: DateTime<FixedOffset>,
    pub confirmed: Option<u64>,
    pub deaths: Option<u64>,
    pub recovered: Option<u64>,
    pub confirmed_by_region: RegionCounts,
}

/// Latest day of the test/hospital dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct HospitalSnapshot {
    pub date: DateTime<FixedOffset>,
    pub tested: Option<u64>,
    pub hospitalized_by_region: RegionCounts,
    pub intensivecare_by_region: RegionCounts,
    pub hospitalized_total: Option<u64>,
    pub intensivecare_total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TimelineRecord {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "Bundesland")]
    region: String,
    #[serde(rename = "AnzahlFaelleSum")]
    confirmed: String,
    #[serde(rename = "AnzahlTotSum")]
    deaths: String,
    #[serde(rename = "AnzahlGeheiltSum")]
    recovered: String,
}

#[derive(Debug, Deserialize)]
struct HospitalRecord {
    #[serde(rename = "MeldeDatum")]
    time: String,
    #[serde(rename = "Bundesland")]
    region: String,
    #[serde(rename = "TestGesamt")]
    tested: String,
    #[serde(rename = "FZHosp")]
    hospitalized: String,
    #[serde(rename = "FZICU")]
    intensivecare: String,
}

/// Parse the case timeline and keep the rows of its latest day.
pub fn parse_timeline<R: Read>(reader: R) -> Result<CaseSnapshot, AppError> {
    let records = read_records::<_, TimelineRecord>(reader, TIMELINE_FILE)?
        .into_iter()
        .map(|r| Ok((vienna_time(&r.time, TIMESTAMP_FORMAT)?, r)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let date = latest(&records, TIMELINE_FILE)?;
    let mut snapshot = CaseSnapshot {
        date,
        confirmed: None,
        deaths: None,
        recovered: None,
        confirmed_by_region: RegionCounts::default(),
    };

    for (_, record) in records.iter().filter(|(d, _)| *d == date) {
        if is_federal(&record.region) {
            snapshot.confirmed = Some(parse_count(&record.confirmed)?);
            snapshot.deaths = Some(parse_count(&record.deaths)?);
            snapshot.recovered = Some(parse_count(&record.recovered)?);
        } else {
            let region = Region::from_name(&record.region)?;
            snapshot.confirmed_by_region.set(region, parse_count(&record.confirmed)?);
        }
    }
    if snapshot.confirmed.is_none() {
        log::warn!("{TIMELINE_FILE} has no nationwide row for {date}.");
    }

    log::info!("{TIMELINE_FILE}: latest date {date}.");
    Ok(snapshot)
}

/// Parse the test/hospital dataset and keep the rows of its latest day.
pub fn parse_hospital<R: Read>(reader: R) -> Result<HospitalSnapshot, AppError> {
    let records = read_records::<_, HospitalRecord>(reader, HOSPITAL_FILE)?
        .into_iter()
        .map(|r| Ok((vienna_time(&r.time, TIMESTAMP_FORMAT)?, r)))
        .collect::<Result<Vec<_>, AppError>>()?;

    let date = latest(&records, HOSPITAL_FILE)?;
    let mut snapshot = HospitalSnapshot {
        date,
        tested: None,
        hospitalized_by_region: RegionCounts::default(),
        intensivecare_by_region: RegionCounts::default(),
        hospitalized_total: None,
        intensivecare_total: None,
    };

    for (_, record) in records.iter().filter(|(d, _)| *d == date) {
        if is_federal(&record.region) {
            snapshot.tested = Some(parse_count(&record.tested)?);
            snapshot.hospitalized_total = Some(parse_count(&record.hospitalized)?);
            snapshot.intensivecare_total = Some(parse_count(&record.intensivecare)?);
        } else {
            let region = Region::from_name(&record.region)?;
            snapshot
                .hospitalized_by_region
                .set(region, parse_count(&record.hospitalized)?);
            snapshot
                .intensivecare_by_region
                .set(region, parse_count(&record.intensivecare)?);
        }
    }
    if snapshot.tested.is_none() {
        log::warn!("{HOSPITAL_FILE} has no nationwide row for {date}.");
    }

    log::info!("{HOSPITAL_FILE}: latest date {date}.");
    Ok(snapshot)
}

/// Merge both snapshots; the later of the two dates wins.
pub fn combine(cases: CaseSnapshot, hospital: HospitalSnapshot) -> Observation {
    let date = cases.date.max(hospital.date);
    if cases.date != hospital.date {
        log::info!(
            "Datasets disagree on latest date (cases {}, hospital {}); using {date}.",
            cases.date,
            hospital.date
        );
    }

    Observation {
        date,
        tested: hospital.tested,
        confirmed: cases.confirmed,
        deaths: cases.deaths,
        recovered: cases.recovered,
        confirmed_by_region: cases.confirmed_by_region,
        hospitalized_by_region: hospital.hospitalized_by_region,
        intensivecare_by_region: hospital.intensivecare_by_region,
        hospitalized_total: hospital.hospitalized_total,
        intensivecare_total: hospital.intensivecare_total,
    }
}

fn is_federal(name: &str) -> bool {
    FEDERAL_NAMES.contains(&name.trim())
}

fn read_records<R: Read, T: serde::de::DeserializeOwned>(reader: R, file: &str) -> Result<Vec<T>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Some exports prefix the first header with a BOM.
    let headers: csv::StringRecord = reader
        .headers()
        .map_err(|e| AppError::parse(format!("Failed to read {file} headers: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}'))
        .collect();
    reader.set_headers(headers);

    let records = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| AppError::parse(format!("Malformed {file}: {e}")))?;
    log::debug!("{file}: {} records.", records.len());
    Ok(records)
}

fn latest<T>(records: &[(DateTime<FixedOffset>, T)], file: &str) -> Result<DateTime<FixedOffset>, AppError> {
    records
        .iter()
        .map(|(d, _)| *d)
        .max()
        .ok_or_else(|| AppError::parse(format!("{file} contains no records.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const TIMELINE: &str = "\u{feff}Time;Bundesland;BundeslandID;AnzEinwohner;AnzahlFaelle;AnzahlFaelleSum;AnzahlFaelle7Tage;SiebenTageInzidenzFaelle;AnzahlTotTaeglich;AnzahlTotSum;AnzahlGeheiltTaeglich;AnzahlGeheiltSum
02.03.2021 00:00:00;Wien;9;1911191;500;90000;3000;150,3;2;1500;400;85000
02.03.2021 00:00:00;Österreich;10;8901064;2000;460000;14000;157,6;20;8500;1800;440000
03.03.2021 00:00:00;Burgenland;1;294436;40;10000;300;101,9;0;200;30;9500
03.03.2021 00:00:00;Wien;9;1911191;600;90600;3100;162,2;3;1503;450;85450
03.03.2021 00:00:00;Österreich;10;8901064;2500;462500;14500;162,9;25;8525;2000;442000
";

    const HOSPITAL: &str = "Meldedat;TestGesamt;MeldeDatum;FZHosp;FZICU;FZHospFree;FZICUFree;BundeslandID;Bundesland
03.03.2021;9.500.000;03.03.2021 00:00:00;100;20;500;80;9;Wien
03.03.2021;9.500.000;03.03.2021 00:00:00;10;2;50;8;1;Burgenland
03.03.2021;9.500.000;03.03.2021 00:00:00;1.400;290;4000;500;10;Alle
04.03.2021;9.600.000;04.03.2021 00:00:00;95;21;505;79;9;Wien
04.03.2021;9.600.000;04.03.2021 00:00:00;12;2;48;8;1;Burgenland
04.03.2021;9.600.000;04.03.2021 00:00:00;107;23;4000;500;10;Alle
";

    #[test]
    fn timeline_keeps_latest_day() {
        let cases = parse_timeline(TIMELINE.as_bytes()).unwrap();
        assert_eq!(cases.date.to_rfc3339(), "2021-03-03T00:00:00+01:00");
        assert_eq!(cases.confirmed, Some(462_500));
        assert_eq!(cases.deaths, Some(8_525));
        assert_eq!(cases.recovered, Some(442_000));
        assert_eq!(cases.confirmed_by_region.get(Region::Wien), Some(90_600));
        assert_eq!(cases.confirmed_by_region.get(Region::Burgenland), Some(10_000));
        assert_eq!(cases.confirmed_by_region.get(Region::Tirol), None);
    }

    #[test]
    fn hospital_keeps_latest_day_and_federal_totals() {
        let hospital = parse_hospital(HOSPITAL.as_bytes()).unwrap();
        assert_eq!(hospital.date.to_rfc3339(), "2021-03-04T00:00:00+01:00");
        assert_eq!(hospital.tested, Some(9_600_000));
        assert_eq!(hospital.hospitalized_by_region.get(Region::Wien), Some(95));
        assert_eq!(hospital.intensivecare_by_region.get(Region::Burgenland), Some(2));
        assert_eq!(hospital.hospitalized_total, Some(107));
        assert_eq!(hospital.intensivecare_total, Some(23));
    }

    #[test]
    fn combined_observation_takes_later_date() {
        let cases = parse_timeline(TIMELINE.as_bytes()).unwrap();
        let hospital = parse_hospital(HOSPITAL.as_bytes()).unwrap();
        let obs = combine(cases, hospital);

        assert_eq!(obs.date.to_rfc3339(), "2021-03-04T00:00:00+01:00");
        assert_eq!(obs.confirmed, Some(462_500));
        assert_eq!(obs.tested, Some(9_600_000));
        assert_eq!(obs.hospitalized_by_region.get(Region::Wien), Some(95));
    }

    #[test]
    fn unknown_region_is_fatal() {
        let csv = "Time;Bundesland;AnzahlFaelleSum;AnzahlTotSum;AnzahlGeheiltSum\n\
                   03.03.2021 00:00:00;Bayern;1;1;1\n";
        let err = parse_timeline(csv.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownRegion);
    }

    #[test]
    fn empty_or_malformed_dataset_is_a_parse_error() {
        let header_only = "Time;Bundesland;AnzahlFaelleSum;AnzahlTotSum;AnzahlGeheiltSum\n";
        assert_eq!(
            parse_timeline(header_only.as_bytes()).unwrap_err().kind(),
            ErrorKind::Parse
        );

        let missing_column = "Time;Bundesland\n03.03.2021 00:00:00;Wien\n";
        assert_eq!(
            parse_timeline(missing_column.as_bytes()).unwrap_err().kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn fetch_with_skip_download_reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TIMELINE_FILE), TIMELINE).unwrap();
        fs::write(dir.path().join(HOSPITAL_FILE), HOSPITAL).unwrap();

        let http = HttpClient::new(std::time::Duration::from_secs(1)).unwrap();
        let source = AgesSource::new(http, "http://127.0.0.1:9".to_string(), dir.path().to_path_buf(), true);
        let obs = source.fetch().unwrap();
        assert_eq!(obs.deaths, Some(8_525));
        assert_eq!(source.name(), "ages");
    }
}
