//! The on-disk time series: one CSV row per observation date.
//!
//! The column schema is append-only. Files written by older versions carry a
//! shorter header; their rows are padded with empty cells on load-merge-write.
//! An empty cell means "unknown" and is never conflated with `0`, except by
//! `backfill_aggregates`, which sums regional cells treating blanks as zero.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::domain::Region;
use crate::error::AppError;

/// A column of the persisted schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Tests,
    Confirmed,
    Deaths,
    Recovered,
    ConfirmedIn(Region),
    HospitalizedIn(Region),
    IntensiveCareIn(Region),
    HospitalizedTotal,
    IntensiveCareTotal,
}

/// Number of columns in the current schema.
pub const COLUMN_COUNT: usize = 5 + 3 * 9 + 2;

impl Column {
    pub fn index(self) -> usize {
        match self {
            Column::Date => 0,
            Column::Tests => 1,
            Column::Confirmed => 2,
            Column::Deaths => 3,
            Column::Recovered => 4,
            Column::ConfirmedIn(r) => 5 + r.index(),
            Column::HospitalizedIn(r) => 14 + r.index(),
            Column::IntensiveCareIn(r) => 23 + r.index(),
            Column::HospitalizedTotal => 32,
            Column::IntensiveCareTotal => 33,
        }
    }

    pub fn name(self) -> String {
        match self {
            Column::Date => "date".to_string(),
            Column::Tests => "tests".to_string(),
            Column::Confirmed => "confirmed".to_string(),
            Column::Deaths => "deaths".to_string(),
            Column::Recovered => "recovered".to_string(),
            Column::ConfirmedIn(r) => format!("state_{}", r.code()),
            Column::HospitalizedIn(r) => format!("hospitalized_{}", r.code()),
            Column::IntensiveCareIn(r) => format!("intensivecare_{}", r.code()),
            Column::HospitalizedTotal => "hospitalized_total".to_string(),
            Column::IntensiveCareTotal => "intensivecare_total".to_string(),
        }
    }

    /// All columns in storage order.
    pub fn all() -> Vec<Column> {
        let mut cols = vec![
            Column::Date,
            Column::Tests,
            Column::Confirmed,
            Column::Deaths,
            Column::Recovered,
        ];
        cols.extend(Region::ALL.map(Column::ConfirmedIn));
        cols.extend(Region::ALL.map(Column::HospitalizedIn));
        cols.extend(Region::ALL.map(Column::IntensiveCareIn));
        cols.push(Column::HospitalizedTotal);
        cols.push(Column::IntensiveCareTotal);
        cols
    }
}

/// Header row of the current schema.
pub fn header() -> Vec<String> {
    Column::all().into_iter().map(Column::name).collect()
}

/// Canonical date serialization, used both when writing and when checking for
/// duplicates. Changing it breaks duplicate detection against existing files.
pub fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse a stored date cell (`2021-03-03T10:00:00+01:00` or `2021-03-03T10:00+01:00`).
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z"))
        .ok()
}

/// One persisted row. Cells are kept as the raw strings read from disk so that
/// untouched rows are written back exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    cells: Vec<String>,
}

impl Row {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn date(&self) -> &str {
        self.cells.first().map(String::as_str).unwrap_or("")
    }

    pub fn cell(&self, column: Column) -> &str {
        self.cells
            .get(column.index())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Integer value of a cell; `None` for blank or non-integer cells.
    pub fn count(&self, column: Column) -> Option<i64> {
        self.cell(column).trim().parse::<i64>().ok()
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        let idx = column.index();
        if self.cells.len() <= idx {
            self.cells.resize(idx + 1, String::new());
        }
        self.cells[idx] = value.into();
    }

    fn pad_to(&mut self, width: usize) {
        if self.cells.len() < width {
            self.cells.resize(width, String::new());
        }
    }
}

/// The in-memory series for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    rows: Vec<Row>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Read a persisted series. A missing file yields an empty series.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("No existing series at '{}', starting fresh.", path.display());
            return Ok(Self::new());
        }

        let file = File::open(path)
            .map_err(|e| AppError::io(format!("Failed to open series '{}': {e}", path.display())))?;
        let series = Self::read_from(file)?;
        log::debug!("Loaded {} rows from '{}'.", series.len(), path.display());
        Ok(series)
    }

    /// Parse a series from any CSV reader (header row first).
    pub fn read_from<R: std::io::Read>(reader: R) -> Result<Self, AppError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| AppError::malformed_row(1, format!("unreadable header: {e}")))?
            .clone();
        ensure_known_header(&headers)?;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // records() starts after the header; lines are 1-based.
            let line = idx + 2;
            let record = result.map_err(|e| AppError::malformed_row(line, e.to_string()))?;

            if record.len() > COLUMN_COUNT {
                return Err(AppError::malformed_row(
                    line,
                    format!("{} cells, schema has {COLUMN_COUNT}", record.len()),
                ));
            }
            if record.get(0).is_none_or(|d| d.trim().is_empty()) {
                return Err(AppError::malformed_row(line, "empty date cell"));
            }

            rows.push(Row::new(record.iter().map(str::to_string).collect()));
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact string comparison against the canonical date form.
    pub fn contains_date(&self, formatted_date: &str) -> bool {
        self.rows.iter().any(|r| r.date() == formatted_date)
    }

    /// Add one row at the end. Rows are never sorted.
    pub fn append(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Pad every row to `width` cells. Longer rows are left as they are.
    pub fn normalize(&mut self, width: usize) {
        for row in &mut self.rows {
            row.pad_to(width);
        }
    }

    /// Fill blank aggregate cells with the sum of their regional columns.
    pub fn backfill_aggregates(&mut self) {
        for row in &mut self.rows {
            backfill_row(row, Column::HospitalizedTotal, Column::HospitalizedIn);
            backfill_row(row, Column::IntensiveCareTotal, Column::IntensiveCareIn);
        }
    }

    /// Write header and all rows to `path`, replacing the file.
    pub fn persist(&self, path: &Path) -> Result<(), AppError> {
        let file = File::create(path)
            .map_err(|e| AppError::io(format!("Failed to create series '{}': {e}", path.display())))?;
        self.write_to(file)?;
        log::info!("Wrote {} rows to '{}'.", self.len(), path.display());
        Ok(())
    }

    /// Write header and all rows as CSV to any writer.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), AppError> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        writer
            .write_record(header())
            .map_err(|e| AppError::io(format!("Failed to write series header: {e}")))?;
        for row in &self.rows {
            writer
                .write_record(row.cells())
                .map_err(|e| AppError::io(format!("Failed to write series row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::io(format!("Failed to flush series: {e}")))?;
        Ok(())
    }
}

fn backfill_row(row: &mut Row, total: Column, regional: fn(Region) -> Column) {
    if !row.cell(total).trim().is_empty() {
        return;
    }
    let sum = Region::ALL
        .into_iter()
        .map(|r| row.count(regional(r)).unwrap_or(0))
        .try_fold(0i64, i64::checked_add);
    match sum {
        Some(sum) => row.set(total, sum.to_string()),
        None => log::warn!(
            "Row {}: regional {} cells overflow, leaving total blank.",
            row.date(),
            total.name()
        ),
    }
}

fn ensure_known_header(headers: &csv::StringRecord) -> Result<(), AppError> {
    let expected = header();
    if headers.len() > expected.len() {
        return Err(AppError::malformed_row(
            1,
            format!("header has {} columns, schema has {}", headers.len(), expected.len()),
        ));
    }
    for (found, want) in headers.iter().zip(&expected) {
        // Spreadsheet tools sometimes prefix the first header with a BOM.
        let found = found.trim().trim_start_matches('\u{feff}');
        if found != want {
            return Err(AppError::malformed_row(
                1,
                format!("unexpected column '{found}', expected '{want}'"),
            ));
        }
    }
    Ok(())
}
