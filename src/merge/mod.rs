//! Merge a fresh observation into the stored series.
//!
//! The merge is the only place that decides whether a run writes anything:
//!
//! 1. an observation whose canonical date is already stored is skipped, which
//!    makes repeated runs against an unchanged upstream a no-op
//! 2. otherwise the observation is flattened, appended, every row is padded to
//!    the current schema and aggregate columns are backfilled
//! 3. the comparison baseline is the latest row dated on the previous calendar
//!    day, falling back to the row stored just before the new one
//!
//! The fallback in step 3 is best effort: after a gap of several days the
//! baseline is simply the most recent earlier entry, not "yesterday".

use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Europe::Vienna;

use crate::domain::{Observation, Region, RegionCounts};
use crate::io::series::{COLUMN_COUNT, Column, Row, TimeSeries, format_date, parse_date};

/// Outcome of merging one observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResult {
    /// The observation's date is already stored; nothing changes.
    Skipped { date: String },
    Appended {
        updated: TimeSeries,
        latest: Row,
        previous: Row,
    },
}

/// A federal total disagreeing with the sum of its regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub indicator: &'static str,
    pub reported: u64,
    pub regional_sum: u64,
}

impl std::fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: federal total {} != sum of regions {}",
            self.indicator, self.reported, self.regional_sum
        )
    }
}

/// Merge `observation` into `existing`.
pub fn merge(existing: &TimeSeries, observation: &Observation) -> MergeResult {
    let formatted_date = format_date(&observation.date);
    if existing.contains_date(&formatted_date) {
        return MergeResult::Skipped {
            date: formatted_date,
        };
    }

    let mut updated = existing.clone();
    updated.append(observation_to_row(observation));
    updated.normalize(COLUMN_COUNT);
    updated.backfill_aggregates();

    let rows = updated.rows();
    // Just appended, so the series is non-empty.
    let latest = rows[rows.len() - 1].clone();
    let previous = find_previous(rows, &observation.date).clone();

    MergeResult::Appended {
        updated,
        latest,
        previous,
    }
}

/// Flatten an observation into the fixed column order. Absent values become
/// empty cells; aggregates the source did not report stay empty for backfill.
pub fn observation_to_row(observation: &Observation) -> Row {
    let mut row = Row::new(vec![String::new(); COLUMN_COUNT]);
    row.set(Column::Date, format_date(&observation.date));
    row.set(Column::Tests, cell(observation.tested));
    row.set(Column::Confirmed, cell(observation.confirmed));
    row.set(Column::Deaths, cell(observation.deaths));
    row.set(Column::Recovered, cell(observation.recovered));
    for region in Region::ALL {
        row.set(
            Column::ConfirmedIn(region),
            cell(observation.confirmed_by_region.get(region)),
        );
        row.set(
            Column::HospitalizedIn(region),
            cell(observation.hospitalized_by_region.get(region)),
        );
        row.set(
            Column::IntensiveCareIn(region),
            cell(observation.intensivecare_by_region.get(region)),
        );
    }
    row.set(Column::HospitalizedTotal, cell(observation.hospitalized_total));
    row.set(Column::IntensiveCareTotal, cell(observation.intensivecare_total));
    row
}

fn cell(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Pick the comparison row for the last element of `rows`.
///
/// Scans backwards for a row dated on the calendar day before `date`, with both
/// days taken in Vienna local time so a clock change between the two rows does
/// not shift either of them. Without a match, the second-to-last row is used; a
/// single-row series compares against itself.
pub fn find_previous<'a>(rows: &'a [Row], date: &DateTime<FixedOffset>) -> &'a Row {
    let last = rows.len() - 1;
    if last == 0 {
        return &rows[0];
    }

    let Some(yesterday) = vienna_day(date).pred_opt() else {
        return &rows[last - 1];
    };

    rows.iter()
        .rev()
        .find(|row| parse_date(row.date()).is_some_and(|d| vienna_day(&d) == yesterday))
        .unwrap_or(&rows[last - 1])
}

fn vienna_day(date: &DateTime<FixedOffset>) -> NaiveDate {
    date.with_timezone(&Vienna).date_naive()
}

/// Compare directly reported federal totals with the sum of the regions.
///
/// Sources are updated independently and may transiently disagree, so a
/// mismatch is advisory.
pub fn check_consistency(observation: &Observation) -> Vec<ConsistencyWarning> {
    let checks: [(&'static str, Option<u64>, &RegionCounts); 2] = [
        (
            "hospitalized",
            observation.hospitalized_total,
            &observation.hospitalized_by_region,
        ),
        (
            "intensive care",
            observation.intensivecare_total,
            &observation.intensivecare_by_region,
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(indicator, reported, regions)| {
            let reported = reported?;
            let regional_sum = regions.sum_known()?;
            (reported != regional_sum).then_some(ConsistencyWarning {
                indicator,
                reported,
                regional_sum,
            })
        })
        .collect()
}
