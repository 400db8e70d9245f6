//! Render `latest` against `previous` as one line per indicator.

use crate::io::series::{Column, Row};

/// Indicators shown in the summary, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Tests,
    CurrentlyInfected,
    Recovered,
    Deaths,
    Hospitalized,
    IntensiveCare,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Tests,
        Indicator::CurrentlyInfected,
        Indicator::Recovered,
        Indicator::Deaths,
        Indicator::Hospitalized,
        Indicator::IntensiveCare,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Indicator::Tests => "Tests",
            Indicator::CurrentlyInfected => "Currently infected",
            Indicator::Recovered => "Recovered",
            Indicator::Deaths => "Deaths",
            Indicator::Hospitalized => "Hospitalized",
            Indicator::IntensiveCare => "Intensive care",
        }
    }

    /// Value of this indicator in `row`, `None` when any input cell is blank.
    pub fn value(self, row: &Row) -> Option<i64> {
        match self {
            Indicator::Tests => row.count(Column::Tests),
            Indicator::CurrentlyInfected => currently_infected(row),
            Indicator::Recovered => row.count(Column::Recovered),
            Indicator::Deaths => row.count(Column::Deaths),
            Indicator::Hospitalized => row.count(Column::HospitalizedTotal),
            Indicator::IntensiveCare => row.count(Column::IntensiveCareTotal),
        }
    }
}

/// `confirmed - deaths - recovered`. Not clamped: inconsistent upstream data
/// shows up as a negative number. Out-of-range results are unknown.
pub fn currently_infected(row: &Row) -> Option<i64> {
    let confirmed = row.count(Column::Confirmed)?;
    let deaths = row.count(Column::Deaths)?;
    let recovered = row.count(Column::Recovered)?;
    confirmed.checked_sub(deaths)?.checked_sub(recovered)
}

/// Signed difference, `+` for zero and positive values.
pub fn format_delta(latest: i64, previous: i64) -> String {
    format!("{:+}", i128::from(latest) - i128::from(previous))
}

/// Format the full summary: one `value (delta)` line per indicator plus a
/// footer naming the comparison row.
pub fn format_summary(latest: &Row, previous: &Row) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== COVID-19 Austria, {} ===\n", latest.date()));
    for indicator in Indicator::ALL {
        let line = match (indicator.value(latest), indicator.value(previous)) {
            (Some(now), Some(before)) => format!("{now} ({})", format_delta(now, before)),
            (Some(now), None) => format!("{now} (n/a)"),
            (None, _) => "n/a".to_string(),
        };
        out.push_str(&format!("{:<20}{line}\n", format!("{}:", indicator.label())));
    }
    out.push_str(&format!("Compared to {}\n", previous.date()));

    out
}
