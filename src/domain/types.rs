//! Shared domain types.
//!
//! These types are plain values: an `Observation` is built once per run by a
//! source adapter and never mutated afterwards. Absent values are `None`, never
//! a silent zero.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One of Austria's nine federal states, keyed by its official code (1..=9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Burgenland = 1,
    Kaernten = 2,
    Niederoesterreich = 3,
    Oberoesterreich = 4,
    Salzburg = 5,
    Steiermark = 6,
    Tirol = 7,
    Vorarlberg = 8,
    Wien = 9,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Burgenland,
        Region::Kaernten,
        Region::Niederoesterreich,
        Region::Oberoesterreich,
        Region::Salzburg,
        Region::Steiermark,
        Region::Tirol,
        Region::Vorarlberg,
        Region::Wien,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Zero-based position inside per-region column blocks.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// Name as published by the upstream sources.
    pub fn display_name(self) -> &'static str {
        match self {
            Region::Burgenland => "Burgenland",
            Region::Kaernten => "Kärnten",
            Region::Niederoesterreich => "Niederösterreich",
            Region::Oberoesterreich => "Oberösterreich",
            Region::Salzburg => "Salzburg",
            Region::Steiermark => "Steiermark",
            Region::Tirol => "Tirol",
            Region::Vorarlberg => "Vorarlberg",
            Region::Wien => "Wien",
        }
    }

    /// Resolve an upstream region name.
    ///
    /// The lookup is exact after trimming; anything else is an
    /// `UnknownRegion` error so upstream renames surface immediately.
    pub fn from_name(name: &str) -> Result<Region, AppError> {
        let name = name.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.display_name() == name)
            .ok_or_else(|| AppError::unknown_region(name))
    }
}

/// Per-region counts for one indicator. `None` means the source did not report
/// that region this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCounts([Option<u64>; 9]);

impl RegionCounts {
    pub fn get(&self, region: Region) -> Option<u64> {
        self.0[region.index()]
    }

    pub fn set(&mut self, region: Region, value: u64) {
        self.0[region.index()] = Some(value);
    }

    pub fn with(mut self, region: Region, value: u64) -> Self {
        self.set(region, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Sum of the reported regions, or `None` when no region was reported.
    pub fn sum_known(&self) -> Option<u64> {
        if self.is_empty() {
            return None;
        }
        Some(self.0.iter().flatten().sum())
    }
}

/// One fetch cycle's normalized snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Authoritative as-of instant for this pull.
    pub date: DateTime<FixedOffset>,
    pub tested: Option<u64>,
    pub confirmed: Option<u64>,
    pub deaths: Option<u64>,
    pub recovered: Option<u64>,
    pub confirmed_by_region: RegionCounts,
    pub hospitalized_by_region: RegionCounts,
    pub intensivecare_by_region: RegionCounts,
    /// Federal totals as reported directly by the source, if any.
    pub hospitalized_total: Option<u64>,
    pub intensivecare_total: Option<u64>,
}

impl Observation {
    /// An observation with every indicator absent.
    pub fn empty(date: DateTime<FixedOffset>) -> Self {
        Self {
            date,
            tested: None,
            confirmed: None,
            deaths: None,
            recovered: None,
            confirmed_by_region: RegionCounts::default(),
            hospitalized_by_region: RegionCounts::default(),
            intensivecare_by_region: RegionCounts::default(),
            hospitalized_total: None,
            intensivecare_total: None,
        }
    }
}

/// Which upstream format to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// AGES open-data CSV datasets (current format).
    Ages,
    /// Sozialministerium HTML dashboard page (first published format).
    Dashboard,
}

/// Resolved settings for a single update run.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub source: SourceKind,
    pub output_file: Option<PathBuf>,
    pub skip_download: bool,
    pub input_file: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub ages_base_url: String,
    pub dashboard_url: String,
    pub export_observation: Option<PathBuf>,
    pub timeout: Duration,
}
