//! Sozialministerium dashboard page (the first published HTML format).
//!
//! Federal counters live in the `abstract` element as `Label: value` pairs; the
//! per-region confirmed counts are `Region (count)` pairs in `infobox`
//! paragraphs. The page carries no hospital data.

use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::data::html::{element_by_class, tag_blocks, text_content};
use crate::data::{HttpClient, ObservationSource, parse_count, vienna_time};
use crate::domain::{Observation, Region, RegionCounts};
use crate::error::AppError;

pub const DEFAULT_URL: &str =
    "https://www.sozialministerium.at/Informationen-zum-Coronavirus/Neuartiges-Coronavirus-(2019-nCov).html";

const STAND_FORMAT: &str = "%d.%m.%Y, %H:%M";

/// Federal counters in the order tests, confirmed, deaths, recovered.
const COUNTER_LABELS: [&str; 4] = ["Testungen", "Bestätigte Fälle", "Todesfälle", "Genesene Personen"];

static STAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Stand, (\d\d\.\d\d\.\d{4}, \d\d:\d\d)").unwrap());

static REGION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\S+)\s\(([^)]+)\)").unwrap());

static COUNTERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    COUNTER_LABELS
        .into_iter()
        .map(|label| {
            let re = Regex::new(&format!(r"{}: ([^ ]+)", regex::escape(label))).unwrap();
            (label, re)
        })
        .collect()
});

pub struct DashboardSource {
    http: HttpClient,
    url: String,
    input_file: Option<PathBuf>,
}

impl DashboardSource {
    pub fn new(http: HttpClient, url: String, input_file: Option<PathBuf>) -> Self {
        Self {
            http,
            url,
            input_file,
        }
    }
}

impl ObservationSource for DashboardSource {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn fetch(&self) -> Result<Observation, AppError> {
        let html = match &self.input_file {
            Some(path) => {
                log::info!("Reading dashboard page from '{}'.", path.display());
                fs::read_to_string(path)
                    .map_err(|e| AppError::io(format!("Failed to read '{}': {e}", path.display())))?
            }
            None => {
                log::info!("Fetching dashboard page {}.", self.url);
                self.http.get_text(&self.url)?
            }
        };
        parse_dashboard(&html)
    }
}

/// Extract an observation from the dashboard HTML.
pub fn parse_dashboard(html: &str) -> Result<Observation, AppError> {
    let abstract_html = element_by_class(html, "abstract")
        .ok_or_else(|| AppError::parse("Dashboard page has no 'abstract' element."))?;
    let summary = text_content(abstract_html);

    let stand = STAND_RE
        .captures(&summary)
        .map(|c| c[1].to_string())
        .ok_or_else(|| AppError::parse(format!("No 'Stand' timestamp in '{summary}'.")))?;

    let mut obs = Observation::empty(vienna_time(&stand, STAND_FORMAT)?);
    let mut values = [None; 4];
    for (slot, (label, re)) in values.iter_mut().zip(COUNTERS.iter()) {
        *slot = counter(label, re, &summary)?;
    }
    [obs.tested, obs.confirmed, obs.deaths, obs.recovered] = values;

    let infobox = element_by_class(html, "infobox")
        .ok_or_else(|| AppError::parse("Dashboard page has no 'infobox' element."))?;
    for paragraph in tag_blocks(infobox, "p").into_iter().map(text_content) {
        if paragraph.starts_with("Bestätigte Fälle") {
            obs.confirmed_by_region = region_counts(&paragraph)?;
        }
    }
    if obs.confirmed_by_region.is_empty() {
        log::warn!("Dashboard page lists no per-region confirmed counts.");
    }

    Ok(obs)
}

/// A `Label: value` counter. A missing label is an absent value, not zero.
fn counter(label: &str, re: &Regex, summary: &str) -> Result<Option<u64>, AppError> {
    match re.captures(summary) {
        Some(caps) => parse_count(&caps[1]).map(Some),
        None => {
            log::warn!("Counter '{label}' not found on dashboard page.");
            Ok(None)
        }
    }
}

fn region_counts(paragraph: &str) -> Result<RegionCounts, AppError> {
    let mut counts = RegionCounts::default();
    for caps in REGION_RE.captures_iter(paragraph) {
        let region = Region::from_name(&caps[1])?;
        counts.set(region, parse_count(&caps[2])?);
    }
    Ok(counts)
}
