//! Incident and country models

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

/// A recorded interference incident, normalized at load time.
///
/// `start_date` is the canonical date: the first normalized entry of the
/// source start-date list, falling back to a parse of `date_text`. All date
/// filtering and year bucketing use it. Value sets are `BTreeSet`s so JSON
/// output is deterministically ordered.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    /// Source post id, stable across requests
    pub id: i64,
    pub title: String,
    pub link: Option<String>,
    pub date_text: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Hidden incidents never appear in any view
    pub display: bool,
    pub countries: BTreeSet<String>,
    pub actors: BTreeSet<String>,
    pub tools: BTreeSet<String>,
    pub content: String,
    pub excerpt: String,
}

impl Incident {
    /// Year bucket for the heatmap, when the incident is dated.
    pub fn year(&self) -> Option<i32> {
        use chrono::Datelike;
        self.start_date.map(|d| d.year())
    }
}

/// Static reference data for one country feature.
#[derive(Debug, Clone, Serialize)]
pub struct Country {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    /// Total carried by the source export; never trusted for filtered views
    pub dataset_count_hint: Option<i64>,
}

/// Map placement entry served as `country_meta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub lat: f64,
    pub lon: f64,
}
