//! Query parameters, filter state, and response shapes
//!
//! `IncidentParams` is the raw wire shape of `GET /api/incidents`: every
//! field arrives as an optional string so that malformed values degrade to
//! defaults instead of surfacing as 400s. `Filters` is the parsed shape the
//! engine consumes; it doubles as the client-resident filter state tuple.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::incident::{Centroid, Incident};

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const MAX_PAGE_SIZE: usize = 100;

/// Raw query parameters for `GET /api/incidents`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub q: Option<String>,
    /// Comma-separated actor names
    pub actors: Option<String>,
    /// Comma-separated country names
    pub countries: Option<String>,
    /// Comma-separated tool names
    pub tools: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl IncidentParams {
    /// Parse into the engine's filter shape, clamping instead of erroring.
    pub fn into_filters(self) -> Filters {
        let page = self
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let page_size = self
            .page_size
            .as_deref()
            .and_then(|p| p.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        Filters {
            start: self.start.as_deref().and_then(parse_iso_date),
            end: self.end.as_deref().and_then(parse_iso_date),
            q: self
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            actors: split_csv(self.actors.as_deref().unwrap_or_default()),
            countries: split_csv(self.countries.as_deref().unwrap_or_default()),
            tools: split_csv(self.tools.as_deref().unwrap_or_default()),
            page,
            page_size,
        }
    }
}

/// Parsed filter set. Empty sets and `None` scalars mean "unconstrained".
///
/// Within a dimension selected values are OR'd; dimensions combine with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub q: Option<String>,
    pub actors: BTreeSet<String>,
    pub countries: BTreeSet<String>,
    pub tools: BTreeSet<String>,
    /// 1-indexed pagination cursor over the filtered result
    pub page: usize,
    pub page_size: usize,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            q: None,
            actors: BTreeSet::new(),
            countries: BTreeSet::new(),
            tools: BTreeSet::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Filters {
    /// Serialize into the `GET /api/incidents` parameter pairs. The HTTP
    /// shell is responsible for percent-encoding.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start {
            params.push(("start".into(), start.to_string()));
        }
        if let Some(end) = self.end {
            params.push(("end".into(), end.to_string()));
        }
        if let Some(q) = &self.q {
            params.push(("q".into(), q.clone()));
        }
        for (key, set) in [
            ("actors", &self.actors),
            ("countries", &self.countries),
            ("tools", &self.tools),
        ] {
            if !set.is_empty() {
                let joined = set.iter().cloned().collect::<Vec<_>>().join(",");
                params.push((key.into(), joined));
            }
        }
        params.push(("page".into(), self.page.to_string()));
        params.push(("page_size".into(), self.page_size.to_string()));
        params
    }
}

/// Accept a comma-separated string; always return a clean set.
pub fn split_csv(s: &str) -> BTreeSet<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// `YYYY-MM-DD` or nothing; malformed dates are treated as absent.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// One heatmap cell: surviving incidents for (actor, year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapRow {
    pub year: i32,
    pub actor: String,
    pub count: u64,
}

/// One stacked-bar segment: surviving incidents for (tool, actor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackedRow {
    pub tool: String,
    pub actor: String,
    pub count: u64,
}

/// One donut-marker slice: surviving incidents for (country, actor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryActorRow {
    pub country: String,
    pub actor: String,
    pub count: u64,
}

/// Full response of `GET /api/incidents`.
///
/// Every aggregate is derived from the same surviving set that produced
/// `total` and the page slice.
#[derive(Debug, Serialize)]
pub struct IncidentsResponse {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub incidents: Vec<Incident>,
    pub heatmap: Vec<HeatmapRow>,
    pub stacked: Vec<StackedRow>,
    pub country_actor: Vec<CountryActorRow>,
    /// Static map placement data, independent of the active filters
    pub country_meta: BTreeMap<String, Centroid>,
}
