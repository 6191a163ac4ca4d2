//! Dataset loader
//!
//! Parses the tracker's GeoJSON-style export (a FeatureCollection of
//! countries, each carrying its incident list) into a normalized in-memory
//! dataset. Loading happens once at startup; the result is read-only for
//! the life of the process.
//!
//! Normalization applied here, so the engine never sees raw export quirks:
//! - compact date strings (`YYYYMMDD`, `YYYYMM`, `YYYY`) become ISO dates
//! - WordPress shortcodes and HTML are stripped from content/excerpt
//! - incidents appearing under several country features are deduplicated
//!   by post id and accumulate every parent country

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::{Centroid, Country, Incident};

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse dataset JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("dataset contains no country features")]
    Empty,
}

/// The normalized, immutable dataset shared by all requests.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All incidents, hidden ones included, ordered by id
    pub incidents: Vec<Incident>,
    /// One entry per distinct country, ordered by name
    pub countries: Vec<Country>,
    /// Countries with known coordinates, for map placement
    pub centroids: BTreeMap<String, Centroid>,
}

impl Dataset {
    /// Incidents eligible for any view.
    pub fn visible(&self) -> impl Iterator<Item = &Incident> {
        self.incidents.iter().filter(|inc| inc.display)
    }

    /// All tool names used by visible incidents, alphabetically sorted.
    /// This ordering is the key for deterministic tool coloring.
    pub fn tool_vocabulary(&self) -> Vec<String> {
        let set: std::collections::BTreeSet<&String> =
            self.visible().flat_map(|inc| inc.tools.iter()).collect();
        set.into_iter().cloned().collect()
    }
}

/// Load and normalize the dataset. Any failure here is fatal to startup.
pub fn load(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
    let text = fs::read_to_string(path)?;
    let raw: RawCollection = serde_json::from_str(&text)?;
    let dataset = from_collection(raw);
    if dataset.countries.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(dataset)
}

// ---------- Raw export shapes ----------

#[derive(Debug, Deserialize)]
pub struct RawCollection {
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub properties: RawProperties,
    pub geometry: Option<RawGeometry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawProperties {
    pub country: Option<String>,
    pub count: Option<serde_json::Value>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    #[serde(default)]
    pub incidents: Vec<RawIncident>,
}

#[derive(Debug, Deserialize)]
pub struct RawGeometry {
    /// GeoJSON order: [lon, lat]
    #[serde(default)]
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct RawIncident {
    pub post_id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub date_text: Option<String>,
    /// Ordered list of date strings; the first entry is canonical
    pub start_date: Option<serde_json::Value>,
    pub end_date: Option<serde_json::Value>,
    #[serde(default)]
    pub actors: Vec<RawTerm>,
    #[serde(default)]
    pub tools: Vec<RawTerm>,
    pub display: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RawTerm {
    pub name: Option<String>,
}

// ---------- Normalization ----------

/// Build the dataset from a parsed export.
pub fn from_collection(raw: RawCollection) -> Dataset {
    let mut countries: BTreeMap<String, Country> = BTreeMap::new();
    let mut incidents: BTreeMap<i64, Incident> = BTreeMap::new();

    for feature in raw.features {
        let props = feature.properties;
        let name = match props.country.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue, // features without a country name carry nothing usable
        };

        let (lon, lat) = match &feature.geometry {
            Some(g) if g.coordinates.len() >= 2 => (Some(g.coordinates[0]), Some(g.coordinates[1])),
            _ => (None, None),
        };

        countries.insert(
            name.clone(),
            Country {
                name: name.clone(),
                lat,
                lon,
                region: props.region,
                subregion: props.subregion,
                dataset_count_hint: props.count.as_ref().and_then(as_i64),
            },
        );

        for raw_inc in props.incidents {
            let Some(id) = raw_inc.post_id.as_ref().and_then(as_i64) else {
                tracing::warn!(country = %name, "skipping incident without post_id");
                continue;
            };
            let normalized = normalize_incident(id, raw_inc);
            match incidents.get_mut(&id) {
                // Same post under another country feature: the later record
                // wins for text fields, dates coalesce, value sets merge.
                Some(existing) => {
                    existing.title = normalized.title;
                    existing.link = normalized.link.or(existing.link.take());
                    existing.content = normalized.content;
                    existing.excerpt = normalized.excerpt;
                    existing.date_text = normalized.date_text;
                    existing.start_date = normalized.start_date.or(existing.start_date);
                    existing.end_date = normalized.end_date.or(existing.end_date);
                    existing.display = normalized.display;
                    existing.actors.extend(normalized.actors);
                    existing.tools.extend(normalized.tools);
                    existing.countries.insert(name.clone());
                }
                None => {
                    let mut inc = normalized;
                    inc.countries.insert(name.clone());
                    incidents.insert(id, inc);
                }
            }
        }
    }

    let centroids = countries
        .values()
        .filter_map(|c| match (c.lat, c.lon) {
            (Some(lat), Some(lon)) => Some((c.name.clone(), Centroid { lat, lon })),
            _ => None,
        })
        .collect();

    Dataset {
        incidents: incidents.into_values().collect(),
        countries: countries.into_values().collect(),
        centroids,
    }
}

fn normalize_incident(id: i64, raw: RawIncident) -> Incident {
    let date_text = raw.date_text.unwrap_or_default().trim().to_string();
    let start_date = raw
        .start_date
        .as_ref()
        .and_then(first_date_entry)
        .and_then(|s| normalize_date(&s))
        .or_else(|| to_date(&date_text));
    let end_date = raw
        .end_date
        .as_ref()
        .and_then(first_date_entry)
        .and_then(|s| normalize_date(&s));

    Incident {
        id,
        title: raw.title.unwrap_or_default().trim().to_string(),
        link: raw.link.filter(|l| !l.trim().is_empty()),
        date_text,
        start_date,
        end_date,
        display: display_flag(raw.display.as_ref()),
        countries: Default::default(),
        actors: term_names(raw.actors),
        tools: term_names(raw.tools),
        content: clean_rich_text(raw.content.as_deref().unwrap_or_default()),
        excerpt: clean_rich_text(raw.excerpt.as_deref().unwrap_or_default()),
    }
}

fn term_names(terms: Vec<RawTerm>) -> std::collections::BTreeSet<String> {
    terms
        .into_iter()
        .filter_map(|t| t.name)
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn as_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// The export sometimes carries dates as a list, sometimes a bare string.
fn first_date_entry(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Array(items) => items.first().and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Hidden incidents are flagged inconsistently across export versions:
/// booleans, `"hidden"`, or 0/1 all appear in the wild.
fn display_flag(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_i64() != Some(0),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim().to_ascii_lowercase();
            !(s == "hidden" || s == "false" || s == "0")
        }
        Some(_) => true,
    }
}

/// Accepts `YYYYMMDD`, `YYYYMM`, `YYYY` digit strings; month and day
/// default to 01 when absent.
pub fn normalize_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.len() {
        8 => NaiveDate::parse_from_str(s, "%Y%m%d").ok(),
        6 => {
            let year = s[..4].parse().ok()?;
            let month = s[4..6].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
        }
        4 => NaiveDate::from_ymd_opt(s.parse().ok()?, 1, 1),
        _ => None,
    }
}

/// Best-effort date parse: ISO first, then the compact digit forms.
pub fn to_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| normalize_date(s))
}

// ---------- Rich-text cleaning ----------

static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[/?[a-zA-Z0-9_]+(?:\s+[^\]]*)?\]").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static CHARREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&#(x?[0-9a-fA-F]+);").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\x0c\x0b]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Strip WordPress shortcodes, HTML tags, and entities; collapse whitespace.
pub fn clean_rich_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let s = unescape_entities(raw);
    let s = SHORTCODE_RE.replace_all(&s, "");
    let s = TAG_RE.replace_all(&s, "");
    let s = SPACE_RE.replace_all(&s, " ");
    let s = BLANK_LINES_RE.replace_all(&s, "\n");
    s.trim().to_string()
}

fn unescape_entities(s: &str) -> String {
    let s = CHARREF_RE.replace_all(s, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = if let Some(hex) = body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse().ok()
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
