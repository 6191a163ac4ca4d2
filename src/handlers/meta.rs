//! Static reference data
//!
//! Vocabulary lists for building the filter UI, with dataset-wide usage
//! counts, plus the country coordinate table. Counts here are over the
//! whole visible dataset; they do not react to the active filter set.

use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::{Centroid, Country};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MetaResponse {
    /// (name, incident count), most used first, then alphabetical
    pub actors: Vec<(String, u64)>,
    pub countries: Vec<(String, u64)>,
    pub tools: Vec<(String, u64)>,
    /// (year, incident count), ascending by year
    pub years: Vec<(i32, u64)>,
    /// Full per-country reference records (region/subregion included)
    pub country_table: Vec<Country>,
    /// Countries with known coordinates
    pub country_meta: BTreeMap<String, Centroid>,
}

pub async fn get(State(state): State<AppState>) -> Json<MetaResponse> {
    let mut actors: BTreeMap<String, u64> = BTreeMap::new();
    let mut countries: BTreeMap<String, u64> = BTreeMap::new();
    let mut tools: BTreeMap<String, u64> = BTreeMap::new();
    let mut years: BTreeMap<i32, u64> = BTreeMap::new();

    for inc in state.dataset.visible() {
        for actor in &inc.actors {
            *actors.entry(actor.clone()).or_default() += 1;
        }
        for country in &inc.countries {
            *countries.entry(country.clone()).or_default() += 1;
        }
        for tool in &inc.tools {
            *tools.entry(tool.clone()).or_default() += 1;
        }
        if let Some(year) = inc.year() {
            *years.entry(year).or_default() += 1;
        }
    }

    Json(MetaResponse {
        actors: ranked(actors),
        countries: ranked(countries),
        tools: ranked(tools),
        years: years.into_iter().collect(),
        country_table: state.dataset.countries.clone(),
        country_meta: state.dataset.centroids.clone(),
    })
}

/// Most used first; names break ties alphabetically.
fn ranked(counter: BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> = counter.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}
