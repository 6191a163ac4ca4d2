//! Filter/aggregation engine
//!
//! Pure functions over the in-memory dataset. Every query applies the full
//! filter set once, then derives the list page and all chart aggregates
//! from that same surviving set, so no view can disagree with another about
//! which incidents are in scope.
//!
//! Filter semantics: within a dimension the selected values are OR'd
//! (set-intersection test), dimensions combine with AND. Empty selections
//! are unconstrained. Unknown values and inverted date ranges legitimately
//! produce empty results rather than errors.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::dataset::Dataset;
use crate::models::{
    CountryActorRow, Filters, HeatmapRow, Incident, IncidentsResponse, StackedRow,
};

/// Aggregation label for incidents with no actor attribution.
pub const UNKNOWN_ACTOR: &str = "Unknown";
/// Aggregation label for incidents with no tool/type.
pub const UNSPECIFIED_TOOL: &str = "Unspecified";
/// Aggregation label for incidents with no parent country.
pub const UNASSIGNED_COUNTRY: &str = "Unassigned";

/// Run one query: filter, aggregate, sort, paginate.
pub fn query(dataset: &Dataset, filters: &Filters) -> IncidentsResponse {
    let mut surviving: Vec<&Incident> = dataset
        .incidents
        .iter()
        .filter(|inc| matches(inc, filters))
        .collect();

    // Aggregates come from the surviving set before pagination.
    let heatmap = heatmap_rows(&surviving);
    let stacked = stacked_rows(&surviving);
    let country_actor = country_actor_rows(&surviving);

    // Most recent first; ties break on ascending id, dateless incidents last.
    surviving.sort_by(|a, b| compare_for_list(a, b));

    let total = surviving.len();
    // Page numbers are clamped, not validated; saturate so an absurd
    // cursor yields an empty page instead of an overflow.
    let offset = filters.page.saturating_sub(1).saturating_mul(filters.page_size);
    let incidents: Vec<Incident> = surviving
        .into_iter()
        .skip(offset)
        .take(filters.page_size)
        .cloned()
        .collect();

    IncidentsResponse {
        total,
        page: filters.page,
        page_size: filters.page_size,
        incidents,
        heatmap,
        stacked,
        country_actor,
        country_meta: dataset.centroids.clone(),
    }
}

/// Whether one incident survives the full filter set.
pub fn matches(inc: &Incident, filters: &Filters) -> bool {
    if !inc.display {
        return false;
    }

    if filters.start.is_some() || filters.end.is_some() {
        // Undated incidents are excluded from date-bounded queries only.
        let Some(date) = inc.start_date else {
            return false;
        };
        if let Some(start) = filters.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = filters.end {
            if date > end {
                return false;
            }
        }
    }

    if let Some(q) = &filters.q {
        let needle = q.to_lowercase();
        let matched = inc.title.to_lowercase().contains(&needle)
            || inc.content.to_lowercase().contains(&needle)
            || inc.excerpt.to_lowercase().contains(&needle);
        if !matched {
            return false;
        }
    }

    if !filters.actors.is_empty() && inc.actors.intersection(&filters.actors).next().is_none() {
        return false;
    }
    if !filters.countries.is_empty()
        && inc.countries.intersection(&filters.countries).next().is_none()
    {
        return false;
    }
    if !filters.tools.is_empty() && inc.tools.intersection(&filters.tools).next().is_none() {
        return false;
    }

    true
}

fn compare_for_list(a: &Incident, b: &Incident) -> Ordering {
    match (a.start_date, b.start_date) {
        (Some(da), Some(db)) => db.cmp(&da).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

fn actor_labels(inc: &Incident) -> Vec<&str> {
    if inc.actors.is_empty() {
        vec![UNKNOWN_ACTOR]
    } else {
        inc.actors.iter().map(String::as_str).collect()
    }
}

/// Counts by (year, actor). Undated incidents have no year bucket and are
/// skipped; multi-actor incidents fan out to one row per actor.
fn heatmap_rows(surviving: &[&Incident]) -> Vec<HeatmapRow> {
    let mut buckets: BTreeMap<(i32, &str), u64> = BTreeMap::new();
    for inc in surviving {
        let Some(year) = inc.year() else { continue };
        for actor in actor_labels(inc) {
            *buckets.entry((year, actor)).or_default() += 1;
        }
    }
    buckets
        .into_iter()
        .map(|((year, actor), count)| HeatmapRow {
            year,
            actor: actor.to_string(),
            count,
        })
        .collect()
}

/// Counts by (tool, actor) for the stacked bar chart.
fn stacked_rows(surviving: &[&Incident]) -> Vec<StackedRow> {
    let mut buckets: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for inc in surviving {
        let tools: Vec<&str> = if inc.tools.is_empty() {
            vec![UNSPECIFIED_TOOL]
        } else {
            inc.tools.iter().map(String::as_str).collect()
        };
        for tool in &tools {
            for actor in actor_labels(inc) {
                *buckets.entry((*tool, actor)).or_default() += 1;
            }
        }
    }
    buckets
        .into_iter()
        .map(|((tool, actor), count)| StackedRow {
            tool: tool.to_string(),
            actor: actor.to_string(),
            count,
        })
        .collect()
}

/// Counts by (country, actor) for the map's donut markers.
fn country_actor_rows(surviving: &[&Incident]) -> Vec<CountryActorRow> {
    let mut buckets: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for inc in surviving {
        let countries: Vec<&str> = if inc.countries.is_empty() {
            vec![UNASSIGNED_COUNTRY]
        } else {
            inc.countries.iter().map(String::as_str).collect()
        };
        for country in &countries {
            for actor in actor_labels(inc) {
                *buckets.entry((*country, actor)).or_default() += 1;
            }
        }
    }
    buckets
        .into_iter()
        .map(|((country, actor), count)| CountryActorRow {
            country: country.to_string(),
            actor: actor.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn incident(
        id: i64,
        title: &str,
        start: Option<&str>,
        actors: &[&str],
        tools: &[&str],
        countries: &[&str],
        display: bool,
    ) -> Incident {
        Incident {
            id,
            title: title.to_string(),
            link: None,
            date_text: String::new(),
            start_date: start.map(date),
            end_date: None,
            display,
            countries: set(countries),
            actors: set(actors),
            tools: set(tools),
            content: String::new(),
            excerpt: format!("excerpt for {title}"),
        }
    }

    fn dataset(incidents: Vec<Incident>) -> Dataset {
        Dataset {
            incidents,
            countries: Vec::new(),
            centroids: BTreeMap::new(),
        }
    }

    /// The fixture from the dashboard's reference scenario: two visible
    /// 2024 incidents and one hidden 2023 one.
    fn scenario() -> Dataset {
        dataset(vec![
            incident(1, "A", Some("2024-06-15"), &["China"], &["Cyber"], &["Taiwan"], true),
            incident(2, "B", Some("2024-07-01"), &["Russia"], &["Cyber"], &["Ukraine"], true),
            incident(3, "C", Some("2023-02-01"), &["China"], &["Disinfo"], &["Taiwan"], false),
        ])
    }

    #[test]
    fn hidden_incidents_never_appear() {
        let out = query(&scenario(), &Filters::default());
        assert_eq!(out.total, 2);
        assert!(out.incidents.iter().all(|i| i.id != 3));
        assert_eq!(
            out.heatmap,
            vec![
                HeatmapRow { year: 2024, actor: "China".into(), count: 1 },
                HeatmapRow { year: 2024, actor: "Russia".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn actor_filter_narrows_every_projection() {
        let mut filters = Filters::default();
        filters.actors = set(&["China"]);
        let out = query(&scenario(), &filters);
        assert_eq!(out.total, 1);
        assert_eq!(out.incidents.len(), 1);
        assert_eq!(out.incidents[0].id, 1);
        assert_eq!(out.heatmap.len(), 1);
        assert_eq!(out.stacked.len(), 1);
        assert_eq!(out.country_actor.len(), 1);
    }

    #[test]
    fn pagination_is_total_consistent() {
        let ds = scenario();
        let mut filters = Filters::default();
        filters.page_size = 1;

        filters.page = 1;
        let first = query(&ds, &filters);
        assert_eq!(first.total, 2);
        assert_eq!(first.incidents.len(), 1);

        filters.page = 2;
        let second = query(&ds, &filters);
        assert_eq!(second.total, 2);
        assert_eq!(second.incidents.len(), 1);
        assert_ne!(first.incidents[0].id, second.incidents[0].id);

        filters.page = 3;
        let third = query(&ds, &filters);
        assert_eq!(third.total, 2);
        assert!(third.incidents.is_empty());
    }

    #[test]
    fn date_range_uses_the_canonical_date() {
        let ds = scenario();
        let mut filters = Filters::default();
        filters.start = Some(date("2024-06-01"));
        filters.end = Some(date("2024-06-30"));
        let out = query(&ds, &filters);
        assert_eq!(out.total, 1);
        assert_eq!(out.incidents[0].id, 1); // 2024-07-01 is outside the window
    }

    #[test]
    fn undated_incidents_drop_out_of_date_bounded_queries_only() {
        let ds = dataset(vec![
            incident(1, "dated", Some("2024-01-01"), &[], &[], &[], true),
            incident(2, "undated", None, &[], &[], &[], true),
        ]);
        assert_eq!(query(&ds, &Filters::default()).total, 2);

        let mut filters = Filters::default();
        filters.start = Some(date("2000-01-01"));
        assert_eq!(query(&ds, &filters).total, 1);
    }

    #[test]
    fn inverted_range_yields_empty_not_error() {
        let mut filters = Filters::default();
        filters.start = Some(date("2025-01-01"));
        filters.end = Some(date("2024-01-01"));
        let out = query(&scenario(), &filters);
        assert_eq!(out.total, 0);
        assert!(out.heatmap.is_empty());
    }

    #[test]
    fn unknown_filter_values_match_nothing() {
        let mut filters = Filters::default();
        filters.tools = set(&["Balloon Operations"]);
        assert_eq!(query(&scenario(), &filters).total, 0);
    }

    #[test]
    fn text_search_is_case_insensitive_across_fields() {
        let ds = dataset(vec![
            incident(1, "Election interference", Some("2024-01-01"), &[], &[], &[], true),
            incident(2, "Other", Some("2024-01-02"), &[], &[], &[], true),
        ]);
        let mut filters = Filters::default();
        filters.q = Some("ELECTION".into());
        assert_eq!(query(&ds, &filters).total, 1);

        // excerpt is searched too
        filters.q = Some("excerpt for other".into());
        assert_eq!(query(&ds, &filters).total, 1);
    }

    #[test]
    fn dimensions_or_within_and_across() {
        let ds = scenario();
        let mut filters = Filters::default();
        filters.actors = set(&["China", "Russia"]);
        assert_eq!(query(&ds, &filters).total, 2); // OR within a dimension

        filters.tools = set(&["Cyber"]);
        assert_eq!(query(&ds, &filters).total, 2);

        filters.countries = set(&["Taiwan"]);
        assert_eq!(query(&ds, &filters).total, 1); // AND across dimensions
    }

    #[test]
    fn adding_a_dimension_never_grows_the_result() {
        let ds = scenario();
        let mut filters = Filters::default();
        let base = query(&ds, &filters).total;

        filters.actors = set(&["China"]);
        let narrowed = query(&ds, &filters).total;
        assert!(narrowed <= base);

        filters.tools = set(&["Cyber"]);
        assert!(query(&ds, &filters).total <= narrowed);
    }

    #[test]
    fn multi_valued_incidents_fan_out_but_count_once_in_total() {
        let ds = dataset(vec![incident(
            1,
            "joint",
            Some("2024-03-01"),
            &["China", "Russia"],
            &["Cyber"],
            &["Moldova"],
            true,
        )]);
        let out = query(&ds, &Filters::default());
        assert_eq!(out.total, 1);
        assert_eq!(out.heatmap.len(), 2); // one row per actor
        assert!(out.heatmap.iter().all(|row| row.count == 1));
        assert_eq!(out.stacked.len(), 2);
    }

    #[test]
    fn unattributed_incidents_bucket_under_placeholders() {
        let ds = dataset(vec![incident(1, "a", Some("2024-01-01"), &[], &[], &[], true)]);
        let out = query(&ds, &Filters::default());
        assert_eq!(out.heatmap[0].actor, UNKNOWN_ACTOR);
        assert_eq!(out.stacked[0].tool, UNSPECIFIED_TOOL);
        assert_eq!(out.country_actor[0].country, UNASSIGNED_COUNTRY);
    }

    #[test]
    fn list_sorts_newest_first_with_id_tiebreak() {
        let ds = dataset(vec![
            incident(5, "old", Some("2020-01-01"), &[], &[], &[], true),
            incident(4, "tie-b", Some("2024-05-01"), &[], &[], &[], true),
            incident(2, "tie-a", Some("2024-05-01"), &[], &[], &[], true),
            incident(1, "undated", None, &[], &[], &[], true),
        ]);
        let out = query(&ds, &Filters::default());
        let ids: Vec<i64> = out.incidents.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 4, 5, 1]);
    }

    #[test]
    fn absurd_page_numbers_yield_an_empty_page() {
        let ds = scenario();
        let mut filters = Filters::default();
        filters.page = usize::MAX;
        filters.page_size = 100;
        let out = query(&ds, &filters);
        assert_eq!(out.total, 2);
        assert!(out.incidents.is_empty());
    }

    #[test]
    fn every_page_sums_to_total() {
        let ds = dataset(
            (1..=7)
                .map(|i| incident(i, "x", Some("2024-01-01"), &["A"], &[], &[], true))
                .collect(),
        );
        let mut filters = Filters::default();
        filters.page_size = 3;
        let total = query(&ds, &filters).total;

        let mut seen = 0;
        for page in 1..=3 {
            filters.page = page;
            seen += query(&ds, &filters).incidents.len();
        }
        assert_eq!(seen, total);
    }

    #[test]
    fn single_valued_dimension_counts_sum_exactly_to_total() {
        let ds = scenario();
        let out = query(&ds, &Filters::default());
        let heatmap_sum: u64 = out.heatmap.iter().map(|r| r.count).sum();
        assert_eq!(heatmap_sum, out.total as u64);
    }
}
