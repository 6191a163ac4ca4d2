//! Incident query endpoint
//!
//! The only business logic here is parameter parsing with clamping
//! defaults; filtering and aggregation live in the engine.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::engine;
use crate::models::{IncidentParams, IncidentsResponse};
use crate::AppState;

/// Filter, aggregate, and page the incident list.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<IncidentParams>,
) -> Json<IncidentsResponse> {
    let filters = params.into_filters();
    let response = engine::query(&state.dataset, &filters);
    tracing::debug!(
        total = response.total,
        page = response.page,
        "incident query"
    );
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dataset::{from_collection, RawCollection};
    use serde_json::json;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let raw: RawCollection = serde_json::from_value(json!({
            "features": [
                {
                    "geometry": { "coordinates": [121.5, 25.0] },
                    "properties": {
                        "country": "Taiwan",
                        "incidents": [
                            {
                                "post_id": 1,
                                "title": "A",
                                "start_date": ["20240615"],
                                "actors": [{"name": "China"}],
                                "tools": [{"name": "Cyber"}]
                            },
                            {
                                "post_id": 3,
                                "title": "C",
                                "start_date": ["20230201"],
                                "actors": [{"name": "China"}],
                                "tools": [{"name": "Disinfo"}],
                                "display": false
                            }
                        ]
                    }
                },
                {
                    "geometry": { "coordinates": [30.5, 50.4] },
                    "properties": {
                        "country": "Ukraine",
                        "incidents": [{
                            "post_id": 2,
                            "title": "B",
                            "start_date": ["20240701"],
                            "actors": [{"name": "Russia"}],
                            "tools": [{"name": "Cyber"}]
                        }]
                    }
                }
            ]
        }))
        .unwrap();

        AppState {
            dataset: Arc::new(from_collection(raw)),
            config: Config {
                dataset_path: "unused".into(),
                port: 0,
                environment: "test".into(),
            },
        }
    }

    #[tokio::test]
    async fn unfiltered_query_excludes_hidden_incidents() {
        let Json(response) = list(State(test_state()), Query(IncidentParams::default())).await;
        assert_eq!(response.total, 2);
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 25);
        // newest first
        assert_eq!(response.incidents[0].id, 2);
        assert_eq!(response.heatmap.len(), 2);
        assert_eq!(response.country_meta.len(), 2);
    }

    #[tokio::test]
    async fn actor_filter_and_csv_parsing() {
        let params = IncidentParams {
            actors: Some("China".into()),
            ..Default::default()
        };
        let Json(response) = list(State(test_state()), Query(params)).await;
        assert_eq!(response.total, 1);
        assert_eq!(response.incidents[0].id, 1);
        // country_meta stays static reference data under any filter
        assert_eq!(response.country_meta.len(), 2);
    }

    #[tokio::test]
    async fn huge_page_numbers_return_an_empty_page() {
        let params = IncidentParams {
            page: Some("18446744073709551615".into()),
            page_size: Some("100".into()),
            ..Default::default()
        };
        let Json(response) = list(State(test_state()), Query(params)).await;
        assert_eq!(response.total, 2);
        assert!(response.incidents.is_empty());
    }

    #[tokio::test]
    async fn malformed_paging_degrades_to_defaults() {
        let params = IncidentParams {
            page: Some("not-a-number".into()),
            page_size: Some("0".into()),
            ..Default::default()
        };
        let Json(response) = list(State(test_state()), Query(params)).await;
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 1); // clamped up from 0
        assert_eq!(response.total, 2);
    }
}
