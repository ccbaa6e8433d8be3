//! Item listing, tagged by the `status`, `since` and `until` query parameters.

use axum::{extract::Query, routing::get, Json, Router};
use serde_json::{json, Value};

use super::interceptor;
use crate::state::AppState;

const ITEMS: [(u32, &str, &str); 4] = [
    (1, "forecast", "active"),
    (2, "analysis", "active"),
    (3, "reanalysis", "archived"),
    (4, "hindcast", "pending"),
];

/// Registers the `/items` group under the `items` metric.
pub fn routes(state: &AppState) -> Router<AppState> {
    let metrics = interceptor(state)
        .metric("items")
        .tags(["group:items"])
        .query_parameters(["status", "since", "until"]);

    Router::new()
        .route("/items", get(list_items))
        .layer(metrics.into_layer())
}

/// Lists items, keeping only the requested statuses when any are given.
async fn list_items(Query(params): Query<Vec<(String, String)>>) -> Json<Value> {
    let statuses: Vec<&str> = params
        .iter()
        .filter(|(name, _)| name == "status")
        .map(|(_, value)| value.as_str())
        .collect();

    let data: Vec<Value> = ITEMS
        .iter()
        .filter(|(_, _, status)| statuses.is_empty() || statuses.contains(status))
        .map(|(id, name, status)| json!({"id": id, "name": name, "status": status}))
        .collect();

    Json(json!({ "data": data }))
}
