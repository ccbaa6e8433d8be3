//! Report lookup, with custom request and response taggers.

use axum::{
    extract::{Path, Request},
    http::{header::USER_AGENT, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use super::interceptor;
use crate::error::TagError;
use crate::state::AppState;

const REPORT_KINDS: [&str; 3] = ["daily", "weekly", "monthly"];

/// Registers the `/reports/:kind` group under the `reports` metric.
pub fn routes(state: &AppState) -> Router<AppState> {
    let metrics = interceptor(state)
        .metric("reports")
        .tags(["group:reports"])
        .request_tagger(client_tag)
        .response_tagger(report_kind_tag);

    Router::new()
        .route("/reports/:kind", get(get_report))
        .layer(metrics.into_layer())
}

/// `client:<first user-agent token>`, e.g. `client:curl`.
fn client_tag(request: &Request) -> Result<Vec<String>, TagError> {
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split('/').next())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| TagError::Callback("no usable user-agent".to_string()))?;
    Ok(vec![format!("client:{}", agent.to_lowercase())])
}

/// `report_kind:<kind>` from a successful report body.
fn report_kind_tag(body: Option<&Value>) -> Result<Vec<String>, TagError> {
    let kind = body
        .and_then(|body| body.pointer("/data/kind"))
        .and_then(Value::as_str)
        .ok_or_else(|| TagError::Callback("response has no report kind".to_string()))?;
    Ok(vec![format!("report_kind:{}", kind)])
}

async fn get_report(Path(kind): Path<String>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !REPORT_KINDS.contains(&kind.as_str()) {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown report kind '{}'", kind) })),
        ));
    }
    let rows = match kind.as_str() {
        "daily" => 24,
        "weekly" => 7,
        _ => 30,
    };
    Ok(Json(json!({ "data": { "kind": kind, "rows": rows } })))
}
