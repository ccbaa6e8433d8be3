#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::Value;
use tagmeter::config::{Config, ConfigV1};
use tagmeter::metrics::{MemoryClient, RecordedMetric};
use tagmeter::routes::create_router;
use tagmeter::state::AppState;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:8081
logging:
  level: "debug"
  format: "json"
dogstatsd:
  host: localhost
  prefix: "content."
  environment: "Test"
"#;

pub fn load_test_config() -> ConfigV1 {
    let config: Config = Figment::new()
        .merge(Yaml::string(TEST_CONFIG))
        .extract()
        .expect("Failed to parse test config YAML");

    match config {
        Config::ConfigV1(cfg) => cfg,
    }
}

pub fn build_app_with_client(config: ConfigV1, client: Arc<MemoryClient>) -> Router {
    let state = AppState::new(Arc::new(config), client);
    create_router(state)
}

pub fn build_app(config: ConfigV1) -> (Router, Arc<MemoryClient>) {
    let client = Arc::new(MemoryClient::new());
    (build_app_with_client(config, client.clone()), client)
}

pub fn build_request(path: &str, method: Method) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub fn has_tag(record: &RecordedMetric, tag: &str) -> bool {
    record.tags().iter().any(|t| t == tag)
}

pub fn names(records: &[RecordedMetric]) -> Vec<String> {
    records.iter().map(|r| r.name().to_string()).collect()
}
