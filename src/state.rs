//! Shared application state.

use crate::config::ConfigV1;
use crate::metrics::MetricsClient;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// Collector client shared by every instrumented route group.
    pub client: Arc<dyn MetricsClient>,
}

impl AppState {
    pub fn new(config: Arc<ConfigV1>, client: Arc<dyn MetricsClient>) -> Self {
        AppState { config, client }
    }
}
