//! HTTP route definitions and handlers.
//!
//! Each instrumented route group carries its own metrics layer, so groups
//! report under different metric names with their own tagging rules.

mod health_routes;
mod item_routes;
mod report_routes;

use crate::middleware::RequestMetricsInterceptor;
use crate::state::AppState;
use axum::Router;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(item_routes::routes(&state))
        .merge(report_routes::routes(&state))
        .merge(health_routes::routes())
        .with_state(state)
}

/// Interceptor sharing the process-wide settings and client.
fn interceptor(state: &AppState) -> RequestMetricsInterceptor {
    RequestMetricsInterceptor::new(
        std::sync::Arc::new(state.config.dogstatsd.clone()),
        state.client.clone(),
    )
}
