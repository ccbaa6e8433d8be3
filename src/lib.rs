//! Library exports for tagmeter, shared between the binary and tests.

pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod state;
pub mod tags;
pub mod utils;

pub use middleware::{RequestMetricsInterceptor, RequestMetricsLayer};
