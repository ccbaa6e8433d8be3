//! Request/response instrumentation for axum route groups.
//!
//! [`RequestMetricsInterceptor`] holds the two hooks; [`RequestMetricsLayer`]
//! runs them around every request of the router it is applied to:
//!
//! | metric | kind |
//! |--------|------|
//! | `<prefix><metric>` | timing (ms) |
//! | `<prefix><metric>.response_code.<status>` | counter |
//! | `<prefix><metric>.response_code.all` | counter |
//!
//! All three carry the same tag set.

mod context;
mod interceptor;
mod layer;

pub use context::RequestContext;
pub use interceptor::{RequestMetricsInterceptor, RequestTagger, ResponseTagger};
pub use layer::{RequestMetricsLayer, RequestMetricsService};
