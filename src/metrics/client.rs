//! The collector-facing interface used by the interceptor.

use crate::error::MetricsError;

/// A metrics collector client.
///
/// Calls must return quickly: implementations buffer locally and ship
/// data asynchronously, so a slow or absent collector never holds up a
/// response.
pub trait MetricsClient: Send + Sync + 'static {
    /// Records a duration in milliseconds.
    fn timing(&self, name: &str, millis: u64, tags: &[String]) -> Result<(), MetricsError>;

    /// Adds `amount` to a counter.
    fn increment(&self, name: &str, amount: i64, tags: &[String]) -> Result<(), MetricsError>;
}
