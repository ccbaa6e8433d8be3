//! Error types for tag derivation and metric emission.
//!
//! Neither kind ever reaches the HTTP client: tag errors drop the affected
//! tags, metric errors drop the affected submission.

use thiserror::Error;

/// A failure while deriving tags for a request or response.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("invalid query string: {0}")]
    InvalidQuery(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("tag callback failed: {0}")]
    Callback(String),

    #[error("tag callback panicked")]
    CallbackPanicked,

    #[error("response body unavailable: {0}")]
    Body(String),
}

/// A failure while handing a metric to the collector client.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("collector socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metric not sent: {0}")]
    Transport(#[from] cadence::MetricError),

    #[error("metric rejected: {0}")]
    Rejected(String),
}

impl MetricsError {
    /// Short stable key used to rate-limit warnings per failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricsError::Io(_) => "metrics.io",
            MetricsError::Transport(_) => "metrics.transport",
            MetricsError::Rejected(_) => "metrics.rejected",
        }
    }
}
