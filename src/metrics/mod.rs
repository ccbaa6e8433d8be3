//! Metric submission to a DogStatsD-compatible collector.
//!
//! The interceptor only sees [`MetricsClient`]; the UDP client and the
//! in-memory client are the two implementations shipped here.

mod client;
mod dogstatsd;
mod memory;

pub use client::MetricsClient;
pub use dogstatsd::DogStatsdClient;
pub use memory::{MemoryClient, RecordedMetric};
