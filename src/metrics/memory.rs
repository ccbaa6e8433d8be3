use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::client::MetricsClient;
use crate::error::MetricsError;

/// One call received by a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedMetric {
    Timing {
        name: String,
        millis: u64,
        tags: Vec<String>,
    },
    Increment {
        name: String,
        amount: i64,
        tags: Vec<String>,
    },
}

impl RecordedMetric {
    pub fn name(&self) -> &str {
        match self {
            RecordedMetric::Timing { name, .. } | RecordedMetric::Increment { name, .. } => name,
        }
    }

    pub fn tags(&self) -> &[String] {
        match self {
            RecordedMetric::Timing { tags, .. } | RecordedMetric::Increment { tags, .. } => tags,
        }
    }
}

/// In-process client that keeps every submission.
///
/// With [`MemoryClient::failing`] each call still records the attempt, then
/// returns an error, which is how collector outages are exercised in tests.
#[derive(Debug, Default)]
pub struct MemoryClient {
    records: Mutex<Vec<RecordedMetric>>,
    fail: AtomicBool,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call is rejected.
    pub fn failing() -> Self {
        let client = Self::default();
        client.set_failing(true);
        client
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of all recorded calls, oldest first.
    pub fn records(&self) -> Vec<RecordedMetric> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedMetric>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, metric: RecordedMetric) -> Result<(), MetricsError> {
        self.lock().push(metric);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetricsError::Rejected("memory client set to fail".to_string()));
        }
        Ok(())
    }
}

impl MetricsClient for MemoryClient {
    fn timing(&self, name: &str, millis: u64, tags: &[String]) -> Result<(), MetricsError> {
        self.record(RecordedMetric::Timing {
            name: name.to_string(),
            millis,
            tags: tags.to_vec(),
        })
    }

    fn increment(&self, name: &str, amount: i64, tags: &[String]) -> Result<(), MetricsError> {
        self.record(RecordedMetric::Increment {
            name: name.to_string(),
            amount,
            tags: tags.to_vec(),
        })
    }
}
