use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Interval used for metric emission warnings.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    opened_at: Instant,
    suppressed: u64,
}

/// Rate limiter for repetitive warnings, one window per key.
///
/// Holds only counters, never request data.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    windows: Mutex<HashMap<&'static str, Window>>,
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        LogThrottle {
            interval,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `Some(suppressed)` when a warning for `key` may be logged,
    /// `None` when it falls inside the open window and was counted instead.
    pub fn should_emit(&self, key: &'static str) -> Option<u64> {
        // Counters only, a poisoned lock is still usable.
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        match windows.get_mut(key) {
            Some(window) if now.duration_since(window.opened_at) >= self.interval => {
                let suppressed = window.suppressed;
                window.opened_at = now;
                window.suppressed = 0;
                Some(suppressed)
            }
            Some(window) => {
                window.suppressed += 1;
                None
            }
            None => {
                windows.insert(
                    key,
                    Window {
                        opened_at: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }
}
