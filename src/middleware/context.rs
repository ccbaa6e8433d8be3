use std::time::Instant;

/// Per-request state carried from the pre-handler to the post-handler.
///
/// Lives inside the request's own future and is consumed when the response
/// is tagged, so concurrent requests never share one.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub tags: Vec<String>,
    /// `None` when the pre-handler never ran.
    pub start: Option<Instant>,
}

impl RequestContext {
    /// Empty tag list, clock started now.
    pub fn begin() -> Self {
        RequestContext {
            tags: Vec::new(),
            start: Some(Instant::now()),
        }
    }

    /// Whole milliseconds since the start, rounded.
    pub fn elapsed_millis(&self) -> Option<u64> {
        self.start
            .map(|start| (start.elapsed().as_secs_f64() * 1000.0).round() as u64)
    }
}
