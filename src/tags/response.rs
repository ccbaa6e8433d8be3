//! Tags derived from the outgoing response.

use http::StatusCode;
use serde_json::Value;

use super::bucket::bucket_count;

/// `response_code`, plus data-length tags when the body carries a `data` key.
pub fn response_tags(status: StatusCode, body: Option<&Value>) -> Vec<String> {
    let mut tags = vec![format!("response_code:{}", status.as_u16())];

    if let Some(len) = body.and_then(data_length) {
        tags.push(format!("response_data.length:{}", len));
        tags.push(format!("response_data.length.bucket:{}", bucket_count(len)));
    }
    tags
}

/// Size of `body["data"]`, measured by its own shape.
///
/// Scalars other than strings have no length.
fn data_length(body: &Value) -> Option<usize> {
    match body.as_object()?.get("data")? {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}
