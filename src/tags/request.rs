//! Tags derived from the inbound request.

use axum::extract::{MatchedPath, Request};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::debug;

use super::bucket::{bucket, bucket_count};
use super::query::QueryParams;
use crate::error::TagError;

const MILLIS_PER_DAY: i64 = 86_400_000;
const HOURS_PER_WEEK: f64 = 168.0;
const DAYS_PER_MONTH: f64 = 30.0;

/// Timestamp layouts carrying an explicit offset, tried after RFC 3339.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Layouts without an offset. These are read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts, read as midnight UTC.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// The parts of a request that tagging looks at.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub method: String,
    pub scheme: String,
    pub path: String,
    /// Route template matched by the router, if any.
    pub endpoint: Option<String>,
    pub query: QueryParams,
}

impl RequestInfo {
    /// Extracts method, scheme, path, matched route and query from an axum request.
    ///
    /// A query string that fails to decode is treated as empty.
    /// `X-Forwarded-Proto` only counts when `trust_forwarded_proto` is set.
    pub fn from_request(request: &Request, trust_forwarded_proto: bool) -> Self {
        let query = QueryParams::from_uri(request.uri()).unwrap_or_else(|e| {
            debug!("Skipping query parameter tags: {}", e);
            QueryParams::default()
        });

        RequestInfo {
            method: request.method().as_str().to_string(),
            scheme: scheme_of(request, trust_forwarded_proto),
            path: request.uri().path().to_string(),
            endpoint: request
                .extensions()
                .get::<MatchedPath>()
                .map(|p| p.as_str().to_string()),
            query,
        }
    }
}

/// Absolute URI scheme, then `X-Forwarded-Proto` if trusted, then plain `http`.
fn scheme_of(request: &Request, trust_forwarded_proto: bool) -> String {
    if let Some(scheme) = request.uri().scheme_str() {
        return scheme.to_ascii_lowercase();
    }
    if !trust_forwarded_proto {
        return "http".to_string();
    }
    request
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http".to_string())
}

/// Default tags for every request: method, protocol, path, endpoint, then
/// query parameter and duration tags.
pub fn request_tags(info: &RequestInfo, allowed_params: &[String], tag_all: bool) -> Vec<String> {
    let mut tags = vec![
        format!("method:{}", info.method),
        format!("protocol:{}", info.scheme),
        format!("path:{}", info.path),
    ];
    if let Some(endpoint) = &info.endpoint {
        tags.push(format!("endpoint:{}", endpoint));
    }

    tags.extend(query_param_tags(&info.query, allowed_params, tag_all));

    if let (Some(since), Some(until)) = (info.query.first("since"), info.query.first("until")) {
        match duration_tags(since, until) {
            Ok(duration) => tags.extend(duration),
            Err(e) => debug!("Skipping duration tags: {}", e),
        }
    }

    tags
}

/// Value and count tags for the selected query parameters.
///
/// Unless `tag_all` is set, only names in `allowed_params` are tagged.
pub fn query_param_tags(params: &QueryParams, allowed_params: &[String], tag_all: bool) -> Vec<String> {
    let mut tags = Vec::new();
    let selected = params
        .names()
        .filter(|name| tag_all || allowed_params.iter().any(|a| a.as_str() == *name));

    for name in selected {
        let values = params.get_all(name);
        let joined = values.join(format!(",{}:", name).as_str());
        tags.push(format!("{}:{}", name, joined));
        tags.push(format!("{}.count:{}", name, values.len()));
        tags.push(format!("{}.count.bucket:{}", name, bucket_count(values.len())));
    }
    tags
}

/// Tags describing the span between the `since` and `until` parameters.
///
/// Both must parse, otherwise no duration tag is produced.
pub fn duration_tags(since: &str, until: &str) -> Result<Vec<String>, TagError> {
    let since = parse_timestamp(since)?;
    let until = parse_timestamp(until)?;
    let duration = until - since;

    let millis = duration.num_milliseconds();
    let hours = millis as f64 / 3_600_000.0;
    let days = millis.div_euclid(MILLIS_PER_DAY);
    let weeks = (hours / HOURS_PER_WEEK).round_ties_even();
    let months = (days as f64 / DAYS_PER_MONTH).round_ties_even();

    Ok(vec![
        format!("duration_days:{}", days),
        format!("duration_hours.bucket:{}", bucket(hours)),
        format!("duration_days.bucket:{}", bucket(days as f64)),
        format!("duration_weeks:{}", bucket(weeks)),
        format!("duration_months:{}", bucket(months)),
    ])
}

/// Best-effort timestamp parsing, normalised to UTC.
///
/// ISO layouts and compact `YYYYMMDD` dates are tried first; anything else
/// goes through `dateparser` (slash dates, month names, unix seconds, ...).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TagError> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Some(naive) = NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(naive.and_utc());
        }
    }
    // missing times default to midnight, missing zones to UTC
    dateparser::parse_with(value, &Utc, NaiveTime::MIN)
        .map_err(|_| TagError::InvalidTimestamp(raw.to_string()))
}
