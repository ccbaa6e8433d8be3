//! Coarse range labels used in place of raw numbers to bound tag cardinality.

/// Label returned for values outside every range (negative or NaN).
pub const UNKNOWN_BUCKET: &str = "unknown";

/// A half-open range `[min, max)` and its label.
#[derive(Debug, Clone, Copy)]
pub struct BucketRange {
    pub min: f64,
    pub max: f64,
    pub label: &'static str,
}

const fn range(min: f64, max: f64, label: &'static str) -> BucketRange {
    BucketRange { min, max, label }
}

/// Contiguous, non-overlapping ranges covering `[0, inf)`.
pub const BUCKETS: &[BucketRange] = &[
    range(0.0, 1.0, "0"),
    range(1.0, 11.0, "1-10"),
    range(11.0, 26.0, "11-25"),
    range(26.0, 51.0, "26-50"),
    range(51.0, 101.0, "51-100"),
    range(101.0, 251.0, "101-250"),
    range(251.0, 501.0, "251-500"),
    range(501.0, 1001.0, "501-1000"),
    range(1001.0, 2501.0, "1001-2500"),
    range(2501.0, 5001.0, "2501-5000"),
    range(5001.0, f64::INFINITY, "gt5000"),
];

/// Maps a value to its bucket label.
///
/// Fractional values fall into the range that contains them, so `0.5` hours
/// is `"0"` and `10.9` is `"1-10"`.
pub fn bucket(value: f64) -> &'static str {
    BUCKETS
        .iter()
        .find(|b| value >= b.min && value < b.max)
        .map(|b| b.label)
        .unwrap_or(UNKNOWN_BUCKET)
}

/// Convenience for element counts.
pub fn bucket_count(count: usize) -> &'static str {
    bucket(count as f64)
}
