//! Tag derivation for requests and responses.

pub mod bucket;
pub mod query;
pub mod request;
pub mod response;

pub use bucket::{bucket, bucket_count, BUCKETS, UNKNOWN_BUCKET};
pub use query::QueryParams;
pub use request::{duration_tags, parse_timestamp, query_param_tags, request_tags, RequestInfo};
pub use response::response_tags;
