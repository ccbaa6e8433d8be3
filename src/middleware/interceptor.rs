//! The pre- and post-handler hooks.
//!
//! Every step is best effort: a failing tagger, an unreadable body or a
//! collector outage drops the affected tags or metrics and nothing else.
//! `after_request` always hands back the response it was given.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::Request;
use axum::response::Response;
use http::StatusCode;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::context::RequestContext;
use super::layer::RequestMetricsLayer;
use crate::config::DogStatsdConfig;
use crate::error::{MetricsError, TagError};
use crate::metrics::MetricsClient;
use crate::tags::{request_tags, response_tags, RequestInfo};
use crate::utils::log_throttle::LogThrottle;

/// Extra tags computed from the inbound request.
pub trait RequestTagger: Send + Sync + 'static {
    fn tags(&self, request: &Request) -> Result<Vec<String>, TagError>;
}

impl<F> RequestTagger for F
where
    F: Fn(&Request) -> Result<Vec<String>, TagError> + Send + Sync + 'static,
{
    fn tags(&self, request: &Request) -> Result<Vec<String>, TagError> {
        self(request)
    }
}

/// Extra tags computed from the parsed response body, if it parsed.
pub trait ResponseTagger: Send + Sync + 'static {
    fn tags(&self, body: Option<&Value>) -> Result<Vec<String>, TagError>;
}

impl<F> ResponseTagger for F
where
    F: Fn(Option<&Value>) -> Result<Vec<String>, TagError> + Send + Sync + 'static,
{
    fn tags(&self, body: Option<&Value>) -> Result<Vec<String>, TagError> {
        self(body)
    }
}

/// Tags requests and emits timing and response-code metrics for one route group.
///
/// ```ignore
/// let interceptor = RequestMetricsInterceptor::new(settings, client)
///     .metric("items")
///     .tags(["team:catalog"])
///     .query_parameters(["status", "since", "until"]);
///
/// let items = Router::new()
///     .route("/items", get(list_items))
///     .layer(interceptor.into_layer());
/// ```
#[derive(Clone)]
pub struct RequestMetricsInterceptor {
    settings: Arc<DogStatsdConfig>,
    client: Arc<dyn MetricsClient>,
    metric: Option<String>,
    tags: Vec<String>,
    query_parameters: Vec<String>,
    request_tagger: Option<Arc<dyn RequestTagger>>,
    response_tagger: Option<Arc<dyn ResponseTagger>>,
    throttle: Arc<LogThrottle>,
}

impl RequestMetricsInterceptor {
    pub fn new(settings: Arc<DogStatsdConfig>, client: Arc<dyn MetricsClient>) -> Self {
        RequestMetricsInterceptor {
            settings,
            client,
            metric: None,
            tags: Vec::new(),
            query_parameters: Vec::new(),
            request_tagger: None,
            response_tagger: None,
            throttle: Arc::new(LogThrottle::default()),
        }
    }

    /// Metric name suffix appended to the configured prefix.
    pub fn metric(mut self, metric: impl Into<String>) -> Self {
        self.metric = Some(metric.into());
        self
    }

    /// Static tags placed first on every request.
    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Query parameters eligible for tagging.
    pub fn query_parameters<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.query_parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn request_tagger(mut self, tagger: impl RequestTagger) -> Self {
        self.request_tagger = Some(Arc::new(tagger));
        self
    }

    pub fn response_tagger(mut self, tagger: impl ResponseTagger) -> Self {
        self.response_tagger = Some(Arc::new(tagger));
        self
    }

    /// Wraps the interceptor in a tower layer.
    pub fn into_layer(self) -> RequestMetricsLayer {
        RequestMetricsLayer::new(self)
    }

    /// Full metric name for this route group.
    pub fn metric_name(&self) -> String {
        self.settings.metric_name(self.metric.as_deref())
    }

    /// Pre-handler: starts the clock and collects request tags.
    pub fn before_request(&self, request: &Request) -> RequestContext {
        let mut context = RequestContext::begin();
        context.tags.extend(self.tags.iter().cloned());

        if let Some(tagger) = &self.request_tagger {
            match guard_tagger(|| tagger.tags(request)) {
                Ok(extra) => context.tags.extend(extra),
                Err(e) => debug!("Request tagger skipped: {}", e),
            }
        }

        let info = RequestInfo::from_request(request, self.settings.trust_forwarded_proto);
        context.tags.extend(request_tags(
            &info,
            &self.query_parameters,
            self.settings.tag_all_query_params,
        ));
        context
    }

    /// Post-handler: tags the response and emits metrics.
    ///
    /// The returned response carries the same status, headers and body bytes.
    pub async fn after_request(&self, context: RequestContext, response: Response) -> Response {
        let (response, body) = inspect_body(response, self.settings.max_body_bytes).await;
        let status = response.status();
        let elapsed = context.elapsed_millis();

        let mut tags = context.tags;
        if let Some(tagger) = &self.response_tagger {
            match guard_tagger(|| tagger.tags(body.as_ref())) {
                Ok(extra) => tags.extend(extra),
                Err(e) => debug!("Response tagger skipped: {}", e),
            }
        }
        tags.extend(response_tags(status, body.as_ref()));

        if self.settings.enabled {
            let emitted = catch_unwind(AssertUnwindSafe(|| self.emit(status, elapsed, tags)));
            if emitted.is_err() {
                error!("Metrics client panicked, metrics for this request dropped");
            }
        }
        response
    }

    fn emit(&self, status: StatusCode, elapsed: Option<u64>, mut tags: Vec<String>) {
        tags.push(self.settings.app_tag());
        tags.push(self.settings.environment_tag());
        let metric = self.metric_name();

        match elapsed {
            Some(millis) => self.report(self.client.timing(&metric, millis, &tags)),
            None => debug!("No start time for '{}', timing skipped", metric),
        }
        self.report(self.client.increment(
            &format!("{}.response_code.{}", metric, status.as_u16()),
            1,
            &tags,
        ));
        self.report(
            self.client
                .increment(&format!("{}.response_code.all", metric), 1, &tags),
        );
    }

    fn report(&self, result: Result<(), MetricsError>) {
        if let Err(e) = result {
            if let Some(suppressed) = self.throttle.should_emit(e.kind()) {
                warn!(suppressed, "Dropping metric: {}", e);
            }
        }
    }
}

/// Runs a user tagger, turning a panic into an error.
fn guard_tagger<F>(tagger: F) -> Result<Vec<String>, TagError>
where
    F: FnOnce() -> Result<Vec<String>, TagError>,
{
    catch_unwind(AssertUnwindSafe(tagger)).unwrap_or(Err(TagError::CallbackPanicked))
}

/// Buffers and parses a JSON body of known size up to `limit` bytes.
///
/// Bodies of unknown or larger size pass through untouched and yield no
/// parsed value. A body that fails while buffering is replaced by one that
/// yields the same error.
async fn inspect_body(response: Response, limit: usize) -> (Response, Option<Value>) {
    match response.body().size_hint().upper() {
        Some(size) if size <= limit as u64 => {}
        _ => return (response, None),
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let parsed = if bytes.is_empty() {
                None
            } else {
                serde_json::from_slice::<Value>(&bytes).ok()
            };
            (Response::from_parts(parts, Body::from(bytes)), parsed)
        }
        Err(e) => {
            debug!("{}", TagError::Body(e.to_string()));
            let failed = futures::stream::once(async move { Err::<Bytes, _>(e) });
            (Response::from_parts(parts, Body::from_stream(failed)), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MemoryClient, RecordedMetric};
    use http_body::{Frame, SizeHint};
    use serde_json::json;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Announces a size, then fails on the first read.
    struct BrokenBody;

    impl HttpBody for BrokenBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "upstream reset",
            ))))
        }

        fn size_hint(&self) -> SizeHint {
            SizeHint::with_exact(16)
        }
    }

    struct PanickingClient;

    impl MetricsClient for PanickingClient {
        fn timing(&self, _name: &str, _millis: u64, _tags: &[String]) -> Result<(), MetricsError> {
            panic!("client bug")
        }

        fn increment(&self, _name: &str, _amount: i64, _tags: &[String]) -> Result<(), MetricsError> {
            panic!("client bug")
        }
    }

    fn settings() -> Arc<DogStatsdConfig> {
        let mut settings = DogStatsdConfig::new("localhost", "content.");
        settings.environment = "Test".to_string();
        Arc::new(settings)
    }

    fn request(uri: &str) -> Request {
        http::Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn json_response(status: StatusCode, body: Value) -> Response {
        http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_before_request_orders_tags() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client)
            .tags(["team:catalog"])
            .query_parameters(["status"])
            .request_tagger(|req: &Request| -> Result<Vec<String>, TagError> {
                Ok(vec![format!("verb:{}", req.method().as_str().to_lowercase())])
            });

        let context = interceptor.before_request(&request("/items?status=a&status=b&other=1"));
        assert_eq!(
            context.tags,
            vec![
                "team:catalog",
                "verb:get",
                "method:GET",
                "protocol:http",
                "path:/items",
                "status:a,status:b",
                "status.count:2",
                "status.count.bucket:1-10",
            ]
        );
        assert!(context.start.is_some());
    }

    #[test]
    fn test_failing_request_tagger_keeps_default_tags() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client)
            .request_tagger(|_: &Request| -> Result<Vec<String>, TagError> {
                Err(TagError::Callback("boom".into()))
            });

        let context = interceptor.before_request(&request("/items"));
        assert_eq!(context.tags, vec!["method:GET", "protocol:http", "path:/items"]);
    }

    #[test]
    fn test_panicking_request_tagger_keeps_default_tags() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client)
            .request_tagger(|_: &Request| -> Result<Vec<String>, TagError> { panic!("tagger bug") });

        let context = interceptor.before_request(&request("/items"));
        assert_eq!(context.tags.len(), 3);
        assert!(context.start.is_some());
    }

    #[tokio::test]
    async fn test_after_request_emits_timing_and_counters() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone()).metric("items");

        let context = RequestContext {
            tags: vec!["method:GET".into()],
            ..RequestContext::begin()
        };
        let response = interceptor
            .after_request(context, json_response(StatusCode::OK, json!({"data": [1, 2, 3]})))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let expected_tags = vec![
            "method:GET",
            "response_code:200",
            "response_data.length:3",
            "response_data.length.bucket:1-10",
            "app:content_service",
            "environment:test",
        ];
        let records = client.records();
        assert_eq!(records.len(), 3);
        assert!(matches!(&records[0], RecordedMetric::Timing { name, .. } if name == "content.items"));
        assert_eq!(records[1].name(), "content.items.response_code.200");
        assert_eq!(records[2].name(), "content.items.response_code.all");
        for record in &records {
            assert_eq!(record.tags(), expected_tags.as_slice());
        }
        assert!(matches!(&records[1], RecordedMetric::Increment { amount: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_start_skips_timing_only() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone());

        let response = interceptor
            .after_request(RequestContext::default(), json_response(StatusCode::CREATED, json!({})))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let names: Vec<String> = client.records().iter().map(|r| r.name().to_string()).collect();
        assert_eq!(names, vec!["content..response_code.201", "content..response_code.all"]);
    }

    #[tokio::test]
    async fn test_disabled_emits_nothing() {
        let mut disabled = DogStatsdConfig::new("localhost", "content.");
        disabled.enabled = false;
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(Arc::new(disabled), client.clone());

        let context = interceptor.before_request(&request("/items"));
        let response = interceptor
            .after_request(context, json_response(StatusCode::OK, json!({"data": []})))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, r#"{"data":[]}"#);
        assert!(client.records().is_empty());
    }

    #[tokio::test]
    async fn test_collector_failure_returns_original_response() {
        let client = Arc::new(MemoryClient::failing());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone());

        let context = interceptor.before_request(&request("/items"));
        let response = interceptor
            .after_request(
                context,
                json_response(StatusCode::ACCEPTED, json!({"data": {"id": 7}})),
            )
            .await;

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_string(response).await, r#"{"data":{"id":7}}"#);
        // every emission was still attempted
        assert_eq!(client.records().len(), 3);
    }

    #[tokio::test]
    async fn test_response_tagger_sees_parsed_body() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone()).response_tagger(
            |body: Option<&Value>| -> Result<Vec<String>, TagError> {
                let kind = body
                    .and_then(|b| b.get("kind"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| TagError::Callback("no kind".into()))?;
                Ok(vec![format!("kind:{}", kind)])
            },
        );

        interceptor
            .after_request(RequestContext::begin(), json_response(StatusCode::OK, json!({"kind": "report"})))
            .await;
        assert_eq!(client.records()[0].tags()[0], "kind:report");

        client.clear();
        interceptor
            .after_request(
                RequestContext::begin(),
                Response::new(Body::from("plain text, not json")),
            )
            .await;
        assert_eq!(client.records()[0].tags()[0], "response_code:200");
    }

    #[tokio::test]
    async fn test_oversize_body_is_not_inspected() {
        let mut small = DogStatsdConfig::new("localhost", "content.");
        small.max_body_bytes = 8;
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(Arc::new(small), client.clone());

        let body = json!({"data": [1, 2, 3, 4, 5]});
        let response = interceptor
            .after_request(RequestContext::begin(), json_response(StatusCode::OK, body.clone()))
            .await;

        assert_eq!(body_string(response).await, body.to_string());
        assert!(client.records()[0]
            .tags()
            .iter()
            .all(|t| !t.starts_with("response_data")));
    }

    #[tokio::test]
    async fn test_panicking_response_tagger_keeps_response_and_metrics() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone()).response_tagger(
            |_: Option<&Value>| -> Result<Vec<String>, TagError> { panic!("tagger bug") },
        );

        let response = interceptor
            .after_request(
                RequestContext::begin(),
                json_response(StatusCode::OK, json!({"data": [1, 2]})),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_string(response).await, r#"{"data":[1,2]}"#);

        let records = client.records();
        assert_eq!(records.len(), 3);
        assert_eq!(
            &records[0].tags()[..3],
            ["response_code:200", "response_data.length:2", "response_data.length.bucket:1-10"]
        );
    }

    #[tokio::test]
    async fn test_panicking_client_returns_original_response() {
        let interceptor = RequestMetricsInterceptor::new(settings(), Arc::new(PanickingClient));

        let context = interceptor.before_request(&request("/items"));
        let response = interceptor
            .after_request(
                context,
                json_response(StatusCode::NOT_FOUND, json!({"error": "missing"})),
            )
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(body_string(response).await, r#"{"error":"missing"}"#);
    }

    #[tokio::test]
    async fn test_body_read_error_reaches_the_client() {
        let client = Arc::new(MemoryClient::new());
        let interceptor = RequestMetricsInterceptor::new(settings(), client.clone());

        let broken = http::Response::builder()
            .status(StatusCode::OK)
            .body(Body::new(BrokenBody))
            .unwrap();
        let response = interceptor.after_request(RequestContext::begin(), broken).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
        assert!(client.records()[0]
            .tags()
            .iter()
            .all(|t| !t.starts_with("response_data")));
    }
}
