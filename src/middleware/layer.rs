//! tower integration: runs the interceptor hooks around the inner service.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use futures::FutureExt;
use tower::{Layer, Service};
use tracing::error;

use super::interceptor::RequestMetricsInterceptor;

/// Layer applying one [`RequestMetricsInterceptor`] to a route group.
#[derive(Clone)]
pub struct RequestMetricsLayer {
    interceptor: Arc<RequestMetricsInterceptor>,
}

impl RequestMetricsLayer {
    pub fn new(interceptor: RequestMetricsInterceptor) -> Self {
        RequestMetricsLayer {
            interceptor: Arc::new(interceptor),
        }
    }
}

impl<S> Layer<S> for RequestMetricsLayer {
    type Service = RequestMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestMetricsService {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

/// Service produced by [`RequestMetricsLayer`].
#[derive(Clone)]
pub struct RequestMetricsService<S> {
    inner: S,
    interceptor: Arc<RequestMetricsInterceptor>,
}

impl<S> Service<Request> for RequestMetricsService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // The context moves into this request's future and nowhere else.
        let context = self.interceptor.before_request(&request);
        let interceptor = self.interceptor.clone();

        // Use the instance that was driven to readiness.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            // A panicking handler is still counted, as a 500.
            let handled = AssertUnwindSafe(async move { inner.call(request).await })
                .catch_unwind()
                .await;
            let response = match handled {
                Ok(result) => result?,
                Err(_) => {
                    error!("Handler panicked, responding with 500");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
            Ok(interceptor.after_request(context, response).await)
        })
    }
}
