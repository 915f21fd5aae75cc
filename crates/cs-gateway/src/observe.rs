//! Request timing middleware.
//!
//! A small tower layer recording per-request latency into the metrics
//! registry. Sits outside the gateway pipeline so it also times requests
//! that never resolve to a route.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::Request;
use axum::response::Response;
use tower::{Layer, Service};

use crate::metrics::record_request_latency;

#[derive(Clone, Default)]
pub struct RequestMetricsLayer;

impl RequestMetricsLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestMetricsLayer {
    type Service = RequestMetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestMetricsMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct RequestMetricsMiddleware<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestMetricsMiddleware<S>
where
    S: Service<Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let method = req.method().to_string();
        let start = Instant::now();

        let future = self.inner.call(req);
        Box::pin(async move {
            let response = future.await?;
            record_request_latency(&method, start.elapsed());
            Ok(response)
        })
    }
}
