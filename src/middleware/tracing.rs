use std::time::Instant;

use tracing::{field, info, info_span, warn};

use super::{Middleware, Next};
use crate::dispatcher::{Request, Response};

/// Wraps the inward chain in a `request` span and logs the outcome
///
/// Everything logged further inward (route handlers included) is recorded
/// inside the span, which carries the request id, method, path and the
/// matched route pattern.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        let span = info_span!(
            "request",
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            route = field::Empty,
            status = field::Empty,
            latency_ms = field::Empty,
        );
        if let Some(route) = req.route() {
            span.record("route", route.pattern());
        }
        let _guard = span.enter();

        let start = Instant::now();
        let result = next.run(req);
        let latency_ms = start.elapsed().as_millis() as u64;
        span.record("latency_ms", latency_ms);

        match &result {
            Ok(res) => {
                span.record("status", res.status);
                info!(status = res.status, latency_ms, "Request completed");
            }
            Err(err) => {
                warn!(error = %err, latency_ms, "Request failed");
            }
        }
        result
    }

    fn name(&self) -> &'static str {
        "TracingMiddleware"
    }
}
