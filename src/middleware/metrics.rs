use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{Middleware, Next};
use crate::dispatcher::{Request, Response};

/// Middleware for collecting request metrics
///
/// Tracks request counts, latency, errors escaping the inward chain and a
/// per-status breakdown. All counters use atomic operations, so one instance
/// can be shared by every route.
///
/// Requests short-circuited by middleware registered *before* this one are not
/// counted; place it first in the global list to see everything.
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    error_count: AtomicUsize,
    status_counts: DashMap<u16, usize>,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of requests seen
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean processing time, zero before the first request
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Requests whose inward chain returned an error instead of a response
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Responses seen with the given status
    #[must_use]
    pub fn status_count(&self, status: u16) -> usize {
        self.status_counts.get(&status).map(|c| *c).unwrap_or(0)
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();

        let result = next.run(req);

        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        match &result {
            Ok(res) => *self.status_counts.entry(res.status).or_insert(0) += 1,
            Err(_) => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }

    fn name(&self) -> &'static str {
        "MetricsMiddleware"
    }
}
