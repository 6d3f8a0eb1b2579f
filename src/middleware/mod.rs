//! # Middleware Module
//!
//! The middleware capability, its continuation-passing runner, and the
//! built-in layers.
//!
//! A chain for one request is assembled by the router as
//! `global ++ groups (in route declaration order) ++ route-specific` and run
//! outermost first. Work done after `next.run(req)` returns unwinds in reverse
//! order:
//!
//! ```text
//!   G.before → M.before → R.before → action → R.after → M.after → G.after
//! ```
//!
//! Built-in layers:
//!
//! - [`ExceptionBoundary`] - converts inward errors and panics into responses
//! - [`CorsMiddleware`] - origin checks, preflight handling, response headers
//! - [`AuthMiddleware`] - bearer-token gate storing the principal
//! - [`TracingMiddleware`] - request span and completion log
//! - [`MetricsMiddleware`] - counters and latency

mod auth;
mod boundary;
mod core;
mod cors;
mod metrics;
mod tracing;

pub use self::auth::{AuthMiddleware, PRINCIPAL_ATTRIBUTE};
pub use self::boundary::ExceptionBoundary;
pub use self::core::{from_fn, run, FnMiddleware, Middleware, Next, Target};
pub use self::cors::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder, OriginValidation};
pub use self::metrics::MetricsMiddleware;
pub use self::tracing::TracingMiddleware;
