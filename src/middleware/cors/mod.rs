mod builder;
mod error;

pub use builder::CorsMiddlewareBuilder;
pub use error::CorsConfigError;

use std::sync::Arc;

use http::Method;
use regex::Regex;
use tracing::{debug, warn};

use crate::dispatcher::{Request, Response};
use crate::middleware::{Middleware, Next};

/// Origin validation strategy
#[derive(Clone)]
pub enum OriginValidation {
    /// Exact string matching
    Exact(Vec<String>),
    /// Wildcard (allow all origins)
    Wildcard,
    /// Regex pattern matching
    Regex(Vec<Regex>),
    /// Custom validation function
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl std::fmt::Debug for OriginValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginValidation::Exact(origins) => f.debug_tuple("Exact").field(origins).finish(),
            OriginValidation::Wildcard => write!(f, "Wildcard"),
            OriginValidation::Regex(patterns) => f
                .debug_tuple("Regex")
                .field(&patterns.iter().map(|re| re.as_str()).collect::<Vec<_>>())
                .finish(),
            OriginValidation::Custom(_) => write!(f, "Custom(<function>)"),
        }
    }
}

impl OriginValidation {
    fn is_allowed(&self, origin: &str) -> bool {
        match self {
            OriginValidation::Exact(origins) => origins.iter().any(|o| o == origin),
            OriginValidation::Wildcard => true,
            OriginValidation::Regex(patterns) => patterns.iter().any(|re| re.is_match(origin)),
            OriginValidation::Custom(validator) => validator(origin),
        }
    }

    fn is_wildcard(&self) -> bool {
        matches!(self, OriginValidation::Wildcard)
    }
}

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// Usually registered globally so it runs before group and route concerns.
///
/// - Requests without an `Origin` header pass through untouched.
/// - Disallowed origins are refused with `403` before anything inward runs.
/// - Preflight `OPTIONS` requests (with `Access-Control-Request-Method`) are
///   answered with `204` directly; the route's action never runs. Middleware
///   only runs once a route is bound, so the path needs an `OPTIONS` route for
///   this to happen. Without one the lookup fails with `RouteNotFound` first.
/// - Other cross-origin responses are decorated on the way out.
///
/// Build it with [`CorsMiddlewareBuilder`].
#[derive(Debug)]
pub struct CorsMiddleware {
    origin_validation: OriginValidation,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddleware {
    #[must_use]
    pub fn builder() -> CorsMiddlewareBuilder {
        CorsMiddlewareBuilder::new()
    }

    /// Value for `Access-Control-Allow-Origin`
    fn allow_origin_value(&self, origin: &str) -> String {
        if self.origin_validation.is_wildcard() && !self.allow_credentials {
            "*".to_string()
        } else {
            origin.to_string()
        }
    }

    fn forbidden(origin: &str) -> Response {
        Response::json(
            403,
            serde_json::json!({ "error": "Origin not allowed", "origin": origin }),
        )
    }

    fn preflight(&self, req: &Request, origin: &str) -> Response {
        let requested = req
            .get_header("access-control-request-method")
            .and_then(|m| Method::from_bytes(m.trim().as_bytes()).ok());
        let method_allowed = requested
            .as_ref()
            .is_some_and(|m| self.allowed_methods.contains(m));
        if !method_allowed {
            debug!(
                origin = %origin,
                requested_method = ?requested,
                "CORS preflight for disallowed method"
            );
            return Self::forbidden(origin);
        }

        let methods: Vec<&str> = self.allowed_methods.iter().map(Method::as_str).collect();
        let mut res = Response::new(204)
            .with_header("access-control-allow-origin", &self.allow_origin_value(origin))
            .with_header("access-control-allow-methods", &methods.join(", "))
            .with_header("access-control-allow-headers", &self.allowed_headers.join(", "))
            .with_header("vary", "Origin");
        if self.allow_credentials {
            res.set_header("access-control-allow-credentials", "true".to_string());
        }
        if let Some(max_age) = self.max_age {
            res.set_header("access-control-max-age", max_age.to_string());
        }
        res
    }

    fn decorate(&self, res: &mut Response, origin: &str) {
        res.set_header(
            "access-control-allow-origin",
            self.allow_origin_value(origin),
        );
        res.set_header("vary", "Origin".to_string());
        if self.allow_credentials {
            res.set_header("access-control-allow-credentials", "true".to_string());
        }
        if !self.expose_headers.is_empty() {
            res.set_header(
                "access-control-expose-headers",
                self.expose_headers.join(", "),
            );
        }
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        let Some(origin) = req.get_header("origin").map(str::to_string) else {
            return next.run(req);
        };

        if !self.origin_validation.is_allowed(&origin) {
            warn!(
                request_id = %req.request_id,
                origin = %origin,
                path = %req.path,
                "CORS origin rejected"
            );
            return Ok(Self::forbidden(&origin));
        }

        let is_preflight = req.method == Method::OPTIONS
            && req.get_header("access-control-request-method").is_some();
        if is_preflight {
            return Ok(self.preflight(req, &origin));
        }

        let mut res = next.run(req)?;
        self.decorate(&mut res, &origin);
        Ok(res)
    }

    fn name(&self) -> &'static str {
        "CorsMiddleware"
    }
}
