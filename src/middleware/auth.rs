use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{Middleware, Next};
use crate::dispatcher::{Request, Response};

/// Attribute key under which the authenticated principal is stored
pub const PRINCIPAL_ATTRIBUTE: &str = "principal";

type TokenValidator = dyn Fn(&str) -> Option<Value> + Send + Sync;

/// Bearer-token gate
///
/// Extracts `Authorization: Bearer <token>` and asks the validator for the
/// principal behind it. Unknown or missing tokens end the request with a `401`
/// before any inward middleware or the action runs; known tokens store the
/// principal in the request's `principal` attribute.
pub struct AuthMiddleware {
    validator: Arc<TokenValidator>,
}

impl AuthMiddleware {
    pub fn new<F>(validator: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            validator: Arc::new(validator),
        }
    }

    /// Accept exactly one token, mapped to a fixed principal
    #[must_use]
    pub fn static_token(token: &str, principal: Value) -> Self {
        let expected = token.to_string();
        Self::new(move |candidate| (candidate == expected).then(|| principal.clone()))
    }

    fn unauthorized() -> Response {
        Response::error(401, "Unauthorized").with_header("www-authenticate", "Bearer")
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    let header = req.get_header("authorization")?;
    let (scheme, token) = header.trim().split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}

impl Middleware for AuthMiddleware {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        let principal = bearer_token(req).and_then(|token| (self.validator)(token));

        match principal {
            Some(principal) => {
                debug!(request_id = %req.request_id, "Request authenticated");
                req.set_attribute(PRINCIPAL_ATTRIBUTE, principal);
                next.run(req)
            }
            None => {
                warn!(
                    request_id = %req.request_id,
                    path = %req.path,
                    has_authorization = req.get_header("authorization").is_some(),
                    "Authentication failed"
                );
                Ok(Self::unauthorized())
            }
        }
    }

    fn name(&self) -> &'static str {
        "AuthMiddleware"
    }
}
