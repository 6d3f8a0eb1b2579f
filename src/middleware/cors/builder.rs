use std::sync::Arc;

use http::Method;
use regex::Regex;

use super::{CorsConfigError, CorsMiddleware, OriginValidation};

/// Builder for [`CorsMiddleware`]
///
/// Defaults: no origins, `Content-Type` and `Authorization` headers,
/// GET/POST/PUT/PATCH/DELETE/OPTIONS, no credentials, no preflight caching.
///
/// ```
/// use switchboard::middleware::CorsMiddlewareBuilder;
///
/// let cors = CorsMiddlewareBuilder::new()
///     .allowed_origins(&["https://example.com"])
///     .allow_credentials(true)
///     .max_age(600)
///     .build()
///     .unwrap();
/// ```
pub struct CorsMiddlewareBuilder {
    allowed_origins: Vec<String>,
    origin_patterns: Vec<String>,
    origin_validator: Option<Arc<dyn Fn(&str) -> bool + Send + Sync>>,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddlewareBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_origins: vec![],
            origin_patterns: vec![],
            origin_validator: None,
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allow_credentials: false,
            expose_headers: vec![],
            max_age: None,
        }
    }

    /// Exact origins; `"*"` allows any origin
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.allowed_origins = origins.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Regex patterns matched against the `Origin` header
    #[must_use]
    pub fn origin_patterns(mut self, patterns: &[&str]) -> Self {
        self.origin_patterns = patterns.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Custom predicate deciding whether an origin is allowed
    #[must_use]
    pub fn origin_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.origin_validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn allowed_methods(mut self, methods: &[Method]) -> Self {
        self.allowed_methods = methods.to_vec();
        self
    }

    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.expose_headers = headers.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Validate the configuration and build the middleware
    ///
    /// A custom validator takes precedence over patterns, which take
    /// precedence over exact origins.
    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        let wildcard = self.allowed_origins.iter().any(|o| o == "*");

        let origin_validation = if let Some(validator) = self.origin_validator {
            OriginValidation::Custom(validator)
        } else if !self.origin_patterns.is_empty() {
            let patterns = self
                .origin_patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| CorsConfigError::InvalidOriginPattern {
                        pattern: p.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            OriginValidation::Regex(patterns)
        } else if wildcard {
            OriginValidation::Wildcard
        } else {
            if let Some(bad) = self
                .allowed_origins
                .iter()
                .find(|o| !is_valid_origin(o))
            {
                return Err(CorsConfigError::InvalidOriginFormat {
                    origin: bad.clone(),
                });
            }
            OriginValidation::Exact(self.allowed_origins)
        };

        if self.allow_credentials {
            if origin_validation.is_wildcard() {
                return Err(CorsConfigError::WildcardWithCredentials);
            }
            if matches!(&origin_validation, OriginValidation::Exact(list) if list.is_empty()) {
                return Err(CorsConfigError::EmptyOriginsWithCredentials);
            }
        }

        Ok(CorsMiddleware {
            origin_validation,
            allowed_headers: self.allowed_headers,
            allowed_methods: self.allowed_methods,
            allow_credentials: self.allow_credentials,
            expose_headers: self.expose_headers,
            max_age: self.max_age,
        })
    }
}

impl Default for CorsMiddlewareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_origin(origin: &str) -> bool {
    match origin.split_once("://") {
        Some((scheme, host)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                && !host.is_empty()
                && !host.contains('/')
        }
        None => false,
    }
}
