//! URI template compilation and per-route configuration.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;
use tracing::warn;

use crate::dispatcher::Action;
use crate::error::DispatchError;
use crate::middleware::Middleware;
use crate::runtime_config::DEFAULT_PATTERN_SIZE_LIMIT;

/// Maximum number of path/query parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Ordered name → value pairs; names are shared with the compiled route.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// What a `{name}` token captures
const PARAM_CAPTURE: &str = "([A-Za-z0-9]+)";

#[allow(clippy::expect_used)]
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("token regex is valid")
});

/// A compiled URI template such as `/users/{id}`
///
/// Each `{identifier}` becomes a capture group matching one or more ASCII
/// alphanumerics; everything else matches literally. The matcher is anchored
/// at both ends and a trailing slash is optional on both the template and the
/// incoming path.
///
/// There is no escape for braces: a literal `{x}` segment is always a parameter.
#[derive(Clone)]
pub struct RoutePattern {
    raw: String,
    matcher: Regex,
    parameter_names: Vec<Arc<str>>,
}

impl RoutePattern {
    /// Compile a URI template
    ///
    /// # Example
    ///
    /// ```
    /// use switchboard::router::RoutePattern;
    ///
    /// let pattern = RoutePattern::compile("/users/{id}").unwrap();
    /// assert!(pattern.matches("/users/42/"));
    /// assert_eq!(&*pattern.parameter_names()[0], "id");
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, DispatchError> {
        Self::compile_with_limit(pattern, DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Compile with an explicit cap on the compiled matcher's size in bytes
    pub fn compile_with_limit(pattern: &str, size_limit: usize) -> Result<Self, DispatchError> {
        let body = pattern.strip_suffix('/').unwrap_or(pattern);

        let mut regex = String::with_capacity(body.len() + 8);
        regex.push('^');
        let mut parameter_names = Vec::with_capacity(body.matches('{').count());
        let mut cursor = 0;

        for token in TOKEN.captures_iter(body) {
            let (Some(whole), Some(name)) = (token.get(0), token.get(1)) else {
                continue;
            };
            regex.push_str(&regex::escape(&body[cursor..whole.start()]));
            regex.push_str(PARAM_CAPTURE);
            parameter_names.push(Arc::from(name.as_str()));
            cursor = whole.end();
        }
        regex.push_str(&regex::escape(&body[cursor..]));
        regex.push_str("/?$");

        let matcher = RegexBuilder::new(&regex)
            .size_limit(size_limit)
            .build()
            .map_err(|e| DispatchError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            raw: pattern.to_string(),
            matcher,
            parameter_names,
        })
    }

    /// The template as registered
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The anchored regex the template compiled to
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.matcher
    }

    #[must_use]
    pub fn parameter_names(&self) -> &[Arc<str>] {
        &self.parameter_names
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }

    /// Zip captured values against parameter names, in declaration order
    ///
    /// Callers are expected to check [`matches`](Self::matches) first; a
    /// non-matching path yields an empty list.
    #[must_use]
    pub fn extract_parameters(&self, path: &str) -> ParamVec {
        let Some(captures) = self.matcher.captures(path) else {
            warn!(
                pattern = %self.raw,
                path = %path,
                "Parameter extraction requested for a non-matching path"
            );
            return ParamVec::new();
        };
        self.parameter_names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, value)| {
                value.map(|v| (Arc::clone(name), v.as_str().to_string()))
            })
            .collect()
    }
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("raw", &self.raw)
            .field("matcher", &self.matcher.as_str())
            .field("parameter_names", &self.parameter_names)
            .finish()
    }
}

/// One compiled pattern bound to an action and its own middleware
///
/// Routes are configured during registration through the `&mut Route` the
/// router hands back; once the router is shared they are read-only.
#[derive(Clone)]
pub struct Route {
    pattern: RoutePattern,
    action: Action,
    middlewares: Vec<Arc<dyn Middleware>>,
    middleware_groups: Vec<String>,
}

impl Route {
    pub fn new(pattern: &str, action: Action) -> Result<Self, DispatchError> {
        Ok(Self::from_pattern(RoutePattern::compile(pattern)?, action))
    }

    /// Bind an already compiled template
    #[must_use]
    pub fn from_pattern(pattern: RoutePattern, action: Action) -> Self {
        Self {
            pattern,
            action,
            middlewares: Vec::new(),
            middleware_groups: Vec::new(),
        }
    }

    /// The raw URI template
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn compiled(&self) -> &RoutePattern {
        &self.pattern
    }

    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    #[must_use]
    pub fn parameter_names(&self) -> &[Arc<str>] {
        self.pattern.parameter_names()
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }

    #[must_use]
    pub fn extract_parameters(&self, path: &str) -> ParamVec {
        self.pattern.extract_parameters(path)
    }

    /// Route-specific middleware, innermost layer of the chain
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Group names this route opted into, in declaration order
    #[must_use]
    pub fn middleware_groups(&self) -> &[String] {
        &self.middleware_groups
    }

    /// Replace the route-specific middleware list
    pub fn set_middlewares(&mut self, middlewares: Vec<Arc<dyn Middleware>>) -> &mut Self {
        self.middlewares = middlewares;
        self
    }

    /// Replace the opted-in groups; repeated names keep their first position
    pub fn set_middleware_groups<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.middleware_groups.clear();
        for name in names {
            self.push_group(name.into());
        }
        self
    }

    /// Append one route-specific middleware
    pub fn middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Opt into one more group
    pub fn group(&mut self, name: &str) -> &mut Self {
        self.push_group(name.to_string());
        self
    }

    fn push_group(&mut self, name: String) {
        if !self.middleware_groups.contains(&name) {
            self.middleware_groups.push(name);
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("action", &self.action)
            .field("middlewares", &self.middlewares.len())
            .field("middleware_groups", &self.middleware_groups)
            .finish()
    }
}
