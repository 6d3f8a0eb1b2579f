//! Router core: per-method route tables, chain assembly and dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use tracing::{debug, info, warn};

use super::route::{Route, RoutePattern};
use crate::dispatcher::{Action, ControllerResolver, Request, Response};
use crate::error::DispatchError;
use crate::middleware::{self, Middleware};
use crate::runtime_config::RuntimeConfig;

/// Route tables plus the middleware registries that wrap them
///
/// Built once during application bootstrap through `&mut self` methods, then
/// shared read-only (typically behind an `Arc`) for request handling.
///
/// Matching is a linear scan of the method's table in registration order and
/// the first match wins, regardless of how specific later routes are.
///
/// # Example
///
/// ```
/// use switchboard::dispatcher::{Action, Request, Response};
/// use switchboard::router::Router;
/// use http::Method;
///
/// let mut router = Router::new();
/// router
///     .get("/users/{id}", Action::handler(|req| {
///         let id = req.path_param("id").unwrap_or_default().to_string();
///         Ok(Response::text(200, id))
///     }))
///     .unwrap();
///
/// let mut req = Request::new(Method::GET, "/users/42");
/// let res = router.resolve(&mut req).unwrap();
/// assert_eq!(res.body, serde_json::json!("42"));
/// ```
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<Method, Vec<Arc<Route>>>,
    /// Methods in the order their first route was registered
    methods: Vec<Method>,
    global_middlewares: Vec<Arc<dyn Middleware>>,
    middleware_groups: HashMap<String, Vec<Arc<dyn Middleware>>>,
    controllers: Option<Arc<dyn ControllerResolver>>,
    config: RuntimeConfig,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Compile `pattern` and append it to the method's table
    ///
    /// Returns the new route so middleware and groups can be attached fluently.
    pub fn register(
        &mut self,
        method: Method,
        pattern: &str,
        action: Action,
    ) -> Result<&mut Route, DispatchError> {
        let compiled = RoutePattern::compile_with_limit(pattern, self.config.pattern_size_limit)?;
        let route = Route::from_pattern(compiled, action);

        debug!(
            method = %method,
            pattern = %pattern,
            action = %route.action().describe(),
            params = ?route.parameter_names(),
            "Route registered"
        );

        if !self.methods.contains(&method) {
            self.methods.push(method.clone());
        }
        let table = self.routes.entry(method).or_default();
        table.push(Arc::new(route));
        let last = table.len() - 1;
        // Nothing else holds this Arc yet, so make_mut never clones here.
        Ok(Arc::make_mut(&mut table[last]))
    }

    pub fn get(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::GET, pattern, action)
    }

    pub fn post(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::POST, pattern, action)
    }

    pub fn put(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::PUT, pattern, action)
    }

    pub fn patch(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::PATCH, pattern, action)
    }

    pub fn delete(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::DELETE, pattern, action)
    }

    pub fn options(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::OPTIONS, pattern, action)
    }

    pub fn head(&mut self, pattern: &str, action: Action) -> Result<&mut Route, DispatchError> {
        self.register(Method::HEAD, pattern, action)
    }

    /// Middleware applied to every route, outermost first
    pub fn set_global_middlewares(&mut self, middlewares: Vec<Arc<dyn Middleware>>) {
        self.global_middlewares = middlewares;
    }

    /// Replace the whole group registry
    pub fn set_middleware_groups(&mut self, groups: HashMap<String, Vec<Arc<dyn Middleware>>>) {
        self.middleware_groups = groups;
    }

    /// Register or replace a single named group
    pub fn add_middleware_group(&mut self, name: &str, middlewares: Vec<Arc<dyn Middleware>>) {
        self.middleware_groups.insert(name.to_string(), middlewares);
    }

    /// Collaborator used to instantiate controllers for `Action::Controller` routes
    pub fn set_controller_resolver(&mut self, resolver: Arc<dyn ControllerResolver>) {
        self.controllers = Some(resolver);
    }

    #[must_use]
    pub fn global_middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.global_middlewares
    }

    #[must_use]
    pub fn middleware_group(&self, name: &str) -> Option<&[Arc<dyn Middleware>]> {
        self.middleware_groups.get(name).map(Vec::as_slice)
    }

    /// Routes registered for `method`, in match-priority order
    #[must_use]
    pub fn routes(&self, method: &Method) -> &[Arc<Route>] {
        self.routes.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of registered routes across all methods
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(method, pattern)` for every route, grouped by method
    #[must_use]
    pub fn route_table(&self) -> Vec<(Method, String)> {
        self.methods
            .iter()
            .flat_map(|method| {
                self.routes(method)
                    .iter()
                    .map(move |route| (method.clone(), route.pattern().to_string()))
            })
            .collect()
    }

    /// Print all registered routes to stdout
    ///
    /// Useful for debugging and verifying that routes are loaded correctly.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.len());
        for method in &self.methods {
            for route in self.routes(method) {
                println!(
                    "[route] {method} {} -> {} groups={:?} middlewares={}",
                    route.pattern(),
                    route.action().describe(),
                    route.middleware_groups(),
                    route.middlewares().len()
                );
            }
        }
    }

    /// Find the first route in the request method's table matching its path
    pub fn resolve_route(&self, req: &Request) -> Result<Arc<Route>, DispatchError> {
        debug!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            "Route match attempt"
        );

        let match_start = Instant::now();
        let found = self
            .routes(&req.method)
            .iter()
            .find(|route| route.matches(&req.path));
        let match_duration = match_start.elapsed();

        let Some(route) = found else {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                candidates = self.routes(&req.method).len(),
                duration_us = match_duration.as_micros(),
                "No route matched"
            );
            return Err(DispatchError::RouteNotFound {
                method: req.method.clone(),
                path: req.path.clone(),
            });
        };

        if match_duration > self.config.slow_match_threshold {
            warn!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                route_pattern = %route.pattern(),
                duration_us = match_duration.as_micros(),
                "Slow route matching detected"
            );
        } else {
            info!(
                request_id = %req.request_id,
                method = %req.method,
                path = %req.path,
                route_pattern = %route.pattern(),
                duration_us = match_duration.as_micros(),
                "Route matched"
            );
        }

        Ok(Arc::clone(route))
    }

    /// Assemble the chain for `route`: global, then each opted-in group in
    /// declaration order, then the route's own middleware
    pub fn middleware_for(&self, route: &Route) -> Result<Vec<Arc<dyn Middleware>>, DispatchError> {
        let mut chain = self.global_middlewares.clone();

        for name in route.middleware_groups() {
            let Some(group) = self.middleware_groups.get(name) else {
                warn!(
                    route_pattern = %route.pattern(),
                    group = %name,
                    "Route references an unregistered middleware group"
                );
                return Err(DispatchError::UnknownMiddlewareGroup(name.clone()));
            };
            chain.extend(group.iter().cloned());
        }

        chain.extend(route.middlewares().iter().cloned());
        Ok(chain)
    }

    /// Dispatch a request: match, bind, assemble, run
    ///
    /// Errors from matching, controller instantiation, middleware or the action
    /// propagate to the caller unless an exception boundary in the chain
    /// converts them into a response.
    pub fn resolve(&self, req: &mut Request) -> anyhow::Result<Response> {
        let route = self.resolve_route(req)?;
        req.bind_route(Arc::clone(&route));

        let chain = self.middleware_for(&route)?;
        debug!(
            request_id = %req.request_id,
            route_pattern = %route.pattern(),
            middleware_count = chain.len(),
            middlewares = ?chain
                .iter()
                .map(|mw| mw.name())
                .collect::<Vec<_>>(),
            "Middleware chain assembled"
        );

        match route.action() {
            Action::Handler(handler) => {
                let target = |r: &mut Request| handler(r);
                middleware::run(&chain, req, &target)
            }
            Action::Controller { controller, method } => {
                let resolver = self
                    .controllers
                    .as_ref()
                    .ok_or_else(|| DispatchError::ControllerNotFound(controller.clone()))?;
                let instance = resolver.make(controller)?;
                let target = |r: &mut Request| instance.call(method, r);
                middleware::run(&chain, req, &target)
            }
        }
    }
}
