//! Route actions and controller instantiation.
//!
//! An action is either a plain function or a `(controller, method)` reference.
//! Controller references are resolved per request through a
//! [`ControllerResolver`], which hands back a freshly constructed instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::{Request, Response};
use crate::error::DispatchError;

/// Signature of a directly callable action
pub type HandlerFn = dyn Fn(&mut Request) -> anyhow::Result<Response> + Send + Sync;

/// What a route runs once every middleware has passed the request inward
#[derive(Clone)]
pub enum Action {
    /// A closure or function invoked directly
    Handler(Arc<HandlerFn>),
    /// A controller type reference plus the method to call on a fresh instance
    Controller { controller: String, method: String },
}

impl Action {
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(&mut Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        Action::Handler(Arc::new(f))
    }

    #[must_use]
    pub fn controller(controller: &str, method: &str) -> Self {
        Action::Controller {
            controller: controller.to_string(),
            method: method.to_string(),
        }
    }

    /// Short label for logs: `closure` or `Controller@method`
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Action::Handler(_) => "closure".to_string(),
            Action::Controller { controller, method } => format!("{}@{}", controller, method),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Handler(_) => write!(f, "Handler(<function>)"),
            Action::Controller { controller, method } => f
                .debug_struct("Controller")
                .field("controller", controller)
                .field("method", method)
                .finish(),
        }
    }
}

/// A controller instance built for one request
///
/// Implementations match on `method` and return
/// [`DispatchError::UnknownControllerMethod`] for names they do not expose.
pub trait Controller: Send {
    fn call(&self, method: &str, req: &mut Request) -> anyhow::Result<Response>;
}

/// Builds controller instances with their dependencies satisfied
pub trait ControllerResolver: Send + Sync {
    fn make(&self, controller: &str) -> anyhow::Result<Box<dyn Controller>>;
}

type ControllerFactory = dyn Fn() -> anyhow::Result<Box<dyn Controller>> + Send + Sync;

/// Factory-map [`ControllerResolver`]
///
/// Each registered factory is invoked once per dispatched request, so
/// controllers never share state across requests.
#[derive(Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, Box<ControllerFactory>>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an infallible factory under `name`, replacing any previous one
    pub fn register<C, F>(&mut self, name: &str, factory: F)
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        self.factories.insert(
            name.to_string(),
            Box::new(move || Ok(Box::new(factory()) as Box<dyn Controller>)),
        );
    }

    /// Register a factory whose construction may fail
    pub fn register_fallible<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Box<dyn Controller>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}

impl ControllerResolver for ControllerRegistry {
    fn make(&self, controller: &str) -> anyhow::Result<Box<dyn Controller>> {
        let factory = self
            .factories
            .get(controller)
            .ok_or_else(|| DispatchError::ControllerNotFound(controller.to_string()))?;
        debug!(controller = %controller, "Instantiating controller");
        factory()
    }
}
