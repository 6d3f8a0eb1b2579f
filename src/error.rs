//! Error taxonomy for the dispatch core.
//!
//! Errors travel through the middleware chain as [`anyhow::Error`] values so that
//! any layer can raise anything. The typed errors in this module are recovered on
//! the way out with `downcast_ref`, which is how [`crate::exception`] decides on a
//! status code and whether to report.

use std::collections::BTreeMap;
use std::fmt;

use http::Method;

/// Errors raised by the router itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No route in the method's table matches the path
    ///
    /// Conventionally rendered as `404 Not Found`.
    RouteNotFound {
        /// Request method
        method: Method,
        /// Request path (query string removed)
        path: String,
    },
    /// A URI template compiled into a regex the engine rejected
    InvalidPattern {
        /// The raw template
        pattern: String,
        /// Regex engine message
        reason: String,
    },
    /// A route opted into a middleware group that was never registered
    UnknownMiddlewareGroup(String),
    /// The controller resolver has no factory for this controller
    ControllerNotFound(String),
    /// The controller exists but does not expose this method
    UnknownControllerMethod {
        /// Controller type reference
        controller: String,
        /// Method name
        method: String,
    },
    /// A panic escaped the inward chain and was caught by an exception boundary
    HandlerPanicked(String),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::RouteNotFound { method, path } => {
                write!(f, "No route matches {} {}", method, path)
            }
            DispatchError::InvalidPattern { pattern, reason } => {
                write!(f, "Route pattern '{}' failed to compile: {}", pattern, reason)
            }
            DispatchError::UnknownMiddlewareGroup(name) => {
                write!(f, "Middleware group '{}' is not registered", name)
            }
            DispatchError::ControllerNotFound(name) => {
                write!(f, "Controller '{}' is not registered", name)
            }
            DispatchError::UnknownControllerMethod { controller, method } => {
                write!(f, "Controller '{}' has no method '{}'", controller, method)
            }
            DispatchError::HandlerPanicked(message) => {
                write!(f, "Handler panicked: {}", message)
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// Field-level validation failure raised by actions
///
/// The router gives it no special treatment; the exception handler renders it
/// as `422 Unprocessable Entity`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message for `field`, keeping earlier messages for the same field
    #[must_use]
    pub fn with(mut self, field: &str, message: &str) -> Self {
        self.add(field, message);
        self
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field → messages, ordered by field name
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
        write!(f, "The given data was invalid ({})", fields.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// An error that already knows its HTTP status
///
/// Lets an action abort with e.g. `403` without building a response itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status: u16,
    pub message: String,
}

impl HttpError {
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpError {}
