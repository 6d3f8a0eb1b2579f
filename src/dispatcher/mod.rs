//! # Dispatcher Module
//!
//! Value objects and action plumbing shared by the router and the middleware chain:
//!
//! - [`Request`] / [`Response`] / [`PreparedResponse`]: what flows in and out of the
//!   chain. The request owns a per-request attribute bag and, once matched, the
//!   bound [`crate::router::Route`].
//! - [`Action`]: a route's innermost target, either a plain function or a
//!   controller reference.
//! - [`Controller`] / [`ControllerResolver`] / [`ControllerRegistry`]: the
//!   instantiation contract used for controller references.

mod action;
mod core;

pub use self::action::{Action, Controller, ControllerRegistry, ControllerResolver, HandlerFn};
pub use self::core::{HeaderVec, PreparedResponse, Request, Response, MAX_INLINE_HEADERS};
