//! # Router Module
//!
//! Route registration, path matching and request dispatch.
//!
//! ## Architecture
//!
//! The router uses a two-phase approach:
//!
//! 1. **Registration**: during bootstrap, URI templates (e.g., `/users/{id}`) are
//!    compiled into anchored regexes and appended to a per-method table. The
//!    `&mut Route` handed back lets callers attach route middleware and opt into
//!    named middleware groups.
//!
//! 2. **Resolution**: for each request, the method's table is scanned in
//!    registration order and the first matching route wins. The route is bound
//!    onto the request (path parameters included), the middleware chain is
//!    assembled and run around the route's action.
//!
//! ## Pattern syntax
//!
//! - Literal characters match verbatim.
//! - `{identifier}` matches one or more of `[A-Za-z0-9]`.
//! - A trailing slash is optional on both the template and the request path.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use switchboard::dispatcher::{Action, Request, Response};
//! use switchboard::middleware::TracingMiddleware;
//! use switchboard::router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.set_global_middlewares(vec![Arc::new(TracingMiddleware)]);
//! router.add_middleware_group("api", vec![]);
//! router
//!     .get("/users/{id}/posts/{postId}", Action::handler(|req| {
//!         Ok(Response::json(200, serde_json::json!({
//!             "user": req.path_param("id"),
//!             "post": req.path_param("postId"),
//!         })))
//!     }))
//!     .unwrap()
//!     .group("api");
//!
//! let mut req = Request::new(Method::GET, "/users/42/posts/7");
//! let res = router.resolve(&mut req).unwrap();
//! assert_eq!(res.body["post"], "7");
//! ```
//!
//! ## Performance
//!
//! Matching is O(n) in the number of routes registered for the method. Route
//! counts are bounded by the application, not by traffic, so no trie is used.

mod core;
mod route;

pub use self::core::Router;
pub use self::route::{ParamVec, Route, RoutePattern, MAX_INLINE_PARAMS};
