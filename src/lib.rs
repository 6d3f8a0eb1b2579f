//! # Switchboard
//!
//! **Switchboard** is the request-dispatch core of a web application: it maps an incoming
//! request to a registered route, wraps the route's action in layered middleware, and
//! turns failures into responses.
//!
//! ## Overview
//!
//! Switchboard is transport-agnostic. An HTTP adapter builds a [`dispatcher::Request`],
//! hands it to a [`kernel::Kernel`] (or directly to a [`router::Router`]) and writes the
//! resulting [`dispatcher::PreparedResponse`] back to the socket.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`router`]** - URI template compilation, per-method route tables, chain assembly
//! - **[`dispatcher`]** - Request/response value objects and route actions (closures or
//!   controller references resolved through a [`dispatcher::ControllerResolver`])
//! - **[`middleware`]** - The continuation-passing [`middleware::Middleware`] contract plus
//!   built-ins (exception boundary, CORS, bearer auth, tracing, metrics)
//! - **[`exception`]** - The [`exception::ExceptionHandler`] contract and a default
//!   status-mapping implementation
//! - **[`kernel`]** - Outermost entry point with hot-swappable router
//! - **[`error`]** - Typed errors recognised by the exception handler
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven configuration
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Adapter as HTTP Adapter
//!     participant Kernel
//!     participant Router
//!     participant Global as Global MW
//!     participant Group as Group MW
//!     participant RouteMW as Route MW
//!     participant Action
//!
//!     Adapter->>Kernel: handle(Request)
//!     Kernel->>Router: resolve(&mut Request)
//!     Router->>Router: resolve_route (first match wins)
//!     Router->>Router: bind route + path params
//!     Router->>Router: middleware_for(route)
//!     Router->>Global: handle(req, next)
//!     Global->>Group: next.run(req)
//!     Group->>RouteMW: next.run(req)
//!     RouteMW->>Action: next.run(req)
//!     Action-->>RouteMW: Response
//!     RouteMW-->>Group: Response
//!     Group-->>Global: Response
//!     Global-->>Router: Response
//!     Router-->>Kernel: Result<Response>
//!     Kernel->>Kernel: render escaped errors
//!     Kernel-->>Adapter: PreparedResponse
//! ```
//!
//! Any middleware may return without calling `next.run`, in which case nothing further
//! inward executes. An [`middleware::ExceptionBoundary`] converts errors raised inward of
//! its position into responses; layers outward of it see only the response.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use http::Method;
//! use switchboard::dispatcher::{Action, Request, Response};
//! use switchboard::exception::DefaultExceptionHandler;
//! use switchboard::kernel::Kernel;
//! use switchboard::middleware::{ExceptionBoundary, TracingMiddleware};
//! use switchboard::router::Router;
//!
//! let handler = Arc::new(DefaultExceptionHandler::new(false));
//!
//! let mut router = Router::new();
//! router.set_global_middlewares(vec![Arc::new(TracingMiddleware)]);
//! router.add_middleware_group("api", vec![Arc::new(ExceptionBoundary::api(handler.clone()))]);
//! router
//!     .get("/pets/{id}", Action::handler(|req| {
//!         Ok(Response::json(200, serde_json::json!({ "id": req.path_param("id") })))
//!     }))
//!     .unwrap()
//!     .group("api");
//!
//! let kernel = Kernel::new(router, handler);
//! let res = kernel.handle(Request::new(Method::GET, "/pets/12"));
//! assert_eq!(res.status(), 200);
//! assert_eq!(res.body_text(), r#"{"id":"12"}"#);
//! ```
//!
//! ## Configuration
//!
//! | Variable | Default | Effect |
//! |---|---|---|
//! | `SWITCHBOARD_DEBUG` | `false` | Include error chains in rendered error bodies |
//! | `SWITCHBOARD_SLOW_MATCH_US` | `1000` | Route-match duration that triggers a WARN |
//! | `SWITCHBOARD_PATTERN_SIZE_LIMIT` | `10485760` | Compiled size cap per route template |
//! | `SWITCHBOARD_LOG_LEVEL` | `info` | Log filter directives |
//! | `SWITCHBOARD_LOG_FORMAT` | `json` | `json` or `pretty` |
//! | `SWITCHBOARD_LOG_ASYNC` | `false` | Non-blocking log writer |

pub mod dispatcher;
pub mod error;
pub mod exception;
pub mod ids;
pub mod kernel;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;

pub use dispatcher::{Action, PreparedResponse, Request, Response};
pub use error::{DispatchError, HttpError, ValidationError};
pub use exception::{DefaultExceptionHandler, ExceptionHandler};
pub use ids::RequestId;
pub use kernel::Kernel;
pub use middleware::{Middleware, Next};
pub use router::{Route, Router};
pub use runtime_config::RuntimeConfig;
