//! # Kernel
//!
//! The outermost request entry point an HTTP adapter talks to.
//!
//! [`Kernel::handle`] dispatches through the current [`Router`] and guarantees a
//! response: errors that escape the chain (a missing route, an unknown
//! middleware group, or a failure with no exception boundary registered) are
//! reported and rendered by the kernel's own [`ExceptionHandler`]. The result is
//! finalized with [`Response::prepare`](crate::dispatcher::Response::prepare).
//!
//! The router sits behind an [`ArcSwap`], so [`Kernel::reload`] can publish a
//! rebuilt route table while requests are in flight. Requests already being
//! handled finish against the router they started with.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{error, info};

use crate::dispatcher::{PreparedResponse, Request};
use crate::exception::{DefaultExceptionHandler, ExceptionHandler};
use crate::router::Router;

pub struct Kernel {
    router: ArcSwap<Router>,
    exceptions: Arc<dyn ExceptionHandler>,
}

impl Kernel {
    #[must_use]
    pub fn new(router: Router, exceptions: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            router: ArcSwap::from_pointee(router),
            exceptions,
        }
    }

    /// Kernel rendering escaped errors with [`DefaultExceptionHandler`],
    /// debug output following the router's runtime config
    #[must_use]
    pub fn with_default_handler(router: Router) -> Self {
        let handler = DefaultExceptionHandler::from_config(router.config());
        Self::new(router, Arc::new(handler))
    }

    /// Dispatch one request and always produce a wire-ready response
    pub fn handle(&self, mut req: Request) -> PreparedResponse {
        let router = self.router.load_full();

        let res = match router.resolve(&mut req) {
            Ok(res) => res,
            Err(err) => {
                if self.exceptions.should_report(&err) {
                    self.exceptions.report(&err);
                }
                error!(
                    request_id = %req.request_id,
                    method = %req.method,
                    path = %req.path,
                    error = %err,
                    "Unhandled dispatch error"
                );
                self.exceptions.render(&req, &err)
            }
        };

        res.prepare(&req)
    }

    /// Swap in a new router; subsequent requests use it
    pub fn reload(&self, router: Router) {
        let routes = router.len();
        self.router.store(Arc::new(router));
        info!(routes, "Router reloaded");
    }

    /// Snapshot of the router currently serving requests
    #[must_use]
    pub fn router(&self) -> Arc<Router> {
        self.router.load_full()
    }
}
