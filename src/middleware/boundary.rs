use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, warn};

use super::{Middleware, Next};
use crate::dispatcher::{Request, Response};
use crate::error::DispatchError;
use crate::exception::ExceptionHandler;

/// Converts errors escaping the inward chain into responses
///
/// Only layers registered *after* the boundary (closer to the action) are
/// protected; anything outside it sees the rendered response, never the error.
/// Panics are caught as well and surface as [`DispatchError::HandlerPanicked`].
pub struct ExceptionBoundary {
    handler: Arc<dyn ExceptionHandler>,
    force_json: bool,
}

impl ExceptionBoundary {
    #[must_use]
    pub fn new(handler: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            handler,
            force_json: false,
        }
    }

    /// Boundary for API chains: errors are always rendered as JSON
    #[must_use]
    pub fn api(handler: Arc<dyn ExceptionHandler>) -> Self {
        Self {
            handler,
            force_json: true,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Middleware for ExceptionBoundary {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| next.run(&mut *req)));

        let err = match outcome {
            Ok(Ok(res)) => return Ok(res),
            Ok(Err(err)) => err,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    request_id = %req.request_id,
                    panic_message = %message,
                    "Panic caught by exception boundary"
                );
                DispatchError::HandlerPanicked(message).into()
            }
        };

        warn!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            error = %err,
            "Exception boundary intercepted error"
        );

        if self.handler.should_report(&err) {
            self.handler.report(&err);
        }

        if !self.force_json {
            return Ok(self.handler.render(req, &err));
        }

        // Render against a copy; outer layers must still see the client's Accept
        let mut view = req.clone();
        view.set_header("accept", "application/json".to_string());
        let mut res = self.handler.render(&view, &err);
        res.set_header("content-type", "application/json".to_string());
        Ok(res)
    }

    fn name(&self) -> &'static str {
        if self.force_json {
            "ExceptionBoundary(api)"
        } else {
            "ExceptionBoundary"
        }
    }
}
