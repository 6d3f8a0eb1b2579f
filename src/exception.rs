//! # Exception Handling
//!
//! The contract consumed by [`crate::middleware::ExceptionBoundary`] and
//! [`crate::kernel::Kernel`] to turn errors escaping the chain into responses,
//! plus a default implementation.
//!
//! ## Status mapping (default handler)
//!
//! | Error | Status | Reported |
//! |---|---|---|
//! | [`DispatchError::RouteNotFound`] | 404 | no |
//! | [`ValidationError`] | 422 | no |
//! | [`HttpError`] | its own status | only when ≥ 500 |
//! | anything else | 500 | yes |
//!
//! JSON bodies are rendered when the request [`wants_json`](Request::wants_json),
//! HTML otherwise.

use serde_json::{json, Value};
use tracing::error;

use crate::dispatcher::{Request, Response};
use crate::error::{DispatchError, HttpError, ValidationError};
use crate::runtime_config::RuntimeConfig;

/// Decides what happens to an error that escaped downstream execution
pub trait ExceptionHandler: Send + Sync {
    /// Whether `report` should be called for this error
    fn should_report(&self, err: &anyhow::Error) -> bool;

    /// Record the error (log, alert, ...)
    fn report(&self, err: &anyhow::Error);

    /// Build the response sent in place of the failed one
    fn render(&self, req: &Request, err: &anyhow::Error) -> Response;
}

/// Logging, status-mapping exception handler
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionHandler {
    /// Include the error chain in rendered bodies
    pub debug: bool,
}

impl DefaultExceptionHandler {
    #[must_use]
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(config.debug)
    }

    /// HTTP status for an error
    #[must_use]
    pub fn status_for(err: &anyhow::Error) -> u16 {
        if let Some(dispatch) = err.downcast_ref::<DispatchError>() {
            return match dispatch {
                DispatchError::RouteNotFound { .. } => 404,
                _ => 500,
            };
        }
        if err.downcast_ref::<ValidationError>().is_some() {
            return 422;
        }
        if let Some(http) = err.downcast_ref::<HttpError>() {
            return http.status;
        }
        500
    }

    fn public_message(&self, err: &anyhow::Error, status: u16) -> String {
        if self.debug {
            return format!("{:#}", err);
        }
        if let Some(http) = err.downcast_ref::<HttpError>() {
            return http.message.clone();
        }
        match status {
            404 => "Not Found".to_string(),
            422 => "The given data was invalid.".to_string(),
            _ => "Server Error".to_string(),
        }
    }

    fn render_json(&self, err: &anyhow::Error, status: u16) -> Response {
        let mut body = json!({ "message": self.public_message(err, status) });
        if let Some(validation) = err.downcast_ref::<ValidationError>() {
            body["errors"] = json!(validation.errors());
        }
        if self.debug {
            let chain: Vec<Value> = err.chain().map(|cause| json!(cause.to_string())).collect();
            body["trace"] = Value::Array(chain);
        }
        Response::json(status, body)
    }

    fn render_html(&self, err: &anyhow::Error, status: u16) -> Response {
        let title = http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Error");
        let mut page = format!(
            "<!doctype html><html><head><title>{status} {title}</title></head><body><h1>{status} {title}</h1><p>{}</p>",
            escape_html(&self.public_message(err, status))
        );
        if let Some(validation) = err.downcast_ref::<ValidationError>() {
            page.push_str("<ul>");
            for (field, messages) in validation.errors() {
                for message in messages {
                    page.push_str(&format!(
                        "<li>{}: {}</li>",
                        escape_html(field),
                        escape_html(message)
                    ));
                }
            }
            page.push_str("</ul>");
        }
        page.push_str("</body></html>");
        Response::html(status, page)
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn should_report(&self, err: &anyhow::Error) -> bool {
        Self::status_for(err) >= 500
    }

    fn report(&self, err: &anyhow::Error) {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        error!(
            error = %err,
            causes = ?causes,
            status = Self::status_for(err),
            "Unhandled error escaped the middleware chain"
        );
    }

    fn render(&self, req: &Request, err: &anyhow::Error) -> Response {
        let status = Self::status_for(err);
        if req.wants_json() {
            self.render_json(err, status)
        } else {
            self.render_html(err, status)
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
