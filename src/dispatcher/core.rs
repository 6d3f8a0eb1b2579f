//! Request and response value objects flowing through the middleware chain.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value;
use smallvec::SmallVec;

use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::{ParamVec, Route};

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage
///
/// Header names use `Arc<str>`; lookups are case-insensitive.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn replace_header(headers: &mut HeaderVec, name: &str, value: String) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    headers.push((Arc::from(name), value));
}

/// An incoming request as handed over by the HTTP adapter
///
/// Besides the wire data it carries a per-request attribute bag that
/// middleware use to pass data inward (authenticated principal, traces), and
/// the [`Route`] the router bound it to.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation id, reused from `x-request-id` when the header parses
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    /// Decoded query pairs in wire order
    pub query_params: ParamVec,
    /// Path parameters, filled in when a route is bound
    pub path_params: ParamVec,
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    attributes: HashMap<String, Value>,
    route: Option<Arc<Route>>,
}

impl Request {
    /// Build a request from a method and a raw request target (`/path?query`)
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            query_params: query.map(parse_query).unwrap_or_default(),
            path_params: ParamVec::new(),
            headers: HeaderVec::new(),
            body: None,
            attributes: HashMap::new(),
            route: None,
        }
    }

    /// Add a header; `x-request-id` also re-seeds the correlation id
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case(REQUEST_ID_HEADER) {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        replace_header(&mut self.headers, name, value);
    }

    /// Get a query parameter by name (last write wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics: for `/org/{id}/user/{id}` this returns
    /// the user id.
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// The route this request was dispatched to, once matched
    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    pub(crate) fn bind_route(&mut self, route: Arc<Route>) {
        self.path_params = route.extract_parameters(&self.path);
        self.route = Some(route);
    }

    /// Whether the client asked for (or sent) JSON
    #[must_use]
    pub fn wants_json(&self) -> bool {
        let accepts_json = self
            .get_header("accept")
            .is_some_and(|accept| accept.contains("json"));
        let sent_json = self
            .get_header("content-type")
            .is_some_and(|ct| ct.contains("json"));
        accepts_json || sent_json
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Append `value` to the array stored under `key`
    ///
    /// A missing key starts a new array; a non-array value is wrapped into one.
    pub fn push_attribute(&mut self, key: &str, value: impl Into<Value>) {
        let slot = self
            .attributes
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            let previous = slot.take();
            *slot = Value::Array(vec![previous]);
        }
        if let Value::Array(items) = slot {
            items.push(value.into());
        }
    }
}

fn parse_query(query: &str) -> ParamVec {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (Arc::from(decode_component(key).as_str()), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// Response produced by an action or a middleware
///
/// Mutable while it travels back out through the chain; [`Response::prepare`]
/// turns it into the immutable form the adapter writes to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    pub headers: HeaderVec,
    /// `Value::String` bodies are written verbatim, `Null` as empty, anything else as JSON
    pub body: Value,
}

impl Response {
    /// Empty-bodied response with the given status
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }

    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::new(status)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(Value::String(body.into()))
    }

    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status)
            .with_header("content-type", "text/html; charset=utf-8")
            .with_body(Value::String(body.into()))
    }

    /// JSON error envelope: `{"error": message}`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        replace_header(&mut self.headers, name, value);
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    /// Terminal step: serialize the body and freeze the response
    ///
    /// Fills in `content-type` when missing and always sets `content-length`.
    /// Responses to `HEAD` keep their length header but lose the body.
    #[must_use]
    pub fn prepare(mut self, req: &Request) -> PreparedResponse {
        let (bytes, default_type) = match &self.body {
            Value::Null => (Vec::new(), None),
            Value::String(s) => (s.clone().into_bytes(), Some("text/plain; charset=utf-8")),
            other => (other.to_string().into_bytes(), Some("application/json")),
        };
        if let Some(content_type) = default_type {
            if self.get_header("content-type").is_none() {
                self.set_header("content-type", content_type.to_string());
            }
        }
        self.set_header("content-length", bytes.len().to_string());

        let body = if req.method == Method::HEAD {
            Vec::new()
        } else {
            bytes
        };

        PreparedResponse {
            status: self.status,
            headers: self.headers,
            body,
        }
    }
}

/// A finished response ready for the wire; no further mutation is possible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedResponse {
    status: u16,
    headers: HeaderVec,
    body: Vec<u8>,
}

impl PreparedResponse {
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase, or an empty string for unknown codes
    #[must_use]
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text (lossy)
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
