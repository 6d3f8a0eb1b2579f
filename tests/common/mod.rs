#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use switchboard::dispatcher::{Request, Response};
use switchboard::middleware::{from_fn, Middleware};

/// Attribute middleware append their labels to on the way in
pub const ORDER_ATTRIBUTE: &str = "middleware_order";

/// Installs a thread-local fmt subscriber writing through the test harness
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

/// Shared log of what ran, in order
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }
}

/// Middleware that records `label:before` / `label:after`, pushes its label
/// onto the order attribute and appends itself to an `x-trail` response header
pub fn labelled(label: &'static str, recorder: &Recorder) -> Arc<dyn Middleware> {
    let recorder = recorder.clone();
    from_fn(label, move |req, next| {
        recorder.push(format!("{label}:before"));
        req.push_attribute(ORDER_ATTRIBUTE, label);
        let mut res = next.run(req)?;
        let trail = match res.get_header("x-trail") {
            Some(existing) => format!("{existing},{label}"),
            None => label.to_string(),
        };
        res.set_header("x-trail", trail);
        recorder.push(format!("{label}:after"));
        Ok(res)
    })
}

/// Middleware that answers with `status` and never runs the rest of the chain
pub fn short_circuit(label: &'static str, status: u16, recorder: &Recorder) -> Arc<dyn Middleware> {
    let recorder = recorder.clone();
    from_fn(label, move |_req, _next| {
        recorder.push(format!("{label}:stopped"));
        Ok(Response::text(status, label))
    })
}

/// Handler body echoing the order attribute back as JSON
pub fn echo_order(req: &mut Request) -> anyhow::Result<Response> {
    let order = req
        .attribute(ORDER_ATTRIBUTE)
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    Ok(Response::json(200, serde_json::json!({ "order": order })))
}
