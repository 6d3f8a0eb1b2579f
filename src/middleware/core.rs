use std::sync::Arc;

use tracing::trace;

use crate::dispatcher::{Request, Response};

/// The innermost callable of a chain: usually the route's action
pub type Target<'a> = &'a (dyn Fn(&mut Request) -> anyhow::Result<Response> + 'a);

/// A unit of cross-cutting logic wrapped around a route's action
///
/// `handle` receives the request and the continuation for the rest of the
/// chain. It may pass through (`next.run(req)`), post-process the returned
/// response, or return its own response without running `next` at all, in
/// which case nothing further inward executes.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response>;

    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Continuation for the remainder of a chain
///
/// Holds the not-yet-run middleware slice and the target. `run` consumes the
/// continuation, so each middleware can advance the chain at most once and no
/// cursor is shared between layers.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    target: Target<'a>,
}

impl<'a> Next<'a> {
    #[must_use]
    pub fn new(chain: &'a [Arc<dyn Middleware>], target: Target<'a>) -> Self {
        Self { chain, target }
    }

    /// Number of middleware still ahead of the target
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }

    /// Run the rest of the chain and return its response
    pub fn run(self, req: &mut Request) -> anyhow::Result<Response> {
        match self.chain.split_first() {
            None => (self.target)(req),
            Some((head, tail)) => {
                trace!(
                    request_id = %req.request_id,
                    middleware = head.name(),
                    remaining = tail.len(),
                    "Entering middleware"
                );
                head.handle(
                    req,
                    Next {
                        chain: tail,
                        target: self.target,
                    },
                )
            }
        }
    }
}

/// Run `chain` around `target`, outermost middleware first
///
/// An empty chain calls the target directly.
pub fn run(
    chain: &[Arc<dyn Middleware>],
    req: &mut Request,
    target: Target<'_>,
) -> anyhow::Result<Response> {
    Next::new(chain, target).run(req)
}

/// Middleware built from a closure
pub struct FnMiddleware<F> {
    f: F,
    name: &'static str,
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'n> Fn(&mut Request, Next<'n>) -> anyhow::Result<Response> + Send + Sync,
{
    fn handle(&self, req: &mut Request, next: Next<'_>) -> anyhow::Result<Response> {
        (self.f)(req, next)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Wrap a closure as middleware
///
/// # Example
///
/// ```
/// use switchboard::middleware::from_fn;
///
/// let stamp = from_fn("stamp", |req, next| {
///     let mut res = next.run(req)?;
///     res.set_header("x-stamp", "1".to_string());
///     Ok(res)
/// });
/// ```
pub fn from_fn<F>(name: &'static str, f: F) -> Arc<dyn Middleware>
where
    F: for<'n> Fn(&mut Request, Next<'n>) -> anyhow::Result<Response> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware { f, name })
}
