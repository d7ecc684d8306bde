//! Onion-style middleware.
//!
//! A middleware receives the context and a [`Next`] handle. Awaiting
//! `next.handle(ctx)` runs the rest of the chain; returning without calling it
//! short-circuits, and whatever the middleware returns becomes the result.
//! There is no timeout: a middleware that never resolves stalls its request.

use crate::context::Context;
use crate::handler::{Handler, HandlerResult, IntoOutput};
use futures::future::BoxFuture;
use std::future::Future;

#[derive(Clone)]
pub struct Next {
    handler: Box<dyn Handler>,
}

impl Next {
    pub(crate) fn new_handler(handler: Box<dyn Handler>) -> Self {
        Self { handler }
    }

    pub async fn handle(&self, ctx: Context) -> HandlerResult {
        self.handler.handle(ctx).await
    }
}

pub type MiddlewareResult = BoxFuture<'static, HandlerResult>;

pub trait Middleware: Send + Sync + 'static {
    fn call(&self, ctx: Context, next: Next) -> MiddlewareResult;
    fn clone_box(&self) -> Box<dyn Middleware>;
}

impl Clone for Box<dyn Middleware> {
    fn clone(&self) -> Box<dyn Middleware> {
        self.clone_box()
    }
}

impl<F, Fut> Middleware for F
where
    F: Fn(Context, Next) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutput,
{
    fn call(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let fut = (self)(ctx, next);
        Box::pin(async move { fut.await.into_output() })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(self.clone())
    }
}

/// An ordered middleware list; the first entry is the outermost layer.
#[derive(Clone, Default)]
pub(crate) struct MiddlewareManager {
    pub(crate) middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub fn append(&mut self, other: &MiddlewareManager) -> &mut Self {
        self.middlewares.extend(other.middlewares.iter().cloned());
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Wraps `terminal` in every middleware, innermost last.
    pub fn compose(&self, terminal: Box<dyn Handler>) -> Next {
        let mut next = Next::new_handler(terminal);
        let mut index = self.middlewares.len();
        while index > 0 {
            index -= 1;
            let middleware = self.middlewares[index].clone();
            next = Next::new_handler(Box::new(move |ctx: Context| middleware.call(ctx, next.clone())));
        }
        next
    }

    pub async fn call(&self, ctx: Context, terminal: Box<dyn Handler>) -> HandlerResult {
        self.compose(terminal).handle(ctx).await
    }
}
