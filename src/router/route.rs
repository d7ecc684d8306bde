use crate::context::Context;
use crate::error::ServerResult;
use crate::handler::{Handler, HandlerResult};
use crate::http::Method;
use crate::middleware::{Middleware, MiddlewareManager};
use crate::router::pattern::PathPattern;

/// A method, a compiled path pattern, a handler and the middleware around it.
#[derive(Clone)]
pub struct Route {
    methods: Vec<Method>,
    pattern: PathPattern,
    handler: Box<dyn Handler>,
    pub(crate) middlewares: MiddlewareManager,
}

impl Route {
    pub(crate) fn new(method: Method, path: &str, handler: Box<dyn Handler>) -> ServerResult<Self> {
        Ok(Self {
            methods: vec![method],
            pattern: PathPattern::compile(path)?,
            handler,
            middlewares: MiddlewareManager::new(),
        })
    }

    /// Appends a middleware that runs inside everything registered before it.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middlewares.add(middleware);
        self
    }

    pub(crate) fn with_middlewares(mut self, middlewares: &MiddlewareManager) -> Self {
        self.middlewares.append(middlewares);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn handler(&self) -> &dyn Handler {
        &*self.handler
    }

    pub fn allows(&self, method: &str) -> bool {
        Method::from_string(method).map_or(false, |method| self.methods.contains(&method))
    }

    pub async fn handle(&self, ctx: Context) -> HandlerResult {
        self.middlewares.call(ctx, self.handler.clone()).await
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.template())
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}
