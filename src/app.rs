//! Application is the main entry point for runway.
//!
//! It owns the route table, the service registry and the fallback and error
//! handlers, and it is the single place where dispatch failures are contained.
//!
//! # Examples
//!
//! ```rust
//! use runway::app::Application;
//! use runway::context::Context;
//! use runway::http::Request;
//!
//! let mut app = Application::new();
//! app.get("/greet/:name", |ctx: Context| async move {
//!     ctx.arg("name").map(|name| format!("Hello {}", name))
//! })
//! .unwrap();
//!
//! app.run(Request::new("GET", "/greet/Luke")).unwrap();
//! ```

use crate::context::{Context, Services};
use crate::error::{ServerError, ServerResult};
use crate::handler::{Handler, HandlerResult, IntoOutput, Output};
use crate::http::{coerce, Method, Reply, Request, Response};
use crate::middleware::{Middleware, MiddlewareManager};
use crate::router::{Route, Router};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type FallbackHandler = Arc<dyn Fn() -> HandlerResult + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&ServerError) -> HandlerResult + Send + Sync>;

/// How a single dispatch ended.
#[derive(Debug)]
pub enum Outcome {
    /// A route matched and its chain produced an output.
    Matched(Output),
    /// No route matched; carries the fallback handler's output.
    NotFound(Output),
    /// Matching, a middleware, the handler or the fallback failed.
    Failed(ServerError),
}

/// Base path and middleware inherited by routes registered in one scope.
#[derive(Clone, Default)]
struct Scope {
    base: String,
    middlewares: MiddlewareManager,
}

impl Scope {
    fn nested(&self, base: &str) -> Scope {
        Scope {
            base: join(&self.base, base),
            middlewares: self.middlewares.clone(),
        }
    }
}

fn join(base: &str, path: &str) -> String {
    let path = path.trim().trim_end_matches('/');
    if path.is_empty() {
        base.to_owned()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

fn register<'r>(
    router: &'r mut Router,
    scope: &Scope,
    method: Method,
    path: &str,
    handler: Box<dyn Handler>,
) -> ServerResult<&'r mut Route> {
    let route = Route::new(method, &join(&scope.base, path), handler)?;
    Ok(router.push(route.with_middlewares(&scope.middlewares)))
}

/// The main application struct: registration on one side, dispatch on the other.
#[derive(Clone)]
pub struct Application {
    router: Router,
    scope: Scope,
    services: Services,
    fallback: FallbackHandler,
    error: ErrorHandler,
}

impl Application {
    /// Creates a new Application with the default fallback and error handlers
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            scope: Scope::default(),
            services: Services::new(),
            fallback: Arc::new(default_fallback),
            error: Arc::new(default_error_handler),
        }
    }

    /// Registers a named service, visible to every handler through the context.
    pub fn service<T>(&mut self, name: &str, value: T) -> &mut Self
    where
        T: Send + Sync + 'static,
    {
        self.services.insert(name, value);
        self
    }

    /// Replaces the handler used when no route matches.
    pub fn fallback<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoOutput,
    {
        self.fallback = Arc::new(move || handler().into_output());
        self
    }

    /// Replaces the handler that turns a failed dispatch into a body.
    pub fn error<F, R>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&ServerError) -> R + Send + Sync + 'static,
        R: IntoOutput,
    {
        self.error = Arc::new(move |err: &ServerError| handler(err).into_output());
        self
    }

    /// Adds a middleware to every route registered after this call.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.scope.middlewares.add(middleware);
        self
    }

    /// Registers a GET route handler
    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        self.map(Method::GET, path, handler)
    }

    /// Registers a POST route handler
    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        self.map(Method::POST, path, handler)
    }

    /// Registers a route under the current base path.
    ///
    /// The returned route already carries the middleware active in this scope;
    /// middleware added to it afterwards runs inside those.
    pub fn map<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        register(&mut self.router, &self.scope, method, path, Box::new(handler))
    }

    /// Registers a route that always answers with the same body.
    pub fn view(&mut self, method: Method, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        register(&mut self.router, &self.scope, method, path, constant(view.into()))
    }

    pub fn get_view(&mut self, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        self.view(Method::GET, path, view)
    }

    pub fn post_view(&mut self, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        self.view(Method::POST, path, view)
    }

    /// Registers routes under `base`.
    ///
    /// The registrar gets its own [`Group`] with the extended base path and a
    /// copy of the active middleware. Nothing it does leaks back into this
    /// scope, whether it returns normally, fails or panics. If it fails, the
    /// routes it registered are dropped again.
    pub fn group<F>(&mut self, base: &str, registrar: F) -> ServerResult<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> ServerResult<()>,
    {
        let mark = self.router.len();
        let mut group = Group {
            router: &mut self.router,
            scope: self.scope.nested(base),
        };
        if let Err(err) = registrar(&mut group) {
            self.router.truncate(mark);
            return Err(err);
        }
        Ok(self)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Dispatches one request and coerces the result into a [`Reply`].
    ///
    /// Never fails: every error and panic raised while matching or running the
    /// chain ends up in the error handler with a 500 status.
    pub async fn handle(&self, request: Request) -> Reply {
        let response = Response::new();
        let ctx = Context::new(request, response.clone(), self.services.clone());

        let outcome = AssertUnwindSafe(self.dispatch(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Outcome::Failed(ServerError::Panic(panic_message(panic))));

        let output = match outcome {
            Outcome::Matched(output) => output,
            Outcome::NotFound(output) => {
                response.set_status(Response::NOT_FOUND);
                output
            }
            Outcome::Failed(err) => {
                tracing::error!(error = %err, "Request failed");
                response.set_status(Response::INTERNAL_SERVER_ERROR);
                self.recover(&err)
            }
        };

        let (body, content_type) = coerce(output, &response);
        Reply {
            status: response.status(),
            body,
            content_type,
        }
    }

    /// Matches the request and runs the route chain or the fallback.
    ///
    /// Panics are not caught here; [`Application::handle`] does that.
    pub async fn dispatch(&self, mut ctx: Context) -> Outcome {
        let method = ctx.request.method().to_owned();
        let path = ctx.request.path().to_owned();

        match self.router.find(&method, &path) {
            Some((route, args)) => {
                tracing::debug!(method = %method, path = %path, route = %route.pattern(), "Route matched");
                ctx.args = args;
                match route.handle(ctx).await {
                    Ok(output) => Outcome::Matched(output),
                    Err(err) => Outcome::Failed(err),
                }
            }
            None => {
                tracing::warn!(method = %method, path = %path, "No route matched");
                match (self.fallback)() {
                    Ok(output) => Outcome::NotFound(output),
                    Err(err) => Outcome::Failed(err),
                }
            }
        }
    }

    /// Runs one dispatch cycle and writes the reply to stdout.
    ///
    /// Starts its own current-thread runtime and panics if called from inside
    /// another tokio runtime. Async callers should await
    /// [`Application::handle`] and write the [`Reply`] themselves.
    pub fn run(&self, request: Request) -> ServerResult<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with(request, &mut out)
    }

    pub fn run_with<W: Write>(&self, request: Request, out: &mut W) -> ServerResult<()> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let reply = runtime.block_on(self.handle(request));
        reply.write_to(out)?;
        Ok(())
    }

    fn recover(&self, err: &ServerError) -> Output {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.error)(err))) {
            Ok(Ok(output)) => output,
            Ok(Err(handler_err)) => {
                tracing::error!(error = %handler_err, "Error handler failed");
                default_error(err)
            }
            Err(panic) => {
                tracing::error!(panic = %panic_message(panic), "Error handler panicked");
                default_error(err)
            }
        }
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

/// A registration scope handed to [`Application::group`] callbacks.
pub struct Group<'a> {
    router: &'a mut Router,
    scope: Scope,
}

impl<'a> Group<'a> {
    /// The accumulated base path of this group.
    pub fn base(&self) -> &str {
        &self.scope.base
    }

    /// Adds a middleware to routes registered later in this group.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.scope.middlewares.add(middleware);
        self
    }

    pub fn get<F, Fut>(&mut self, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        self.map(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(&mut self, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        self.map(Method::POST, path, handler)
    }

    pub fn map<F, Fut>(&mut self, method: Method, path: &str, handler: F) -> ServerResult<&mut Route>
    where
        F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoOutput,
    {
        register(&mut *self.router, &self.scope, method, path, Box::new(handler))
    }

    pub fn view(&mut self, method: Method, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        register(&mut *self.router, &self.scope, method, path, constant(view.into()))
    }

    pub fn get_view(&mut self, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        self.view(Method::GET, path, view)
    }

    pub fn post_view(&mut self, path: &str, view: impl Into<String>) -> ServerResult<&mut Route> {
        self.view(Method::POST, path, view)
    }

    pub fn group<F>(&mut self, base: &str, registrar: F) -> ServerResult<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> ServerResult<()>,
    {
        let mark = self.router.len();
        let mut nested = Group {
            router: &mut *self.router,
            scope: self.scope.nested(base),
        };
        if let Err(err) = registrar(&mut nested) {
            self.router.truncate(mark);
            return Err(err);
        }
        Ok(self)
    }
}

fn constant(view: String) -> Box<dyn Handler> {
    Box::new(move |_ctx: Context| {
        let view = view.clone();
        async move { view }
    })
}

fn default_fallback() -> HandlerResult {
    Ok(Output::Text("Page Not Found.".to_owned()))
}

fn default_error_handler(err: &ServerError) -> HandlerResult {
    Ok(default_error(err))
}

fn default_error(err: &ServerError) -> Output {
    Output::Text(format!("Something bad just happened: {}", err))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "Unknown panic".to_string()
    }
}
