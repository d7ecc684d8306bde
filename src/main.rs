//! CGI-style demo: dispatches the request described by `REQUEST_METHOD` and
//! `REQUEST_URI` and writes the reply to stdout. Logs go to stderr.

use runway::{json, Application, Context, Json, Middleware, MiddlewareResult, Next, Request, Response};
use serde::Serialize;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct Logger;

impl Middleware for Logger {
    fn call(&self, ctx: Context, next: Next) -> MiddlewareResult {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request.method().to_owned();
            let path = ctx.request.path().to_owned();
            let response = ctx.response.clone();
            let result = next.handle(ctx).await;
            tracing::info!(
                method = %method,
                path = %path,
                status = response.status(),
                elapsed_us = start.elapsed().as_micros() as u64,
                "Request handled"
            );
            result
        })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(Self)
    }
}

#[derive(Clone)]
struct RequireToken;

impl Middleware for RequireToken {
    fn call(&self, ctx: Context, next: Next) -> MiddlewareResult {
        Box::pin(async move {
            let expected = ctx.service::<String>("token")?.clone();
            match std::env::var("HTTP_AUTHORIZATION") {
                Ok(header) if header == format!("Bearer {}", expected) => next.handle(ctx).await,
                _ => {
                    ctx.response.set_status(401);
                    Ok(runway::Output::Text("Authentication required".to_owned()))
                }
            }
        })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(Self)
    }
}

#[derive(Serialize)]
struct User {
    id: String,
    name: &'static str,
}

fn build() -> runway::ServerResult<Application> {
    let mut app = Application::new();

    app.service("token", String::from("secret"))
        .middleware(Logger)
        .fallback(|| "<h1>Nothing here</h1>")
        .error(|err| json!({ "error": err.to_string() }));

    app.get_view("/", "<h1>runway</h1>")?;

    app.get("/greet/:name", |ctx: Context| async move {
        ctx.arg("name").map(|name| format!("Hello {}", name))
    })?;

    app.group("/api", |api| {
        api.middleware(RequireToken);
        api.get("/users/:id", |ctx: Context| async move {
            let id = ctx.arg("id")?.to_owned();
            Ok::<_, runway::ServerError>(Json(User { id, name: "Luke" }))
        })?;
        api.get("/status", |ctx: Context| async move {
            ctx.response.set_status(Response::OK);
            json!({ "status": "operational" })
        })?;
        Ok(())
    })?;

    Ok(app)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let app = build()?;
    app.run(Request::from_env())?;
    Ok(())
}
