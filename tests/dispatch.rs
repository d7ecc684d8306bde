//! End-to-end dispatch tests: registration, matching, middleware, coercion
//! and the failure boundary.

use runway::{
    json, Application, ContentType, Context, Json, Method, Middleware, MiddlewareResult, Next,
    Output, Request, Response, ServerError,
};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn get(path: &str) -> Request {
    Request::new("GET", path)
}

#[derive(Clone)]
struct Marker(&'static str);

impl Middleware for Marker {
    fn call(&self, mut ctx: Context, next: Next) -> MiddlewareResult {
        let name = self.0;
        Box::pin(async move {
            let mut trail = ctx.get_typed_data::<Vec<String>>("trail").unwrap_or_default();
            trail.push(name.to_owned());
            ctx.set_data("trail", trail);
            next.handle(ctx).await
        })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(self.clone())
    }
}

async fn show_trail(ctx: Context) -> String {
    ctx.get_typed_data::<Vec<String>>("trail")
        .unwrap_or_default()
        .join(",")
}

#[tokio::test]
async fn test_greet_end_to_end() {
    let mut app = Application::new();
    app.get("/greet/:name", |ctx: Context| async move {
        ctx.arg("name").map(|name| format!("Hello {}", name))
    })
    .unwrap();

    let reply = app.handle(get("/greet/Luke")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "Hello Luke");
    assert_eq!(reply.content_type, Some(ContentType::Text));
}

#[tokio::test]
async fn test_static_routes_only_match_their_path() {
    let mut app = Application::new();
    app.get_view("/about", "about").unwrap();
    app.get_view("/contact", "contact").unwrap();

    assert_eq!(app.handle(get("/about")).await.body, "about");
    assert_eq!(app.handle(get("/contact")).await.body, "contact");
    assert_eq!(app.handle(get("/about/team")).await.status, 404);
    assert_eq!(app.handle(Request::new("POST", "/about")).await.status, 404);
}

#[tokio::test]
async fn test_args_by_name_in_declaration_order() {
    let mut app = Application::new();
    app.get("/users/:user/posts/:post", |ctx: Context| async move {
        let names: Vec<String> = ctx.args.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        names.join("&")
    })
    .unwrap();

    let reply = app.handle(get("/users/7/posts/42")).await;
    assert_eq!(reply.body, "user=7&post=42");
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let mut app = Application::new();
    app.get("/users/:id", |_ctx: Context| async { "by id" }).unwrap();
    app.get("/users/me", |_ctx: Context| async { "me" }).unwrap();

    assert_eq!(app.handle(get("/users/me")).await.body, "by id");
}

#[tokio::test]
async fn test_middleware_runs_in_registration_order() {
    let mut app = Application::new();
    app.get("/trail", show_trail)
        .unwrap()
        .middleware(Marker("m1"))
        .middleware(Marker("m2"));

    assert_eq!(app.handle(get("/trail")).await.body, "m1,m2");
}

#[tokio::test]
async fn test_short_circuit_stops_the_chain() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();

    let mut app = Application::new();
    app.get("/secret", move |_ctx: Context| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            "secret"
        }
    })
    .unwrap()
    .middleware(|ctx: Context, _next: Next| async move {
        ctx.response.set_status(401);
        "denied"
    })
    .middleware(Marker("inner"));

    let reply = app.handle(get("/secret")).await;
    assert_eq!(reply.status, 401);
    assert_eq!(reply.body, "denied");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_group_scopes_base_path_and_middleware() {
    let mut app = Application::new();
    app.middleware(Marker("app"));
    app.group("/api", |api| {
        api.middleware(Marker("api"));
        api.get("/users", show_trail)?.middleware(Marker("route"));
        api.group("/v1", |v1| {
            v1.get("/items", show_trail)?;
            Ok(())
        })?;
        Ok(())
    })
    .unwrap();
    app.get("/outside", show_trail).unwrap();

    assert_eq!(app.handle(get("/api/users")).await.body, "app,api,route");
    assert_eq!(app.handle(get("/api/v1/items")).await.body, "app,api");
    assert_eq!(app.handle(get("/outside")).await.body, "app");
    assert_eq!(app.handle(get("/api/outside")).await.status, 404);
}

#[tokio::test]
async fn test_group_root_path() {
    let mut app = Application::new();
    app.group("/admin", |admin| {
        admin.get_view("/", "dashboard")?;
        Ok(())
    })
    .unwrap();
    app.get_view("/", "home").unwrap();

    assert_eq!(app.handle(get("/admin")).await.body, "dashboard");
    assert_eq!(app.handle(get("/admin/")).await.body, "dashboard");
    assert_eq!(app.handle(get("/")).await.body, "home");
}

#[tokio::test]
async fn test_failed_group_leaves_scope_untouched() {
    let mut app = Application::new();
    let result = app.group("/broken", |group| {
        group.middleware(Marker("broken"));
        group.get("/ok", show_trail)?;
        group.group("/inner", |inner| {
            inner.get("/ok", show_trail)?;
            Ok(())
        })?;
        group.get("/:", show_trail)?;
        Ok(())
    });
    assert!(matches!(result, Err(ServerError::Pattern { .. })));
    assert!(app.router().is_empty());
    assert_eq!(app.handle(get("/broken/ok")).await.status, 404);
    assert_eq!(app.handle(get("/broken/inner/ok")).await.status, 404);

    app.get("/after", show_trail).unwrap();
    let reply = app.handle(get("/after")).await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "");
}

#[tokio::test]
async fn test_panicking_group_leaves_scope_untouched() {
    let mut app = Application::new();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = app.group("/boom", |group| {
            group.middleware(Marker("boom"));
            panic!("registrar exploded");
        });
    }));
    assert!(result.is_err());

    app.get("/after", show_trail).unwrap();
    assert_eq!(app.handle(get("/after")).await.body, "");
}

#[tokio::test]
async fn test_no_match_uses_fallback() {
    let mut app = Application::new();
    assert_eq!(app.handle(get("/missing")).await.body, "Page Not Found.");

    app.fallback(|| json!({ "error": "not found" }));
    let reply = app.handle(get("/missing")).await;
    assert_eq!(reply.status, Response::NOT_FOUND);
    assert_eq!(reply.body, r#"{"error":"not found"}"#);
    assert_eq!(reply.content_type, Some(ContentType::Json));
}

#[tokio::test]
async fn test_handler_error_goes_to_error_handler() {
    let mut app = Application::new();
    app.get("/fail", |_ctx: Context| async { Err::<String, _>(ServerError::handler("db down")) })
        .unwrap();

    let reply = app.handle(get("/fail")).await;
    assert_eq!(reply.status, Response::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.body, "Something bad just happened: db down");

    app.error(|err: &ServerError| format!("<p>{}</p>", err));
    let reply = app.handle(get("/fail")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "<p>db down</p>");
    assert_eq!(reply.content_type, Some(ContentType::Html));
}

#[tokio::test]
async fn test_panics_are_contained() {
    let mut app = Application::new();
    app.get("/panic", |_ctx: Context| async {
        if true {
            panic!("handler exploded");
        }
        "unreachable"
    })
    .unwrap();
    app.error(|err: &ServerError| match err {
        ServerError::Panic(msg) => format!("panic: {}", msg),
        other => other.to_string(),
    });

    let reply = app.handle(get("/panic")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "panic: handler exploded");
}

#[tokio::test]
async fn test_middleware_error_and_failing_fallback() {
    let mut app = Application::new();
    app.get_view("/guarded", "ok")
        .unwrap()
        .middleware(|_ctx: Context, _next: Next| async {
            Err::<Output, _>(ServerError::handler("rejected"))
        });
    app.fallback(|| Err::<String, _>(ServerError::handler("no fallback")));

    let reply = app.handle(get("/guarded")).await;
    assert_eq!((reply.status, reply.body.as_str()), (500, "Something bad just happened: rejected"));

    let reply = app.handle(get("/elsewhere")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Something bad just happened: no fallback");
}

#[tokio::test]
async fn test_broken_error_handler_degrades_to_default() {
    let mut app = Application::new();
    app.get("/fail", |_ctx: Context| async { Err::<String, _>(ServerError::handler("first")) })
        .unwrap();
    app.error(|_err: &ServerError| -> String { panic!("error handler exploded") });

    let reply = app.handle(get("/fail")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Something bad just happened: first");
}

#[tokio::test]
async fn test_failing_error_handler_degrades_to_default() {
    let mut app = Application::new();
    app.get("/fail", |_ctx: Context| async { Err::<String, _>(ServerError::handler("first")) })
        .unwrap();
    app.error(|_err: &ServerError| Err::<String, _>(ServerError::handler("also broken")));

    let reply = app.handle(get("/fail")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Something bad just happened: first");
}

#[derive(Serialize)]
struct Item {
    id: u32,
    tags: Vec<&'static str>,
}

#[tokio::test]
async fn test_response_coercion() {
    let mut app = Application::new();
    app.get("/map", |_ctx: Context| async { json!({"a": 1}) }).unwrap();
    app.get("/item", |_ctx: Context| async { Json(Item { id: 3, tags: vec!["x"] }) })
        .unwrap();
    app.get_view("/text", "hello").unwrap();
    app.get_view("/html", "<p>hi</p>").unwrap();
    app.get("/raw", |_ctx: Context| async { Output::Raw("{\"pre\":true}".to_owned()) })
        .unwrap();

    let reply = app.handle(get("/map")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), (r#"{"a":1}"#, Some(ContentType::Json)));

    let reply = app.handle(get("/item")).await;
    assert_eq!(reply.body, r#"{"id":3,"tags":["x"]}"#);

    let reply = app.handle(get("/text")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), ("hello", Some(ContentType::Text)));

    let reply = app.handle(get("/html")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), ("<p>hi</p>", Some(ContentType::Html)));

    let reply = app.handle(get("/raw")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), ("{\"pre\":true}", None));
}

#[tokio::test]
async fn test_scalar_values_are_sent_as_text() {
    let mut app = Application::new();
    app.get("/number", |_ctx: Context| async { json!(5) }).unwrap();
    app.get("/null", |_ctx: Context| async { json!(null) }).unwrap();

    let reply = app.handle(get("/number")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), ("5", Some(ContentType::Text)));

    let reply = app.handle(get("/null")).await;
    assert_eq!((reply.body.as_str(), reply.content_type), ("", Some(ContentType::Text)));
}

#[tokio::test]
async fn test_services_are_shared_with_handlers() {
    let mut app = Application::new();
    app.service("greeting", String::from("Howdy"));
    app.get("/hi/:name", |ctx: Context| async move {
        let greeting = ctx.service::<String>("greeting")?;
        let name = ctx.arg("name")?;
        Ok::<_, ServerError>(format!("{} {}", greeting, name))
    })
    .unwrap();
    app.get("/db", |ctx: Context| async move {
        ctx.service::<u32>("db").map(|pool| pool.to_string())
    })
    .unwrap();

    assert_eq!(app.handle(get("/hi/Leia")).await.body, "Howdy Leia");

    let reply = app.handle(get("/db")).await;
    assert_eq!(reply.status, 500);
    assert_eq!(reply.body, "Something bad just happened: missing service: db");
}

#[tokio::test]
async fn test_args_do_not_leak_between_requests() {
    let mut app = Application::new();
    app.get("/users/:id", |ctx: Context| async move { ctx.args.len().to_string() })
        .unwrap();
    app.get("/plain", |ctx: Context| async move {
        format!("{}:{}", ctx.args.len(), ctx.get_data("trail").is_none())
    })
    .unwrap()
    .middleware(Marker("x"));

    assert_eq!(app.handle(get("/users/1")).await.body, "1");
    assert_eq!(app.handle(get("/plain")).await.body, "0:false");
    assert_eq!(app.handle(get("/users/2")).await.body, "1");
}

#[tokio::test]
async fn test_query_and_trailing_slash_are_ignored() {
    let mut app = Application::new();
    app.map(Method::PUT, "/items/:id", |ctx: Context| async move {
        ctx.arg("id").map(str::to_owned)
    })
    .unwrap();

    let reply = app.handle(Request::new("put", "/items/9/?force=true")).await;
    assert_eq!(reply.body, "9");
}

#[test]
fn test_run_writes_cgi_reply() {
    let mut app = Application::new();
    app.post_view("/submit", "<b>saved</b>").unwrap();

    let mut out = Vec::new();
    app.run_with(Request::new("POST", "/submit"), &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Status: 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<b>saved</b>"
    );

    let mut out = Vec::new();
    app.run_with(Request::new("GET", "/submit"), &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().starts_with("Status: 404 Not Found\r\n"));
}
