//! # Runway
//!
//! A small request-routing core: match a method and path against registered
//! route patterns, run the request through an onion of middleware, call the
//! route handler and turn whatever it returns into a response body.
//!
//! ## Features
//!
//! - `:name` path parameters, first registered route wins
//! - Onion-style middleware with short-circuiting
//! - Route groups with scoped base paths and middleware
//! - Named services shared with every handler
//! - JSON, plain text and HTML bodies inferred from the handler's output
//! - One failure boundary: errors and panics become a 500 from the error handler
//!
//! ## Quick Start
//!
//! ```rust
//! use runway::app::Application;
//! use runway::context::Context;
//! use runway::http::Request;
//! use runway::json;
//!
//! let mut app = Application::new();
//!
//! app.get("/", |_ctx: Context| async { json!({ "message": "Hello, World!" }) })
//!     .unwrap();
//!
//! app.group("/api", |api| {
//!     api.get_view("/status", "<p>operational</p>")?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! app.run(Request::new("GET", "/api/status")).unwrap();
//! ```

pub mod app;
pub mod context;
pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub extern crate serde_json;

pub use app::{Application, Group, Outcome};
pub use context::{Args, Context, Services};
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerResult, IntoOutput, Json, Output};
pub use http::{ContentType, Method, Reply, Request, Response};
pub use middleware::{Middleware, MiddlewareResult, Next};
pub use router::{PathPattern, Route, Router};

// Reexport serde_json
pub use serde_json::{json, Value};
