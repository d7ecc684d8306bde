use crate::error::ServerResult;
use crate::handler::Output;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

lazy_static! {
    // Best-effort markup sniffing: anything that looks like an opening or closing tag.
    static ref MARKUP: Option<Regex> = Regex::new(r"</?[a-z][\s\S]*>").ok();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Json,
    Text,
    Html,
}

impl ContentType {
    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::Text => "text/plain; charset=utf-8",
            ContentType::Html => "text/html; charset=utf-8",
        }
    }
}

/// Per-request response handle.
///
/// Clones share the same status, so middleware and handlers holding a copy of
/// the context all write to the one response.
#[derive(Debug, Clone)]
pub struct Response {
    status: Arc<AtomicU16>,
}

impl Response {
    pub const OK: u16 = 200;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;

    pub fn new() -> Response {
        Response {
            status: Arc::new(AtomicU16::new(Self::OK)),
        }
    }

    pub fn set_status(&self, status: u16) -> &Self {
        self.status.store(status, Ordering::Relaxed);
        self
    }

    pub fn status(&self) -> u16 {
        self.status.load(Ordering::Relaxed)
    }

    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> ServerResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    pub fn text<T: AsRef<str>>(&self, content: T) -> String {
        content.as_ref().to_owned()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns a handler's output into a body and, when it can tell, a content type.
///
/// Never fails: if serialization or the markup test cannot run, the raw value
/// is passed through with no content type.
pub fn coerce(output: Output, response: &Response) -> (String, Option<ContentType>) {
    match output {
        Output::Data(value) => match response.json(&value) {
            Ok(body) => (body, Some(ContentType::Json)),
            Err(_) => (value.to_string(), None),
        },
        Output::Text(text) => match &*MARKUP {
            Some(markup) if markup.is_match(&text) => (text, Some(ContentType::Html)),
            Some(_) => (response.text(text), Some(ContentType::Text)),
            None => (text, None),
        },
        Output::Raw(body) => (body, None),
    }
}

/// A fully dispatched response, ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub content_type: Option<ContentType>,
}

impl Reply {
    /// Writes the reply in CGI form: status and content type headers, then the body.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "Status: {} {}\r\n", self.status, reason_phrase(self.status))?;
        if let Some(content_type) = self.content_type {
            write!(out, "Content-Type: {}\r\n", content_type.mime())?;
        }
        write!(out, "\r\n{}", self.body)?;
        out.flush()
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
