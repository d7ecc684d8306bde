use std::env;
use std::fmt;

#[derive(Eq, Hash, PartialEq, Copy, Clone, Debug)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    HEAD,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    pub fn from_string(s: &str) -> Option<Method> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "CONNECT" => Some(Method::CONNECT),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The incoming request as seen by the router: a method and a normalized path.
///
/// Methods the router does not know are kept verbatim so they simply fail to
/// match any route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    path: String,
}

impl Request {
    pub fn new(method: &str, uri: &str) -> Request {
        Request {
            method: method.trim().to_ascii_uppercase(),
            path: normalize_path(uri),
        }
    }

    /// Builds the request from CGI-style `REQUEST_METHOD` and `REQUEST_URI`.
    pub fn from_env() -> Request {
        Request::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`. Missing ones
    /// default to `GET` and `/`.
    pub(crate) fn from_lookup<F>(lookup: F) -> Request
    where
        F: Fn(&str) -> Option<String>,
    {
        let method = lookup("REQUEST_METHOD").unwrap_or_else(|| "GET".to_owned());
        let uri = lookup("REQUEST_URI").unwrap_or_else(|| "/".to_owned());
        Request::new(&method, &uri)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Strips the query string, forces a leading slash and trims trailing ones.
pub(crate) fn normalize_path(uri: &str) -> String {
    let path = uri.split(['?', '#']).next().unwrap_or("/");
    let path = path.trim().trim_end_matches('/');
    if path.is_empty() {
        "/".to_owned()
    } else if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{}", path)
    }
}
