//! The per-request context handed to middleware and handlers.
//!
//! A fresh [`Context`] is built for every dispatch. Path arguments and the
//! scratch `data` map therefore never leak from one request into the next,
//! while the service registry is shared read-only behind an `Arc`.

use crate::error::{ServerError, ServerResult};
use crate::http::{Request, Response};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Named services registered on the application.
#[derive(Default, Clone)]
pub struct Services {
    data: Arc<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Services {
    pub fn new() -> Self {
        Self {
            data: Arc::new(HashMap::new()),
        }
    }

    pub(crate) fn insert<T: Send + Sync + 'static>(&mut self, name: &str, value: T) {
        Arc::make_mut(&mut self.data).insert(name.to_owned(), Arc::new(value));
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.data.get(name).and_then(|boxed| boxed.downcast_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.data.keys()).finish()
    }
}

/// Path arguments captured by the matched route, in declaration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Args {
    values: Vec<(String, String)>,
}

impl Args {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub(crate) fn from_pairs(values: Vec<(String, String)>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Positional access, counting placeholders from the left.
    pub fn nth(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name.to_owned(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    pub request: Request,
    pub response: Response,
    pub args: Args,
    pub services: Services,
    pub data: HashMap<String, Value>,
}

impl Context {
    pub fn new(request: Request, response: Response, services: Services) -> Self {
        Self {
            request,
            response,
            args: Args::new(),
            services,
            data: HashMap::new(),
        }
    }

    /// Looks up a path argument, failing the request when it is absent.
    pub fn arg(&self, name: &str) -> ServerResult<&str> {
        self.args
            .get(name)
            .ok_or_else(|| ServerError::MissingArg(name.to_owned()))
    }

    pub fn service<T: 'static>(&self, name: &str) -> ServerResult<&T> {
        self.services
            .get(name)
            .ok_or_else(|| ServerError::MissingService(name.to_owned()))
    }

    pub fn get_data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set_data<T>(&mut self, key: &str, value: T)
    where
        T: serde::Serialize,
    {
        if let Ok(value) = serde_json::to_value(value) {
            self.data.insert(key.to_string(), value);
        }
    }

    pub fn get_typed_data<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.data
            .get(key)
            .and_then(|value| serde_json::from_value(value.to_owned()).ok())
    }
}
