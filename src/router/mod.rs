mod pattern;
mod route;

pub use pattern::PathPattern;
pub use route::Route;

use crate::context::Args;

/// The ordered route table.
///
/// Lookup is a linear scan in registration order and the first route whose
/// pattern and method both match wins, so earlier routes take priority.
#[derive(Clone, Debug, Default)]
pub struct Router {
    pub(crate) routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub(crate) fn push(&mut self, route: Route) -> &mut Route {
        tracing::debug!(methods = ?route.methods(), pattern = %route.pattern(), "Route registered");
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    pub fn find(&self, method: &str, path: &str) -> Option<(&Route, Args)> {
        self.routes.iter().find_map(|route| {
            if !route.allows(method) {
                return None;
            }
            let values = route.pattern().captures(path)?;
            let pairs = route
                .pattern()
                .names()
                .iter()
                .cloned()
                .zip(values.into_iter().map(decode))
                .collect();
            Some((route, Args::from_pairs(pairs)))
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.routes.truncate(len);
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn decode(value: String) -> String {
    match urlencoding::decode(&value) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => value,
    }
}
