use crate::context::Context;
use crate::error::{ServerError, ServerResult};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

pub type HandlerResult = ServerResult<Output>;

/// What a handler or middleware produced, before it is turned into a body.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Structured data, serialized as JSON.
    Data(Value),
    /// A string; sent as HTML when it looks like markup, plain text otherwise.
    Text(String),
    /// An already serialized body, sent untouched.
    Raw(String),
}

/// Wraps any serializable value so it is sent as JSON.
pub struct Json<T>(pub T);

pub trait IntoOutput {
    fn into_output(self) -> HandlerResult;
}

impl IntoOutput for Output {
    fn into_output(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoOutput for String {
    fn into_output(self) -> HandlerResult {
        Ok(Output::Text(self))
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> HandlerResult {
        Ok(Output::Text(self.to_owned()))
    }
}

impl IntoOutput for Value {
    fn into_output(self) -> HandlerResult {
        // Only mappings and sequences are structured; scalars take their string form.
        let text = match self {
            value @ (Value::Array(_) | Value::Object(_)) => return Ok(Output::Data(value)),
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(true) => "1".to_owned(),
            Value::Bool(false) | Value::Null => String::new(),
        };
        Ok(Output::Text(text))
    }
}

impl<T: Serialize> IntoOutput for Json<T> {
    fn into_output(self) -> HandlerResult {
        Ok(Output::Data(serde_json::to_value(self.0)?))
    }
}

impl<T: IntoOutput> IntoOutput for Result<T, ServerError> {
    fn into_output(self) -> HandlerResult {
        self.and_then(IntoOutput::into_output)
    }
}

/// The terminal step of a route: takes the request context, yields an output.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: Context) -> BoxFuture<'static, HandlerResult>;

    fn dyn_clone<'s>(&self) -> Box<dyn Handler + 's>
    where
        Self: 's;
}

impl Clone for Box<dyn Handler> {
    fn clone(&self) -> Box<dyn Handler> {
        self.dyn_clone()
    }
}

impl<F, Fut> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoOutput,
{
    fn handle(&self, ctx: Context) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into_output() })
    }

    fn dyn_clone<'s>(&self) -> Box<dyn Handler + 's>
    where
        Self: 's,
    {
        Box::new((*self).clone())
    }
}
