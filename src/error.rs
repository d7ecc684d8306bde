use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid route pattern `{template}`: {reason}")]
    Pattern { template: String, reason: String },
    #[error("{0}")]
    Handler(String),
    #[error("missing path argument: {0}")]
    MissingArg(String),
    #[error("missing service: {0}")]
    MissingService(String),
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("panic: {0}")]
    Panic(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ServerError {
    pub fn handler(message: impl Into<String>) -> Self {
        ServerError::Handler(message.into())
    }

    pub(crate) fn pattern(template: &str, reason: impl Into<String>) -> Self {
        ServerError::Pattern {
            template: template.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
