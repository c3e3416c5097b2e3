//! Compile-time errors raised while turning a description into a catalog

use thiserror::Error;

pub type CoreResult<T> = Result<T, CompileError>;

/// A malformed description. Any of these aborts catalog construction.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("description has no `paths` object")]
    MissingPaths,

    #[error("operation {method} {path} has no `responses` object")]
    MissingResponses { path: String, method: String },

    #[error("malformed {location}: {message}")]
    Malformed { location: String, message: String },

    #[error("reference not found: {0}")]
    UnresolvedReference(String),

    #[error("nested reference not supported: {0}")]
    NestedReference(String),

    #[error("invalid location '{location}' for parameter '{name}'")]
    InvalidParameterLocation { name: String, location: String },

    #[error("array schema without `items` at {0}")]
    MissingItems(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CompileError {
    fn from(err: serde_json::Error) -> Self {
        CompileError::Parse(err.to_string())
    }
}

impl CompileError {
    /// Shortcut for a malformed section of the description
    pub fn malformed<L: Into<String>, M: Into<String>>(location: L, message: M) -> Self {
        CompileError::Malformed {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Shortcut for a parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        CompileError::Parse(msg.into())
    }
}
