use soas_core::CompileError;

/// Call-time failures of the execution engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("action {0} declares a required request body without a JSON schema")]
    UnsupportedBodyShape(String),

    #[error("action {action} expects {expected} input")]
    InputShapeMismatch {
        action: String,
        expected: &'static str,
    },

    #[error("operation failed{}: {message}", status_suffix(.status))]
    OperationFailed {
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    #[error("no server URL for action {0}")]
    MissingServer(String),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Codec(err.to_string())
    }
}

impl From<csv::Error> for EngineError {
    fn from(err: csv::Error) -> Self {
        EngineError::Codec(err.to_string())
    }
}

impl EngineError {
    /// Shortcut for a codec error
    pub fn codec<S: Into<String>>(msg: S) -> Self {
        EngineError::Codec(msg.into())
    }

    /// HTTP status carried by an operation failure
    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::OperationFailed { status, .. } => *status,
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|s| format!(" with status {}", s))
        .unwrap_or_default()
}
