/// Shared error type used across all Inkwell crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Empty or missing required input. Raised before any network call.
    #[error("validation: {0}")]
    Validation(String),

    /// Non-success HTTP status from the AI provider.
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// The provider answered 2xx but the body could not be understood.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset, TLS).
    #[error("HTTP: {0}")]
    Http(String),

    /// The downstream sink is gone. Never reported to anyone; the relay
    /// treats it as silent cancellation.
    #[error("client disconnected")]
    ClientDisconnected,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("config: {0}")]
    Config(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convenience constructor for validation failures.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// True for failures caused by the AI provider leg (status, body,
    /// timeout or connection).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Provider { .. }
                | Error::MalformedResponse(_)
                | Error::Timeout(_)
                | Error::Http(_)
        )
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
