use axum::http::StatusCode;
use thiserror::Error;

pub type WebResult<T> = Result<T, Error>;

/// Error vocabulary handlers and middleware return up the chain.
///
/// Errors propagate as ordinary results; the dispatcher is the single layer
/// that decides the client-visible representation and whether to escalate.
#[derive(Debug, Error)]
pub enum Error {
    /// Client-visible failure carrying its status and a safe message,
    /// written verbatim as the error body.
    #[error("{message}")]
    Request { status: StatusCode, message: String },
    /// Broken framework invariant. The dispatcher signals graceful process
    /// shutdown when it observes this, instead of continuing to serve on
    /// corrupted assumptions.
    #[error("integrity failure: {0}")]
    Shutdown(String),
    /// Anything else. Logged in full server-side, answered with a generic
    /// 500 so internal detail never reaches the client.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Request {
            status,
            message: message.into(),
        }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(anyhow::anyhow!(message.into()))
    }

    /// Status the translation layer will answer with. Outer middleware uses
    /// this to observe the outcome of an error still traveling up the chain.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Request { status, .. } => *status,
            Error::Shutdown(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<common_auth::AuthError> for Error {
    fn from(value: common_auth::AuthError) -> Self {
        Self::Internal(value.into())
    }
}
