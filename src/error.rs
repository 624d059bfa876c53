use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Authentication required to merge the guest cart")]
    AuthenticationRequired,

    #[error("Unexpected response format while {0}")]
    UnexpectedResponse(&'static str),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::Api { status, .. } => Some(*status),
            AppError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
