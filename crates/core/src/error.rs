use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Tagged result returned by every session and ledger operation.
pub type Outcome<T> = std::result::Result<T, CoreError>;

/// Infrastructure failures: configuration, HTTP client construction and the
/// credential file.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid setting: {0}")]
    Setting(String),
}

/// Expected failure of a session or ledger operation.
///
/// `Display` is the bare message so it can be shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Login or registration rejected by the server.
    #[error("{0}")]
    InvalidCredentials(String),
    /// 401 on an authenticated call; the session has already been dropped.
    #[error("{0}")]
    AuthorizationExpired(String),
    /// Rejected locally, no request was sent.
    #[error("{0}")]
    Validation(String),
    /// Connection, timeout or decoding failure.
    #[error("{0}")]
    Network(String),
    /// Any other non-success response.
    #[error("{0}")]
    Server(String),
}

impl CoreError {
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidCredentials(message)
            | Self::AuthorizationExpired(message)
            | Self::Validation(message)
            | Self::Network(message)
            | Self::Server(message) => message,
        }
    }

    pub(crate) fn validation(message: &str) -> Self {
        Self::Validation(message.to_string())
    }

    /// Classification used by the login and registration endpoints, where a
    /// rejected request means the submitted credentials are wrong.
    pub(crate) fn from_auth(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized(message)
            | ClientError::Forbidden(message)
            | ClientError::Validation(message) => Self::InvalidCredentials(message),
            other => other.into(),
        }
    }
}

impl From<ClientError> for CoreError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::Unauthorized(message) => Self::AuthorizationExpired(message),
            ClientError::Transport(err) => Self::Network(err.to_string()),
            ClientError::Forbidden(message)
            | ClientError::NotFound(message)
            | ClientError::Conflict(message)
            | ClientError::Validation(message)
            | ClientError::Server(message) => Self::Server(message),
        }
    }
}
