//! Client-wide error types.

use nitro_core::ValidationError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Non-2xx response or `success: false` envelope from the backend.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Your session has expired, please log in again")]
    Unauthorized,

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("No backend user is associated with this session")]
    NoBackendUser,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} timed out after {1}s")]
    Timeout(String, u64),

    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    /// The backend already holds an equivalent pending request.
    pub fn is_already_pending(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                let message = message.to_ascii_lowercase();
                *status == 409
                    || message.contains("already applied")
                    || message.contains("already pending")
                    || message.contains("already requested")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Why the identity provider refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureKind {
    InvalidCredentials,
    EmailNotConfirmed,
    RateLimited,
    /// A local signup cooldown is still running.
    CoolingDown,
    PendingApproval,
    Rejected,
    Network,
    Provider,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub kind: AuthFailureKind,
    /// HTTP status, `0` when the request never reached the provider.
    pub status: u16,
    pub message: String,
    /// Seconds to wait before retrying, when the provider said so.
    pub retry_after: Option<u64>,
}

impl AuthFailure {
    pub fn new(kind: AuthFailureKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, secs: Option<u64>) -> Self {
        self.retry_after = secs;
        self
    }
}

/// Pull a human-readable reason out of an error body, trying `fields` in
/// order. Nested `{"error": {"message": ..}}` objects are followed.
pub fn extract_message(body: &Value, fields: &[&str]) -> Option<String> {
    for field in fields {
        match body.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(nested @ Value::Object(_)) => {
                if let Some(found) = extract_message(nested, fields) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}
