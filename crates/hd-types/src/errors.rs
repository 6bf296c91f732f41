//! Error types and conversions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque failure reported by the backend command gateway.
///
/// The backend owns the real OAuth mechanics; when it rejects an operation
/// all it hands us is a message and, sometimes, a structured payload.
/// Control flow must never depend on the contents of `message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<String> for GatewayError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for GatewayError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failures surfaced by the OAuth session manager.
///
/// The first two variants are precondition violations detected locally;
/// the rest wrap a [`GatewayError`] cause from the backend, scoped to the
/// operation that failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("OAuth session not initialized")]
    NotInitialized,

    #[error("another OAuth operation is already in progress")]
    OperationInProgress,

    #[error("OAuth initialization failed: {0}")]
    InitializationFailed(GatewayError),

    #[error("OAuth authorization flow failed: {0}")]
    FlowFailed(GatewayError),

    #[error("failed to fetch user info: {0}")]
    UserInfoFailed(GatewayError),
}

impl SessionError {
    /// The backend cause, if this failure originated in the gateway.
    pub fn gateway_cause(&self) -> Option<&GatewayError> {
        match self {
            Self::InitializationFailed(cause)
            | Self::FlowFailed(cause)
            | Self::UserInfoFailed(cause) => Some(cause),
            Self::NotInitialized | Self::OperationInProgress => None,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

impl From<SessionError> for String {
    fn from(err: SessionError) -> String {
        err.to_string()
    }
}
