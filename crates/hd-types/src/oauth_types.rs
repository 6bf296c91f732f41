//! OAuth session data model shared between the session manager, the UI
//! adapter, and the backend gateway boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Redirect port used when the caller does not pick one.
pub const DEFAULT_REDIRECT_PORT: u16 = 8080;

/// Lowest port the backend's redirect listener may bind to.
const MIN_REDIRECT_PORT: u16 = 1024;

/// Client credentials and redirect settings for one OAuth session.
///
/// Immutable once accepted by `initialize`; re-initializing replaces the
/// whole config. Syntactic validation happens at the presentation boundary
/// via [`SessionConfig::validate`], not in the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
}

fn default_redirect_port() -> u16 {
    DEFAULT_REDIRECT_PORT
}

impl SessionConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_port: DEFAULT_REDIRECT_PORT,
        }
    }

    #[must_use]
    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    /// Syntactic checks only; whether the credentials are actually valid
    /// is for the identity provider to decide.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::EmptyClientSecret);
        }
        if self.redirect_port < MIN_REDIRECT_PORT {
            return Err(ConfigError::PortOutOfRange(self.redirect_port));
        }
        Ok(())
    }
}

/// Config rejected before it ever reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("client ID must not be empty")]
    EmptyClientId,

    #[error("client secret must not be empty")]
    EmptyClientSecret,

    #[error("redirect port {0} is outside the allowed range 1024-65535")]
    PortOutOfRange(u16),
}

/// Platform app the authorized user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub id_code: String,
    pub name: String,
    /// Epoch seconds.
    pub created_at: i64,
}

/// Profile returned by the platform's user-info endpoint.
///
/// Only `id` is guaranteed; everything else depends on what the platform
/// knows about the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AppInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
            app: None,
            avatar_url: None,
        }
    }
}

/// Outcome of one successful interactive authorization flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub access_token: String,
    pub user: UserProfile,
}
