//! Shared types and error types for HubDesk

pub mod errors;
pub mod oauth_types;

pub use errors::{GatewayError, SessionError, SessionResult};
pub use oauth_types::{
    AppInfo, AuthResult, ConfigError, SessionConfig, UserProfile, DEFAULT_REDIRECT_PORT,
};
