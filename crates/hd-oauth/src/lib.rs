//! OAuth session management for HubDesk
//!
//! Client-side front end for the OAuth 2.0 authorization flow against the
//! platform backend. The real protocol work (redirect listener, PKCE,
//! token exchange) lives in the backend process behind the
//! [`OAuthGateway`] boundary; this crate owns the session state machine
//! and the observable contract the UI renders against.
//!
//! # Usage Example
//! ```no_run
//! use std::sync::Arc;
//! use hd_oauth::{OAuthSessionManager, SessionStateAdapter};
//! use hd_types::SessionConfig;
//!
//! # async fn run(gateway: Arc<dyn hd_oauth::OAuthGateway>) {
//! let manager = Arc::new(OAuthSessionManager::new(gateway));
//! let adapter = SessionStateAdapter::new(manager);
//! let mut updates = adapter.subscribe();
//!
//! adapter.initialize(SessionConfig::new("my-client-id", "my-secret")).await;
//! adapter.start_flow().await;
//! # }
//! ```

pub mod gateway;
pub mod session_manager;
pub mod ui_state;

// Re-export public API
pub use gateway::{MockGateway, OAuthGateway};
pub use session_manager::OAuthSessionManager;
pub use ui_state::{SessionSnapshot, SessionStateAdapter};
