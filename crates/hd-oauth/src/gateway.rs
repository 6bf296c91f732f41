//! Backend command gateway boundary
//!
//! The HubDesk backend process performs the real OAuth protocol work:
//! it binds the local redirect listener, generates PKCE/state material,
//! opens the browser, and exchanges the authorization code for a token.
//! This module defines the async boundary the session manager talks to,
//! plus a programmable mock for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hd_types::{AuthResult, GatewayError, SessionConfig, UserProfile};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Asynchronous command channel to the OAuth backend.
///
/// All three operations map one-to-one onto backend commands. The
/// backend owns interactive mechanics end to end: `start_oauth_flow`
/// suspends until the external authorization completes or is abandoned,
/// which can take a human-timescale amount of time.
#[async_trait]
pub trait OAuthGateway: Send + Sync {
    /// Hand the client credentials and redirect port to the backend.
    async fn initialize_oauth(&self, config: &SessionConfig) -> Result<(), GatewayError>;

    /// Run one interactive authorization flow to completion.
    async fn start_oauth_flow(&self) -> Result<AuthResult, GatewayError>;

    /// Fetch the profile for an arbitrary access token.
    async fn get_user_info(&self, access_token: &str) -> Result<UserProfile, GatewayError>;
}

/// Programmable in-memory gateway for tests.
///
/// Results are configurable per operation, every invocation is counted,
/// and the interactive flow can be held open with [`MockGateway::hold_flow`]
/// to model a pending browser authorization.
pub struct MockGateway {
    initialize_result: Mutex<Result<(), GatewayError>>,
    flow_result: Mutex<Result<AuthResult, GatewayError>>,
    user_info_result: Mutex<Result<UserProfile, GatewayError>>,
    flow_gate: Mutex<Option<Arc<Notify>>>,
    initialize_calls: AtomicUsize,
    flow_calls: AtomicUsize,
    user_info_calls: AtomicUsize,
}

impl MockGateway {
    /// Create a mock that succeeds on every operation with sample data.
    pub fn new() -> Self {
        let user = UserProfile {
            name: Some("Ada".to_string()),
            ..UserProfile::new("u1")
        };
        Self {
            initialize_result: Mutex::new(Ok(())),
            flow_result: Mutex::new(Ok(AuthResult {
                access_token: "tok_123".to_string(),
                user: user.clone(),
            })),
            user_info_result: Mutex::new(Ok(user)),
            flow_gate: Mutex::new(None),
            initialize_calls: AtomicUsize::new(0),
            flow_calls: AtomicUsize::new(0),
            user_info_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_initialize_result(&self, result: Result<(), GatewayError>) {
        *self.initialize_result.lock() = result;
    }

    pub fn set_flow_result(&self, result: Result<AuthResult, GatewayError>) {
        *self.flow_result.lock() = result;
    }

    pub fn set_user_info_result(&self, result: Result<UserProfile, GatewayError>) {
        *self.user_info_result.lock() = result;
    }

    /// Make subsequent `start_oauth_flow` calls wait until the returned
    /// handle is notified. `Notify` stores a permit, so notifying before
    /// the flow reaches the gate is not a race.
    pub fn hold_flow(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.flow_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn flow_calls(&self) -> usize {
        self.flow_calls.load(Ordering::SeqCst)
    }

    pub fn user_info_calls(&self) -> usize {
        self.user_info_calls.load(Ordering::SeqCst)
    }

    /// Invocations across all operations, for "gateway never contacted"
    /// assertions.
    pub fn total_calls(&self) -> usize {
        self.initialize_calls() + self.flow_calls() + self.user_info_calls()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OAuthGateway for MockGateway {
    async fn initialize_oauth(&self, _config: &SessionConfig) -> Result<(), GatewayError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        self.initialize_result.lock().clone()
    }

    async fn start_oauth_flow(&self) -> Result<AuthResult, GatewayError> {
        self.flow_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.flow_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.flow_result.lock().clone()
    }

    async fn get_user_info(&self, _access_token: &str) -> Result<UserProfile, GatewayError> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        self.user_info_result.lock().clone()
    }
}
