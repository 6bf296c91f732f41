//! OAuth session manager - owns session state and serializes operations
//!
//! One manager instance lives for the whole process and is shared via
//! `Arc`. Operations are mutually exclusive: a single `busy` flag rejects
//! overlapping calls instead of queueing them, because an interactive
//! authorization can stay pending for minutes and silently stacking
//! flows would surprise the user.

use std::sync::Arc;

use hd_types::{AuthResult, GatewayError, SessionConfig, SessionError, SessionResult, UserProfile};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::OAuthGateway;

/// Where the session is in its configuration -> authorization lifecycle.
#[derive(Debug, Clone, Default)]
enum SessionPhase {
    #[default]
    Uninitialized,
    Initialized {
        config: SessionConfig,
    },
    Authenticated {
        config: SessionConfig,
        auth: AuthResult,
    },
}

#[derive(Debug, Default)]
struct SessionState {
    phase: SessionPhase,
    /// Mutual-exclusion flag, not a queue. Set for the full duration of
    /// one gateway-backed operation.
    busy: bool,
    /// Most recent operation failure; cleared at the start of every
    /// new operation so stale errors never linger across a reattempt.
    last_error: Option<SessionError>,
}

/// Clears `busy` when the operation settles, whichever way it exits.
/// Leaving `busy` set after settlement would lock the manager forever.
struct BusyGuard<'a> {
    state: &'a RwLock<SessionState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.write().busy = false;
    }
}

/// Process-wide owner of OAuth session state.
///
/// The lock is never held across an await point; the only suspension
/// points are the gateway calls, so state transitions are atomic with
/// respect to other manager-issued work.
pub struct OAuthSessionManager {
    gateway: Arc<dyn OAuthGateway>,
    state: RwLock<SessionState>,
}

impl OAuthSessionManager {
    pub fn new(gateway: Arc<dyn OAuthGateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Hand the client credentials to the backend and enter
    /// `Initialized`.
    ///
    /// Re-initialization is permitted and invalidates any previously
    /// held authorization. On gateway failure the prior state is
    /// preserved, including a prior `Authenticated` session.
    pub async fn initialize(&self, config: SessionConfig) -> SessionResult<()> {
        let _busy = self.begin_operation()?;

        info!(
            "Initializing OAuth session for client {} on port {}",
            config.client_id, config.redirect_port
        );

        match self.gateway.initialize_oauth(&config).await {
            Ok(()) => {
                self.state.write().phase = SessionPhase::Initialized { config };
                Ok(())
            }
            Err(cause) => Err(self.record_failure(SessionError::InitializationFailed(cause))),
        }
    }

    /// Run one interactive authorization flow.
    ///
    /// Suspends until the backend reports completion; there is no
    /// built-in timeout. If the user abandons the external authorization
    /// the backend may never settle, in which case `busy` stays true.
    /// Callers that need an escape hatch should use
    /// [`OAuthSessionManager::start_flow_with_cancellation`].
    pub async fn start_flow(&self) -> SessionResult<AuthResult> {
        self.start_flow_with_cancellation(&CancellationToken::new())
            .await
    }

    /// Like [`OAuthSessionManager::start_flow`], but settles as
    /// `FlowFailed` when the token fires first. Cancelling here does not
    /// reach into the backend; it only releases this manager.
    pub async fn start_flow_with_cancellation(
        &self,
        cancel: &CancellationToken,
    ) -> SessionResult<AuthResult> {
        let _busy = self.begin_operation()?;
        self.ensure_initialized()?;

        info!("Starting interactive OAuth authorization flow");

        let result = tokio::select! {
            result = self.gateway.start_oauth_flow() => result,
            () = cancel.cancelled() => {
                debug!("Authorization flow cancelled by caller");
                Err(GatewayError::new("authorization flow cancelled before completion"))
            }
        };

        match result {
            Ok(auth) => {
                info!("OAuth authorization completed for user {}", auth.user.id);
                let mut state = self.state.write();
                if let SessionPhase::Initialized { config }
                | SessionPhase::Authenticated { config, .. } = &state.phase
                {
                    let config = config.clone();
                    state.phase = SessionPhase::Authenticated {
                        config,
                        auth: auth.clone(),
                    };
                }
                Ok(auth)
            }
            Err(cause) => Err(self.record_failure(SessionError::FlowFailed(cause))),
        }
    }

    /// Fetch the profile for an arbitrary access token.
    ///
    /// Independent of the stored [`AuthResult`]: callers may query info
    /// for any token they hold, and the stored authorization is never
    /// mutated by this call.
    pub async fn fetch_user_info(&self, access_token: &str) -> SessionResult<UserProfile> {
        let _busy = self.begin_operation()?;
        self.ensure_initialized()?;

        debug!("Fetching user info");

        match self.gateway.get_user_info(access_token).await {
            Ok(profile) => Ok(profile),
            Err(cause) => Err(self.record_failure(SessionError::UserInfoFailed(cause))),
        }
    }

    /// Drop the stored authorization and last error.
    ///
    /// Local reset only: no gateway call, config is kept, and `busy` is
    /// not required to be false. No-op when there is nothing to clear.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.last_error = None;
        if let SessionPhase::Authenticated { config, .. } = &state.phase {
            debug!("Clearing stored authorization");
            let config = config.clone();
            state.phase = SessionPhase::Initialized { config };
        }
    }

    pub fn is_busy(&self) -> bool {
        self.state.read().busy
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.state.read().phase, SessionPhase::Uninitialized)
    }

    pub fn config(&self) -> Option<SessionConfig> {
        match &self.state.read().phase {
            SessionPhase::Uninitialized => None,
            SessionPhase::Initialized { config } | SessionPhase::Authenticated { config, .. } => {
                Some(config.clone())
            }
        }
    }

    pub fn auth_result(&self) -> Option<AuthResult> {
        match &self.state.read().phase {
            SessionPhase::Authenticated { auth, .. } => Some(auth.clone()),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.state.read().last_error.clone()
    }

    /// Claim the busy flag and clear the previous error.
    ///
    /// A rejection here must not touch `last_error`: the in-flight
    /// operation owns that slot until it settles.
    fn begin_operation(&self) -> SessionResult<BusyGuard<'_>> {
        let mut state = self.state.write();
        if state.busy {
            debug!("Operation rejected: another operation is in flight");
            return Err(SessionError::OperationInProgress);
        }
        state.busy = true;
        state.last_error = None;
        drop(state);
        Ok(BusyGuard { state: &self.state })
    }

    /// Precondition for gateway-backed operations other than
    /// `initialize`; fails before the gateway is ever contacted.
    fn ensure_initialized(&self) -> SessionResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(self.record_failure(SessionError::NotInitialized))
        }
    }

    fn record_failure(&self, err: SessionError) -> SessionError {
        warn!("OAuth operation failed: {}", err);
        self.state.write().last_error = Some(err.clone());
        err
    }
}
