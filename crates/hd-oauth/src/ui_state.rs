//! Presentation-facing session state adapter
//!
//! Bridges [`OAuthSessionManager`] state into an observable snapshot the
//! UI layer can bind to without knowing the manager's internals. Views
//! subscribe to a `watch` channel and re-render on every published
//! snapshot; trigger functions mirror the manager's operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hd_types::{AuthResult, SessionConfig, SessionError, SessionResult, UserProfile};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::session_manager::OAuthSessionManager;

/// What the UI sees. Published as a whole on every change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub busy: bool,
    pub initialized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_result: Option<AuthResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_message: Option<String>,
}

/// Observable binding layer between the session manager and the views.
///
/// Each trigger publishes `busy = true` with a cleared error message
/// before delegating, refreshes the snapshot from the manager's
/// post-call state on settlement, and clears `busy` last. Duplicate
/// triggers are short-circuited locally with an in-flight flag rather
/// than paying a round-trip just to have the manager reject them.
pub struct SessionStateAdapter {
    manager: Arc<OAuthSessionManager>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    in_flight: AtomicBool,
}

impl SessionStateAdapter {
    pub fn new(manager: Arc<OAuthSessionManager>) -> Self {
        let initial = SessionSnapshot {
            busy: manager.is_busy(),
            initialized: manager.is_initialized(),
            auth_result: manager.auth_result(),
            last_error_message: manager.last_error().map(|e| e.to_string()),
        };
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            manager,
            snapshot_tx,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Subscribe to snapshot updates. The receiver immediately holds the
    /// current snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Validate and submit a session config.
    ///
    /// Syntactic validation happens here, before the manager or the
    /// backend is involved; a rejected config surfaces through
    /// `last_error_message` like any other failure.
    pub async fn initialize(&self, config: SessionConfig) {
        if !self.begin_trigger() {
            return;
        }
        if let Err(err) = config.validate() {
            self.finish_trigger(Some(err.to_string()));
            return;
        }
        let result = self.manager.initialize(config).await;
        self.finish_trigger(result.err().map(|e| e.to_string()));
    }

    /// Kick off the interactive authorization flow. The outcome lands in
    /// the snapshot: `auth_result` on success, `last_error_message` on
    /// failure. Never retried automatically; the flow has user-visible
    /// side effects in the browser.
    pub async fn start_flow(&self) {
        if !self.begin_trigger() {
            return;
        }
        let result = self.manager.start_flow().await;
        self.finish_trigger(result.err().map(|e| e.to_string()));
    }

    /// Fetch the profile for a token the caller holds. Returns the
    /// profile directly and also records any failure in the snapshot.
    pub async fn fetch_user_info(&self, access_token: &str) -> SessionResult<UserProfile> {
        if !self.begin_trigger() {
            return Err(SessionError::OperationInProgress);
        }
        let result = self.manager.fetch_user_info(access_token).await;
        self.finish_trigger(result.as_ref().err().map(ToString::to_string));
        result
    }

    /// Drop the displayed authorization and error. Leaves `initialized`
    /// and `busy` untouched.
    pub fn clear(&self) {
        self.manager.clear();
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.auth_result = None;
            snapshot.last_error_message = None;
        });
    }

    /// Claim the in-flight slot and publish the busy snapshot.
    fn begin_trigger(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Trigger ignored: another trigger is in flight");
            return false;
        }
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.busy = true;
            snapshot.last_error_message = None;
        });
        true
    }

    /// Publish the settled snapshot from the manager's post-call state,
    /// then release the in-flight slot. `busy` goes false in the same
    /// published snapshot, strictly after the outcome is recorded.
    fn finish_trigger(&self, error_message: Option<String>) {
        let settled = SessionSnapshot {
            busy: false,
            initialized: self.manager.is_initialized(),
            auth_result: self.manager.auth_result(),
            last_error_message: error_message,
        };
        self.snapshot_tx.send_modify(|snapshot| *snapshot = settled);
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, OAuthGateway};
    use hd_types::GatewayError;

    fn adapter_with(gateway: &Arc<MockGateway>) -> Arc<SessionStateAdapter> {
        let manager = Arc::new(OAuthSessionManager::new(
            Arc::clone(gateway) as Arc<dyn OAuthGateway>
        ));
        Arc::new(SessionStateAdapter::new(manager))
    }

    fn test_config() -> SessionConfig {
        SessionConfig::new("abc", "s3cr3t")
    }

    #[tokio::test]
    async fn test_initialize_updates_snapshot() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;

        let snapshot = adapter.snapshot();
        assert!(snapshot.initialized);
        assert!(!snapshot.busy);
        assert!(snapshot.auth_result.is_none());
        assert!(snapshot.last_error_message.is_none());
    }

    #[tokio::test]
    async fn test_start_flow_publishes_auth_result() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;
        adapter.start_flow().await;

        let snapshot = adapter.snapshot();
        let auth = snapshot.auth_result.expect("auth result published");
        assert_eq!(auth.user.name.as_deref(), Some("Ada"));
        assert!(snapshot.last_error_message.is_none());
    }

    #[tokio::test]
    async fn test_gateway_failure_renders_error_message() {
        let gateway = Arc::new(MockGateway::new());
        gateway.set_initialize_result(Err(GatewayError::new("invalid_client")));
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;

        let snapshot = adapter.snapshot();
        assert!(!snapshot.initialized);
        assert!(!snapshot.busy);
        let message = snapshot.last_error_message.expect("error rendered");
        assert!(message.contains("invalid_client"));
    }

    #[tokio::test]
    async fn test_invalid_config_never_reaches_gateway() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);

        adapter.initialize(SessionConfig::new("", "s3cr3t")).await;

        let snapshot = adapter.snapshot();
        assert!(!snapshot.initialized);
        assert!(snapshot
            .last_error_message
            .expect("validation error rendered")
            .contains("client ID"));
        assert_eq!(gateway.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_busy_is_observable_while_flow_pending() {
        let gateway = Arc::new(MockGateway::new());
        let gate = gateway.hold_flow();
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;

        let pending = tokio::spawn({
            let adapter = Arc::clone(&adapter);
            async move { adapter.start_flow().await }
        });
        while !adapter.snapshot().busy {
            tokio::task::yield_now().await;
        }

        assert!(adapter.snapshot().busy);
        gate.notify_one();
        pending.await.unwrap();

        let snapshot = adapter.snapshot();
        assert!(!snapshot.busy);
        assert!(snapshot.auth_result.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_trigger_short_circuits() {
        let gateway = Arc::new(MockGateway::new());
        let gate = gateway.hold_flow();
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;

        let pending = tokio::spawn({
            let adapter = Arc::clone(&adapter);
            async move { adapter.start_flow().await }
        });
        while !adapter.snapshot().busy {
            tokio::task::yield_now().await;
        }

        // The duplicate is dropped locally: no extra gateway call, no
        // disturbance of the pending flow's snapshot.
        adapter.start_flow().await;
        assert_eq!(gateway.flow_calls(), 1);
        assert!(adapter.snapshot().busy);

        let err = adapter.fetch_user_info("tok_123").await.unwrap_err();
        assert_eq!(err, SessionError::OperationInProgress);
        assert_eq!(gateway.user_info_calls(), 0);

        gate.notify_one();
        pending.await.unwrap();
        assert!(adapter.snapshot().auth_result.is_some());
    }

    #[tokio::test]
    async fn test_subscriber_sees_settled_snapshot() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);
        let mut updates = adapter.subscribe();

        adapter.initialize(test_config()).await;

        updates.changed().await.unwrap();
        let snapshot = updates.borrow_and_update().clone();
        assert!(snapshot.initialized);
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_clear_resets_auth_and_error_only() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;
        adapter.start_flow().await;

        gateway.set_user_info_result(Err(GatewayError::new("token_expired")));
        adapter.fetch_user_info("stale").await.unwrap_err();
        assert!(adapter.snapshot().last_error_message.is_some());

        adapter.clear();

        let snapshot = adapter.snapshot();
        assert!(snapshot.auth_result.is_none());
        assert!(snapshot.last_error_message.is_none());
        assert!(snapshot.initialized);
        assert!(!snapshot.busy);
    }

    #[tokio::test]
    async fn test_fetch_user_info_returns_profile() {
        let gateway = Arc::new(MockGateway::new());
        let adapter = adapter_with(&gateway);

        adapter.initialize(test_config()).await;
        let profile = adapter.fetch_user_info("tok_123").await.unwrap();

        assert_eq!(profile.id, "u1");
        // Fetching info for an arbitrary token never touches the
        // displayed authorization.
        assert!(adapter.snapshot().auth_result.is_none());
    }
}
