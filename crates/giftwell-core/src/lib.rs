//! Giftwell Core - Client-side gift lifecycle and reservation engine
//!
//! Keeps one viewer's copy of a shared gift registry consistent with server
//! truth: every mutating action is applied optimistically and reconciled
//! against the authority's response, purchases pass through a cancellable
//! grace window, and a persistent push channel converges all connected
//! viewers onto the same authoritative records.

pub mod channel;
pub mod engine;
pub mod remote;
pub mod session;
pub mod store;

pub use channel::{ChannelStatus, PushEvent, SocketChannel, SocketConfig, spawn_dispatcher};
pub use engine::{
    EngineError, GraceConfig, GraceCoordinator, GraceError, GraceHandle, InFlightPhase,
    MutationEngine,
};
pub use remote::{CommandResponse, HttpRemote, RemoteCommands, RemoteConfig, RemoteError};
pub use session::SessionContext;
pub use store::{GiftStore, StoreEvent};

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

use giftwell_models::{ActionKind, GiftAction, GiftPatch, GiftRecord, policy};

/// One viewer's connection to the shared registry.
///
/// Owns the local store, the mutation engine, the grace coordinator and the
/// propagation channel plumbing for a single authenticated session.
pub struct GiftClient {
    session: SessionContext,
    store: Arc<GiftStore>,
    engine: Arc<MutationEngine>,
    grace: GraceCoordinator,
    remote: Arc<dyn RemoteCommands>,
    socket: Option<SocketChannel>,
    dispatcher: Option<JoinHandle<()>>,
}

impl GiftClient {
    /// Create a client for one session against the given authority.
    pub fn new(
        session: SessionContext,
        remote: Arc<dyn RemoteCommands>,
        grace_config: GraceConfig,
    ) -> Self {
        let store = Arc::new(GiftStore::new());
        let engine = Arc::new(MutationEngine::new(
            session.clone(),
            store.clone(),
            remote.clone(),
        ));
        let grace = GraceCoordinator::new(engine.clone(), grace_config);

        info!(actor_id = %session.actor_id, "Initializing Giftwell client");

        Self {
            session,
            store,
            engine,
            grace,
            remote,
            socket: None,
            dispatcher: None,
        }
    }

    /// The session this client acts for.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The local store; views read records from here.
    pub fn store(&self) -> Arc<GiftStore> {
        self.store.clone()
    }

    /// The underlying mutation engine.
    pub fn engine(&self) -> Arc<MutationEngine> {
        self.engine.clone()
    }

    /// Subscribe to local record changes (predictions and authoritative).
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    /// Actions the session may currently take on a gift, recomputed from the
    /// current record on every call.
    pub fn allowed_actions(&self, gift_id: &str) -> Vec<ActionKind> {
        self.store
            .get(gift_id)
            .map(|gift| policy::allowed_actions(&self.session.actor_id, &gift))
            .unwrap_or_default()
    }

    /// Open the propagation channel and start applying pushes.
    pub fn connect(&mut self, config: SocketConfig) -> Result<()> {
        if self.socket.is_some() {
            return Err(anyhow!("propagation channel already connected"));
        }
        let socket = SocketChannel::new(config);
        let (events, status) = socket.start()?;
        self.dispatcher = Some(spawn_dispatcher(self.engine.clone(), events, status));
        self.socket = Some(socket);
        Ok(())
    }

    /// Close the propagation channel. The dispatcher drains and exits once
    /// the push queue closes.
    pub fn disconnect(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.stop();
        }
        self.dispatcher.take();
    }

    /// Fetch a gift's authoritative record and start tracking it.
    pub async fn open(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        match self.remote.fetch(gift_id).await {
            Ok(record) => {
                // Through the push path, so an in-flight action still wins.
                self.engine.apply_push(record.clone()).await;
                Ok(record)
            }
            Err(RemoteError::Rejected { .. }) => Err(EngineError::NotFound(gift_id.to_string())),
            Err(error) => Err(EngineError::Transport(error.to_string())),
        }
    }

    /// Reserve an available gift.
    pub async fn reserve(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Reserve, gift_id).await
    }

    /// Release a held reservation (or owner override).
    pub async fn release(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Release, gift_id).await
    }

    /// Start the grace countdown for a purchase. The purchase is issued only
    /// if the countdown expires uncancelled.
    pub async fn begin_purchase(&self, gift_id: &str) -> Result<GraceHandle, GraceError> {
        self.grace.start_purchase(gift_id).await
    }

    /// Cancel a pending purchase countdown.
    pub async fn cancel_purchase(&self, gift_id: &str) -> bool {
        self.grace.cancel_pending(gift_id).await
    }

    /// Owner: confirm the gift physically arrived.
    pub async fn confirm_receipt(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::ConfirmReceipt, gift_id).await
    }

    /// Owner: make the gift visible in shared feeds.
    pub async fn publish(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Publish, gift_id).await
    }

    /// Owner: withdraw the gift to an owner-only draft.
    pub async fn unpublish(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Unpublish, gift_id).await
    }

    /// Owner: edit descriptive fields.
    pub async fn update(&self, gift_id: &str, patch: GiftPatch) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Update(patch), gift_id).await
    }

    /// Owner: retire the gift from circulation.
    pub async fn archive(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Archive, gift_id).await
    }

    /// Owner: delete the gift outright.
    pub async fn delete(&self, gift_id: &str) -> Result<GiftRecord, EngineError> {
        self.engine.perform(GiftAction::Delete, gift_id).await
    }
}

impl Drop for GiftClient {
    fn drop(&mut self) {
        if let Some(socket) = &self.socket {
            socket.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::mock::{MockRemote, MockServer};
    use giftwell_models::GiftStatus;
    use tokio::time::Duration;

    const OWNER: &str = "owner-1";
    const GIFTER_A: &str = "gifter-a";
    const GIFTER_B: &str = "gifter-b";

    fn client_for(server: &Arc<MockServer>, actor: &str) -> (GiftClient, Arc<MockRemote>) {
        let remote = Arc::new(MockRemote::new(server.clone(), actor));
        let client = GiftClient::new(
            SessionContext::new(actor),
            remote.clone(),
            GraceConfig::default(),
        );
        (client, remote)
    }

    async fn settle_spawned() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_open_then_reserve() {
        let server = MockServer::new();
        let gift = GiftRecord::new("wl-1", OWNER, "Blanket").published();
        let gift_id = gift.id.clone();
        server.seed(gift);

        let (client, _) = client_for(&server, GIFTER_A);
        client.open(&gift_id).await.unwrap();

        assert_eq!(
            client.allowed_actions(&gift_id),
            vec![giftwell_models::ActionKind::Reserve]
        );

        let record = client.reserve(&gift_id).await.unwrap();
        assert_eq!(record.status, GiftStatus::Reserved);
        assert_eq!(record.reserved_by.as_deref(), Some(GIFTER_A));
    }

    #[tokio::test]
    async fn test_open_unknown_gift() {
        let server = MockServer::new();
        let (client, _) = client_for(&server, GIFTER_A);
        assert!(matches!(
            client.open("missing").await,
            Err(EngineError::NotFound(_))
        ));
    }

    /// Shared-gift walkthrough: A reserves optimistically, B
    /// converges via push without flicker, A cancels a purchase mid-grace.
    #[tokio::test(start_paused = true)]
    async fn test_shared_gift_scenario() {
        let server = MockServer::new();
        let gift = GiftRecord::new("wl-1", OWNER, "Telescope").published();
        let gift_id = gift.id.clone();
        server.seed(gift);

        let (client_a, remote_a) = client_for(&server, GIFTER_A);
        let (client_b, _remote_b) = client_for(&server, GIFTER_B);
        client_a.open(&gift_id).await.unwrap();
        client_b.open(&gift_id).await.unwrap();

        // Actor A reserves; the prediction is published synchronously, so
        // the very first event A's views see already shows Reserved-by-A.
        let mut events_a = client_a.subscribe();
        let committed = client_a.reserve(&gift_id).await.unwrap();
        match events_a.try_recv().unwrap() {
            StoreEvent::Updated(predicted) => {
                assert_eq!(predicted.status, GiftStatus::Reserved);
                assert_eq!(predicted.reserved_by.as_deref(), Some(GIFTER_A));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(committed.reserved_by.as_deref(), Some(GIFTER_A));

        // Actor B receives the push and converges without ever seeing an
        // intermediate Available state after it arrives.
        let mut events_b = client_b.subscribe();
        client_b
            .engine()
            .apply_push(server.record(&gift_id).unwrap())
            .await;

        let mut seen = Vec::new();
        while let Ok(event) = events_b.try_recv() {
            if let StoreEvent::Updated(record) = event {
                seen.push(record);
            }
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].status, GiftStatus::Reserved);
        assert_eq!(seen[0].reserved_by.as_deref(), Some(GIFTER_A));
        // B is locked out: no actions offered on a gift someone else holds.
        assert!(client_b.allowed_actions(&gift_id).is_empty());

        // A starts a 5s purchase countdown and cancels at 3s.
        let purchases_before = remote_a.call_count("purchase");
        let handle = client_a.begin_purchase(&gift_id).await.unwrap();
        settle_spawned().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        handle.cancel();
        assert!(handle.outcome().await.is_none());
        assert_eq!(remote_a.call_count("purchase"), purchases_before);

        // Re-fetch confirms: still Reserved-by-A, no purchase recorded.
        let refetched = client_a.open(&gift_id).await.unwrap();
        assert_eq!(refetched.status, GiftStatus::Reserved);
        assert_eq!(refetched.reserved_by.as_deref(), Some(GIFTER_A));
        assert!(refetched.purchased_by.is_none());
    }
}
