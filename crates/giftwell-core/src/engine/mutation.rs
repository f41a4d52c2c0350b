//! Optimistic Mutation Engine
//!
//! Executes a gift action by snapshotting the current record, publishing a
//! locally-predicted successor synchronously, then issuing the remote command
//! and reconciling: the server's authoritative record is adopted on success,
//! the snapshot is restored on failure. Actions on the same gift from the
//! same client are serialized by id; a push arriving while an action is in
//! flight is queued and applied after that action settles.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use giftwell_models::{GiftAction, GiftRecord, TransitionError, transition};

use crate::remote::{RemoteCommands, RemoteError};
use crate::session::SessionContext;
use crate::store::{GiftStore, StoreEvent};

/// Where an in-flight action stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlightPhase {
    /// Prediction published locally, remote command not yet settled.
    Predicted,
    /// Remote authority confirmed; its record has been adopted.
    Committed,
    /// Remote command failed or was rejected; snapshot restored.
    RolledBack,
}

struct InFlight {
    snapshot: GiftRecord,
    phase: InFlightPhase,
    /// Authoritative push that arrived mid-flight; applied after settling so
    /// it cannot clobber the prediction and flicker back.
    queued_push: Option<StoreEvent>,
}

/// Failure of a locally initiated action.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown gift: {0}")]
    NotFound(String),

    /// Illegal for the current state or role; rejected before any network
    /// call. Views surface this as a disabled control, not an error toast.
    #[error(transparent)]
    Rejected(#[from] TransitionError),

    /// A previous action on this gift has not settled yet.
    #[error("another action for this gift is still in flight")]
    AlreadyInFlight,

    /// Legal locally, but another actor committed first. The local record has
    /// been rolled back and the winner's record adopted.
    #[error("no longer available: {message}")]
    RaceLost { message: String },

    /// The command could not complete; the local record has been rolled back.
    /// Retry is user-initiated, never automatic.
    #[error("request failed: {0}")]
    Transport(String),
}

/// Client-side engine executing optimistic gift mutations.
pub struct MutationEngine {
    session: SessionContext,
    store: Arc<GiftStore>,
    remote: Arc<dyn RemoteCommands>,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

impl MutationEngine {
    /// Create an engine for one authenticated session.
    pub fn new(
        session: SessionContext,
        store: Arc<GiftStore>,
        remote: Arc<dyn RemoteCommands>,
    ) -> Self {
        Self {
            session,
            store,
            remote,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The session this engine acts for.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// The local store this engine maintains.
    pub fn store(&self) -> &Arc<GiftStore> {
        &self.store
    }

    /// Whether an action for `gift_id` has not settled yet.
    pub async fn is_in_flight(&self, gift_id: &str) -> bool {
        self.in_flight.lock().await.contains_key(gift_id)
    }

    /// Phase of the in-flight action for `gift_id`, if any.
    pub async fn phase(&self, gift_id: &str) -> Option<InFlightPhase> {
        self.in_flight
            .lock()
            .await
            .get(gift_id)
            .map(|entry| entry.phase)
    }

    /// Execute `action` on `gift_id` optimistically.
    ///
    /// Returns the authoritative record on success. On any failure the local
    /// record has already been restored (and, for a race loss, replaced by
    /// the winner's record where obtainable).
    pub async fn perform(
        &self,
        action: GiftAction,
        gift_id: &str,
    ) -> Result<GiftRecord, EngineError> {
        let current = self
            .store
            .get(gift_id)
            .ok_or_else(|| EngineError::NotFound(gift_id.to_string()))?;

        // Fail fast: the same guard the server will apply, with the local
        // identity. An obviously illegal action never reaches the network.
        let now = chrono::Utc::now().timestamp_millis();
        let predicted = transition::apply(&current, &action, &self.session.actor_id, now)?;

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(gift_id) {
                return Err(EngineError::AlreadyInFlight);
            }
            in_flight.insert(
                gift_id.to_string(),
                InFlight {
                    snapshot: current,
                    phase: InFlightPhase::Predicted,
                    queued_push: None,
                },
            );
        }

        // Publish the prediction synchronously: subscribed views see it
        // before this function first suspends.
        if matches!(action, GiftAction::Delete) {
            self.store.remove(gift_id);
        } else {
            self.store.insert(predicted);
        }
        debug!(gift_id = %gift_id, verb = %action.kind(), "Published optimistic prediction");

        // The command carries the action and the id only; the authority
        // recomputes the transition itself.
        let result = self.remote.dispatch(&action, gift_id).await;
        self.settle(&action, gift_id, result).await
    }

    /// Reconcile the remote outcome, restore or adopt, then drain any push
    /// queued while the action was in flight.
    async fn settle(
        &self,
        action: &GiftAction,
        gift_id: &str,
        result: Result<GiftRecord, RemoteError>,
    ) -> Result<GiftRecord, EngineError> {
        let entry = self.in_flight.lock().await.remove(gift_id);
        let (snapshot, queued_push) = match entry {
            Some(entry) => (Some(entry.snapshot), entry.queued_push),
            None => (None, None),
        };

        let outcome = match result {
            Ok(authoritative) => {
                // The server record always wins, even when it differs from
                // the prediction.
                if matches!(action, GiftAction::Delete) {
                    self.store.remove(gift_id);
                } else {
                    self.store.insert(authoritative.clone());
                }
                info!(
                    gift_id = %gift_id,
                    verb = %action.kind(),
                    phase = ?InFlightPhase::Committed,
                    "Action committed"
                );
                Ok(authoritative)
            }
            Err(error) => {
                if let Some(snapshot) = snapshot {
                    self.store.insert(snapshot);
                }
                match error {
                    RemoteError::Rejected { message } => {
                        warn!(
                            gift_id = %gift_id,
                            verb = %action.kind(),
                            phase = ?InFlightPhase::RolledBack,
                            message = %message,
                            "Lost to a concurrent commit, rolled back"
                        );
                        // Adopt the winner's record right away rather than
                        // waiting for the next push.
                        if queued_push.is_none() {
                            self.adopt_authoritative(gift_id).await;
                        }
                        Err(EngineError::RaceLost { message })
                    }
                    other => {
                        warn!(
                            gift_id = %gift_id,
                            verb = %action.kind(),
                            phase = ?InFlightPhase::RolledBack,
                            error = %other,
                            "Remote command failed, rolled back"
                        );
                        Err(EngineError::Transport(other.to_string()))
                    }
                }
            }
        };

        // A push queued mid-flight reflects a committed transition; it is
        // applied last so the final state is server truth.
        if let Some(event) = queued_push {
            self.apply_store_event(event);
        }

        outcome
    }

    async fn adopt_authoritative(&self, gift_id: &str) {
        match self.remote.fetch(gift_id).await {
            Ok(record) => self.store.insert(record),
            Err(RemoteError::Rejected { .. }) => {
                // Gone on the server; drop it locally too.
                self.store.remove(gift_id);
            }
            Err(error) => {
                debug!(gift_id = %gift_id, error = %error, "Could not adopt authoritative record; awaiting push");
            }
        }
    }

    /// Apply a `gift:updated` push. Replaces the local record unconditionally
    /// unless an optimistic action for the same gift is in flight, in which
    /// case the push is held until that action settles.
    pub async fn apply_push(&self, gift: GiftRecord) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get_mut(&gift.id) {
            debug!(gift_id = %gift.id, "Queued push behind in-flight action");
            entry.queued_push = Some(StoreEvent::Updated(gift));
        } else {
            drop(in_flight);
            self.store.insert(gift);
        }
    }

    /// Apply a `gift:deleted` push, with the same in-flight queueing.
    pub async fn apply_push_removed(&self, gift_id: &str) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get_mut(gift_id) {
            debug!(gift_id = %gift_id, "Queued removal behind in-flight action");
            entry.queued_push = Some(StoreEvent::Removed(gift_id.to_string()));
        } else {
            drop(in_flight);
            self.store.remove(gift_id);
        }
    }

    fn apply_store_event(&self, event: StoreEvent) {
        match event {
            StoreEvent::Updated(gift) => self.store.insert(gift),
            StoreEvent::Removed(gift_id) => {
                self.store.remove(&gift_id);
            }
        }
    }

    /// Re-fetch every tracked gift after a channel outage. Records come back
    /// through the push path so an in-flight action is still respected.
    pub async fn resync(&self) -> Result<(), EngineError> {
        let ids = self.store.ids();
        info!(gifts = ids.len(), "Resyncing local records with authority");

        let mut failed = false;
        for gift_id in ids {
            match self.remote.fetch(&gift_id).await {
                Ok(record) => self.apply_push(record).await,
                Err(RemoteError::Rejected { .. }) => {
                    // Deleted while we were away.
                    self.apply_push_removed(&gift_id).await;
                }
                Err(error) => {
                    warn!(gift_id = %gift_id, error = %error, "Resync fetch failed");
                    failed = true;
                }
            }
        }

        if failed {
            Err(EngineError::Transport(
                "resync incomplete; local records may be stale".to_string(),
            ))
        } else {
            self.store.mark_fresh();
            Ok(())
        }
    }
}
