//! Grace-Period Timer
//!
//! Wraps the purchase commitment in a cancellable countdown. Neither the
//! optimistic prediction nor the remote command is issued until the countdown
//! expires uninterrupted; cancelling discards the timer with zero state
//! change. One countdown per gift per client.

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, oneshot};
use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use giftwell_models::{GiftAction, GiftRecord};

use super::mutation::{EngineError, MutationEngine};

/// Shortest permitted countdown.
const MIN_COUNTDOWN: Duration = Duration::from_secs(5);
/// Longest permitted countdown.
const MAX_COUNTDOWN: Duration = Duration::from_secs(10);

/// Grace window configuration
#[derive(Debug, Clone, Copy)]
pub struct GraceConfig {
    /// Countdown before the purchase is actually issued
    pub countdown: Duration,
}

impl GraceConfig {
    /// Create a config; the countdown is clamped to the 5-10s window.
    pub fn new(countdown: Duration) -> Self {
        Self {
            countdown: countdown.clamp(MIN_COUNTDOWN, MAX_COUNTDOWN),
        }
    }
}

impl Default for GraceConfig {
    fn default() -> Self {
        Self {
            countdown: MIN_COUNTDOWN,
        }
    }
}

/// Why a countdown could not start.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraceError {
    #[error("a grace countdown is already pending for this gift")]
    AlreadyPending,

    #[error("unknown gift: {0}")]
    UnknownGift(String),
}

/// Handle to a running countdown.
#[derive(Debug)]
pub struct GraceHandle {
    gift_id: String,
    token: CancellationToken,
    outcome: oneshot::Receiver<Option<Result<GiftRecord, EngineError>>>,
}

impl GraceHandle {
    /// The gift this countdown is for.
    pub fn gift_id(&self) -> &str {
        &self.gift_id
    }

    /// Cancel the countdown. A no-op once it has already expired.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the countdown to settle.
    ///
    /// Returns `None` if it was cancelled (nothing happened at all), or
    /// `Some` with the purchase outcome once the countdown ran to zero.
    pub async fn outcome(self) -> Option<Result<GiftRecord, EngineError>> {
        self.outcome.await.unwrap_or(None)
    }
}

/// Starts and tracks grace countdowns, one per gift at most.
pub struct GraceCoordinator {
    engine: Arc<MutationEngine>,
    config: GraceConfig,
    pending: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl GraceCoordinator {
    /// Create a coordinator driving `engine`.
    pub fn new(engine: Arc<MutationEngine>, config: GraceConfig) -> Self {
        Self {
            engine,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Begin the purchase countdown for `gift_id`.
    ///
    /// The engine is not touched until the countdown expires; if the returned
    /// handle (or [`cancel_pending`](Self::cancel_pending)) cancels it first,
    /// no state change and no remote call ever happen.
    pub async fn start_purchase(&self, gift_id: &str) -> Result<GraceHandle, GraceError> {
        if self.engine.store().get(gift_id).is_none() {
            return Err(GraceError::UnknownGift(gift_id.to_string()));
        }

        let token = CancellationToken::new();
        {
            let mut pending = self.pending.lock().await;
            if pending.contains_key(gift_id) {
                return Err(GraceError::AlreadyPending);
            }
            pending.insert(gift_id.to_string(), token.clone());
        }

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let engine = self.engine.clone();
        let pending = self.pending.clone();
        let countdown = self.config.countdown;
        let task_token = token.clone();
        let id = gift_id.to_string();

        debug!(gift_id = %id, countdown = ?countdown, "Grace countdown started");
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = task_token.cancelled() => {
                    debug!(gift_id = %id, "Grace countdown cancelled, nothing issued");
                    None
                }
                _ = sleep(countdown) => {
                    Some(engine.perform(GiftAction::Purchase, &id).await)
                }
            };
            pending.lock().await.remove(&id);
            let _ = outcome_tx.send(outcome);
        });

        Ok(GraceHandle {
            gift_id: gift_id.to_string(),
            token,
            outcome: outcome_rx,
        })
    }

    /// Cancel the pending countdown for `gift_id`, if any.
    pub async fn cancel_pending(&self, gift_id: &str) -> bool {
        match self.pending.lock().await.get(gift_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a countdown is currently pending for `gift_id`.
    pub async fn is_pending(&self, gift_id: &str) -> bool {
        self.pending.lock().await.contains_key(gift_id)
    }
}
