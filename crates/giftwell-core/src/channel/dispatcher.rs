//! Push Dispatcher
//!
//! Bridges the propagation socket and the mutation engine: drains the push
//! queue into the engine's merge logic, and reacts to connection health by
//! marking local records stale on disconnect and resyncing on reconnect.
//! State flows through message passing only; no handler mutates shared state
//! directly.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::MutationEngine;

use super::types::{ChannelStatus, PushEvent};

/// Spawn the dispatch loop. Ends when the push queue closes.
pub fn spawn_dispatcher(
    engine: Arc<MutationEngine>,
    mut events: mpsc::Receiver<PushEvent>,
    mut status: watch::Receiver<ChannelStatus>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut status_open = true;
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => handle_event(&engine, event).await,
                    None => {
                        debug!("Push queue closed, dispatcher exiting");
                        return;
                    }
                },
                changed = status.changed(), if status_open => {
                    if changed.is_err() {
                        // Status feed gone; keep draining pushes until the
                        // queue closes too.
                        status_open = false;
                        continue;
                    }
                    let current = *status.borrow_and_update();
                    handle_status(&engine, current).await;
                }
            }
        }
    })
}

async fn handle_event(engine: &MutationEngine, event: PushEvent) {
    match event {
        PushEvent::GiftUpdated { gift } => {
            debug!(gift_id = %gift.id, status = %gift.status, "Applying pushed record");
            engine.apply_push(gift).await;
        }
        PushEvent::GiftDeleted { gift_id } => {
            debug!(gift_id = %gift_id, "Applying pushed removal");
            engine.apply_push_removed(&gift_id).await;
        }
        // Side-channel events never touch gift state.
        PushEvent::Notification { .. } => {}
    }
}

async fn handle_status(engine: &MutationEngine, status: ChannelStatus) {
    match status {
        ChannelStatus::Disconnected => {
            warn!("Propagation channel down; local records may be stale");
            engine.store().mark_stale();
        }
        ChannelStatus::Connected => {
            if engine.store().is_stale() {
                if let Err(error) = engine.resync().await {
                    warn!(error = %error, "Resync after reconnect failed");
                }
            }
        }
        ChannelStatus::Connecting => {}
    }
}
