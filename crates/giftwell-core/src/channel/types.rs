//! Push Event Types
//!
//! Wire format of the events delivered over the propagation socket.

use serde::{Deserialize, Serialize};

use giftwell_models::GiftRecord;

/// An event pushed by the authority.
///
/// Only `gift:updated` and `gift:deleted` are gift-state-authoritative;
/// notifications are side-channel and must never mutate a gift record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PushEvent {
    /// A gift's authoritative record changed (fired once per committed
    /// transition; duplicate delivery is possible and safe).
    #[serde(rename = "gift:updated")]
    GiftUpdated { gift: GiftRecord },

    /// A gift was deleted by its owner.
    #[serde(rename = "gift:deleted")]
    #[serde(rename_all = "camelCase")]
    GiftDeleted { gift_id: String },

    /// Notification-style side-channel event; carried opaque.
    #[serde(rename = "notification")]
    Notification {
        #[serde(default)]
        payload: serde_json::Value,
    },
}

/// Health of the propagation connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Connecting,
    Connected,
    /// Updates have stopped arriving; local records may be stale.
    Disconnected,
}
