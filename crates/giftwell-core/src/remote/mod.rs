//! Remote Command Surface
//!
//! One call per gift action against the server-side authority. The client
//! never ships its predicted record: commands carry only the gift ID (plus
//! the patch for updates) and the server recomputes the transition under its
//! own mutual exclusion. Every response is either the authoritative record or
//! a rejection message.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use giftwell_models::{GiftAction, GiftPatch, GiftRecord};

pub use http::{HttpRemote, RemoteConfig};

/// Wire envelope returned by every gift command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift: Option<GiftRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CommandResponse {
    /// Convert the envelope into a typed result.
    pub fn into_result(self) -> Result<GiftRecord, RemoteError> {
        if self.success {
            self.gift.ok_or_else(|| {
                RemoteError::Malformed("success response without gift record".to_string())
            })
        } else {
            Err(RemoteError::Rejected {
                message: self
                    .message
                    .unwrap_or_else(|| "rejected by server".to_string()),
            })
        }
    }
}

/// Failure of a remote command.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The server refused the transition (guard failure or race loss).
    #[error("command rejected: {message}")]
    Rejected { message: String },

    /// The command could not complete (network, timeout, server down).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server answered with something the client cannot interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Commands accepted by the server-side authority, one per action.
#[async_trait]
pub trait RemoteCommands: Send + Sync {
    async fn reserve(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn release(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn purchase(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn confirm_receipt(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn publish(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn unpublish(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    async fn update(&self, gift_id: &str, patch: &GiftPatch) -> Result<GiftRecord, RemoteError>;
    async fn archive(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    /// Delete returns the final record so the caller can log what was removed.
    async fn delete(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;
    /// Fetch the current authoritative record (resync after disconnect).
    async fn fetch(&self, gift_id: &str) -> Result<GiftRecord, RemoteError>;

    /// Route an action to its command.
    async fn dispatch(
        &self,
        action: &GiftAction,
        gift_id: &str,
    ) -> Result<GiftRecord, RemoteError> {
        match action {
            GiftAction::Reserve => self.reserve(gift_id).await,
            GiftAction::Release => self.release(gift_id).await,
            GiftAction::Purchase => self.purchase(gift_id).await,
            GiftAction::ConfirmReceipt => self.confirm_receipt(gift_id).await,
            GiftAction::Publish => self.publish(gift_id).await,
            GiftAction::Unpublish => self.unpublish(gift_id).await,
            GiftAction::Update(patch) => self.update(gift_id, patch).await,
            GiftAction::Archive => self.archive(gift_id).await,
            GiftAction::Delete => self.delete(gift_id).await,
        }
    }
}
