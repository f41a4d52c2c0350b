//! Gift Actions
//!
//! Every mutating operation a viewer can issue against a gift, plus the
//! typed field set carried by an update.

use serde::{Deserialize, Serialize};

use crate::gift::{GiftPriority, GiftRecord};

/// Partial update of a gift's descriptive fields.
///
/// Only present fields are applied; lifecycle fields (status, holders,
/// publication) are never touched by a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<GiftPriority>,
}

impl GiftPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.estimated_price.is_none()
            && self.image_url.is_none()
            && self.product_url.is_none()
            && self.priority.is_none()
    }

    /// Apply the present fields onto a record.
    pub fn apply_to(&self, gift: &mut GiftRecord) {
        if let Some(title) = &self.title {
            gift.title = title.clone();
        }
        if let Some(description) = &self.description {
            gift.description = Some(description.clone());
        }
        if let Some(price) = self.estimated_price {
            gift.estimated_price = Some(price);
        }
        if let Some(url) = &self.image_url {
            gift.image_url = Some(url.clone());
        }
        if let Some(url) = &self.product_url {
            gift.product_url = Some(url.clone());
        }
        if let Some(priority) = self.priority {
            gift.priority = priority;
        }
    }
}

/// A mutating action on a gift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GiftAction {
    Reserve,
    Release,
    Purchase,
    ConfirmReceipt,
    Publish,
    Unpublish,
    Update(GiftPatch),
    Archive,
    Delete,
}

impl GiftAction {
    /// Payload-free discriminant, used by the policy and for routing.
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Reserve => ActionKind::Reserve,
            Self::Release => ActionKind::Release,
            Self::Purchase => ActionKind::Purchase,
            Self::ConfirmReceipt => ActionKind::ConfirmReceipt,
            Self::Publish => ActionKind::Publish,
            Self::Unpublish => ActionKind::Unpublish,
            Self::Update(_) => ActionKind::Update,
            Self::Archive => ActionKind::Archive,
            Self::Delete => ActionKind::Delete,
        }
    }
}

/// Discriminant of [`GiftAction`] without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Reserve,
    Release,
    Purchase,
    ConfirmReceipt,
    Publish,
    Unpublish,
    Update,
    Archive,
    Delete,
}

impl ActionKind {
    /// Command verb on the remote surface.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Reserve => "reserve",
            Self::Release => "release",
            Self::Purchase => "purchase",
            Self::ConfirmReceipt => "confirm-receipt",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
            Self::Update => "update",
            Self::Archive => "archive",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}
