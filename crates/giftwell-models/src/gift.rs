//! Gift Record - Core entity of the shared registry
//!
//! A gift belongs to exactly one wishlist and carries a status that is the
//! single source of truth for its availability. The holder fields
//! (`reserved_by` / `purchased_by`) are derived caches for display and must
//! always agree with the status.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Availability of a gift within its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GiftStatus {
    Available,
    Reserved,
    Purchased,
    Received,
    Archived,
}

impl GiftStatus {
    /// Whether no further lifecycle transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Received | Self::Archived)
    }

    /// Display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Purchased => "Purchased",
            Self::Received => "Received",
            Self::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for GiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// How much the owner wants the gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GiftPriority {
    Essential,
    #[default]
    Nice,
    Optional,
}

/// A single gift entry in a wishlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GiftRecord {
    /// Unique gift ID
    pub id: String,
    /// Wishlist this gift belongs to
    pub wishlist_id: String,
    /// Actor who owns the wishlist (may never reserve or purchase this gift)
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub estimated_price: Option<f64>,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub priority: GiftPriority,
    /// Visible in shared feeds vs. owner-only draft
    pub is_published: bool,
    pub status: GiftStatus,
    /// Present only while status is Reserved
    pub reserved_by: Option<String>,
    /// Present only while status is Purchased or Received
    pub purchased_by: Option<String>,
    /// Timestamps (milliseconds since epoch)
    pub created_at: i64,
    pub updated_at: i64,
    pub reserved_at: Option<i64>,
    pub purchased_at: Option<i64>,
    pub received_at: Option<i64>,
    pub archived_at: Option<i64>,
}

impl GiftRecord {
    /// Create a new draft gift (Available, unpublished).
    pub fn new(
        wishlist_id: impl Into<String>,
        owner_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            wishlist_id: wishlist_id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: None,
            estimated_price: None,
            image_url: None,
            product_url: None,
            priority: GiftPriority::default(),
            is_published: false,
            status: GiftStatus::Available,
            reserved_by: None,
            purchased_by: None,
            created_at: now,
            updated_at: now,
            reserved_at: None,
            purchased_at: None,
            received_at: None,
            archived_at: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set estimated price
    pub fn with_estimated_price(mut self, price: f64) -> Self {
        self.estimated_price = Some(price);
        self
    }

    /// Set product URL
    pub fn with_product_url(mut self, url: impl Into<String>) -> Self {
        self.product_url = Some(url.into());
        self
    }

    /// Set image URL
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: GiftPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the gift as published
    pub fn published(mut self) -> Self {
        self.is_published = true;
        self
    }

    /// The actor currently committed to this gift, if any.
    pub fn holder(&self) -> Option<&str> {
        self.reserved_by
            .as_deref()
            .or(self.purchased_by.as_deref())
    }

    /// Whether `actor` currently holds the reservation.
    pub fn is_reserved_by(&self, actor: &str) -> bool {
        self.status == GiftStatus::Reserved && self.reserved_by.as_deref() == Some(actor)
    }

    /// Whether `actor` is recorded as the purchaser.
    pub fn is_purchased_by(&self, actor: &str) -> bool {
        matches!(self.status, GiftStatus::Purchased | GiftStatus::Received)
            && self.purchased_by.as_deref() == Some(actor)
    }

    /// Check that status and holder fields agree and the owner holds nothing.
    pub fn is_consistent(&self) -> bool {
        let holders_ok = match self.status {
            GiftStatus::Available | GiftStatus::Archived => {
                self.reserved_by.is_none() && self.purchased_by.is_none()
            }
            GiftStatus::Reserved => self.reserved_by.is_some() && self.purchased_by.is_none(),
            GiftStatus::Purchased | GiftStatus::Received => {
                self.reserved_by.is_none() && self.purchased_by.is_some()
            }
        };
        let owner_ok = self.reserved_by.as_deref() != Some(self.owner_id.as_str())
            && self.purchased_by.as_deref() != Some(self.owner_id.as_str());
        holders_ok && owner_ok
    }
}
