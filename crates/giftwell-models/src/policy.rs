//! Role-Based Action Policy
//!
//! Pure mapping from (session identity, current record) to the actions that
//! identity may take. Roles are derived fresh from the record on every call;
//! nothing here is cached, so a stale record can never leak a stale role.
//! The session identity is passed in explicitly rather than read from any
//! global, so tests can inject arbitrary (actor, record) pairs.

use serde::{Deserialize, Serialize};

use crate::action::ActionKind;
use crate::gift::{GiftRecord, GiftStatus};

/// Relationship between a viewer and a specific gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Wishlist owner; manages the gift, never claims it.
    Owner,
    /// Gifter currently holding the reservation.
    CurrentReserver,
    /// Gifter recorded as the purchaser.
    CurrentPurchaser,
    /// Any other authenticated viewer.
    Gifter,
}

impl Role {
    /// Derive the role of `actor` for `gift` from the current record.
    pub fn derive(actor: &str, gift: &GiftRecord) -> Self {
        if actor == gift.owner_id {
            Self::Owner
        } else if gift.reserved_by.as_deref() == Some(actor) {
            Self::CurrentReserver
        } else if gift.purchased_by.as_deref() == Some(actor) {
            Self::CurrentPurchaser
        } else {
            Self::Gifter
        }
    }
}

/// Actions `actor` may currently take on `gift`.
///
/// An empty result is the read-only locked state: the gift is claimed by
/// someone else (or archived) and no control should be offered. The engine
/// re-checks every guard on `perform`, so a tampered client gains nothing.
pub fn allowed_actions(actor: &str, gift: &GiftRecord) -> Vec<ActionKind> {
    let mut actions = Vec::new();

    match Role::derive(actor, gift) {
        Role::Owner => {
            if !gift.status.is_terminal() {
                actions.push(ActionKind::Update);
                actions.push(ActionKind::Archive);
            }
            if gift.status == GiftStatus::Available {
                actions.push(if gift.is_published {
                    ActionKind::Unpublish
                } else {
                    ActionKind::Publish
                });
            }
            if gift.status == GiftStatus::Reserved {
                // Owner override of a stuck reservation.
                actions.push(ActionKind::Release);
            }
            if gift.status == GiftStatus::Purchased {
                actions.push(ActionKind::ConfirmReceipt);
            }
            actions.push(ActionKind::Delete);
        }
        Role::CurrentReserver => {
            actions.push(ActionKind::Release);
            actions.push(ActionKind::Purchase);
        }
        Role::CurrentPurchaser => {
            // Committed; nothing further until the owner confirms receipt.
        }
        Role::Gifter => {
            if gift.status == GiftStatus::Available && gift.is_published {
                actions.push(ActionKind::Reserve);
            }
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::GiftAction;
    use crate::transition::apply;

    const OWNER: &str = "owner-1";
    const GIFTER_A: &str = "gifter-a";
    const GIFTER_B: &str = "gifter-b";

    fn published_gift() -> GiftRecord {
        GiftRecord::new("wl-1", OWNER, "Camera").published()
    }

    #[test]
    fn test_role_derivation() {
        let gift = published_gift();
        assert_eq!(Role::derive(OWNER, &gift), Role::Owner);
        assert_eq!(Role::derive(GIFTER_A, &gift), Role::Gifter);

        let reserved = apply(&gift, &GiftAction::Reserve, GIFTER_A, 0).unwrap();
        assert_eq!(Role::derive(GIFTER_A, &reserved), Role::CurrentReserver);
        assert_eq!(Role::derive(GIFTER_B, &reserved), Role::Gifter);

        let purchased = apply(&reserved, &GiftAction::Purchase, GIFTER_A, 0).unwrap();
        assert_eq!(Role::derive(GIFTER_A, &purchased), Role::CurrentPurchaser);
    }

    #[test]
    fn test_owner_never_sees_reserve_or_purchase() {
        let actions = allowed_actions(OWNER, &published_gift());
        assert!(!actions.contains(&ActionKind::Reserve));
        assert!(!actions.contains(&ActionKind::Purchase));
        assert!(actions.contains(&ActionKind::Unpublish));
        assert!(actions.contains(&ActionKind::Update));
        assert!(actions.contains(&ActionKind::Archive));
        assert!(actions.contains(&ActionKind::Delete));
    }

    #[test]
    fn test_gifter_sees_reserve_only_when_published_and_available() {
        assert!(allowed_actions(GIFTER_A, &published_gift()).contains(&ActionKind::Reserve));

        let draft = GiftRecord::new("wl-1", OWNER, "Draft");
        assert!(allowed_actions(GIFTER_A, &draft).is_empty());
    }

    #[test]
    fn test_reserver_sees_release_and_purchase() {
        let reserved = apply(&published_gift(), &GiftAction::Reserve, GIFTER_A, 0).unwrap();
        let actions = allowed_actions(GIFTER_A, &reserved);
        assert!(actions.contains(&ActionKind::Release));
        assert!(actions.contains(&ActionKind::Purchase));
    }

    #[test]
    fn test_other_viewer_of_reserved_gift_is_locked_out() {
        let reserved = apply(&published_gift(), &GiftAction::Reserve, GIFTER_A, 0).unwrap();
        assert!(allowed_actions(GIFTER_B, &reserved).is_empty());
    }

    #[test]
    fn test_owner_of_purchased_gift_sees_confirm_receipt() {
        let reserved = apply(&published_gift(), &GiftAction::Reserve, GIFTER_A, 0).unwrap();
        let purchased = apply(&reserved, &GiftAction::Purchase, GIFTER_A, 0).unwrap();

        let actions = allowed_actions(OWNER, &purchased);
        assert!(actions.contains(&ActionKind::ConfirmReceipt));
        assert!(!actions.contains(&ActionKind::Publish));
        assert!(!actions.contains(&ActionKind::Unpublish));
    }

    #[test]
    fn test_archived_gift_offers_owner_only_delete() {
        let archived = apply(&published_gift(), &GiftAction::Archive, OWNER, 0).unwrap();
        assert_eq!(allowed_actions(OWNER, &archived), vec![ActionKind::Delete]);
        assert!(allowed_actions(GIFTER_A, &archived).is_empty());
    }
}
