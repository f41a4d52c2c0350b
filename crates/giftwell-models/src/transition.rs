//! Gift Status State Machine
//!
//! Guarded transitions over [`GiftStatus`]. `apply` is pure: it validates the
//! action against the current record and the acting identity, and returns the
//! post-transition record or a typed rejection. An action attempted from the
//! wrong source state or by the wrong actor is always rejected, never coerced.

use thiserror::Error;

use crate::action::{ActionKind, GiftAction};
use crate::gift::{GiftRecord, GiftStatus};

/// Why a transition was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("cannot {action} a gift that is {actual}")]
    WrongState {
        action: ActionKind,
        actual: GiftStatus,
    },

    #[error("actor is not permitted to {action} this gift")]
    NotPermitted { action: ActionKind },

    #[error("gift is not published")]
    NotPublished,

    #[error("owners cannot reserve or purchase their own gifts")]
    SelfGifting,
}

fn wrong_state(action: &GiftAction, gift: &GiftRecord) -> TransitionError {
    TransitionError::WrongState {
        action: action.kind(),
        actual: gift.status,
    }
}

fn not_permitted(action: &GiftAction) -> TransitionError {
    TransitionError::NotPermitted {
        action: action.kind(),
    }
}

/// Apply `action` to `gift` on behalf of `actor`, producing the
/// post-transition record.
///
/// `now` is the timestamp (milliseconds) stamped onto the transition; callers
/// pass it in so predictions and tests are deterministic. For `Delete` the
/// guard is checked and the record is returned unchanged; removal itself is
/// the caller's concern.
pub fn apply(
    gift: &GiftRecord,
    action: &GiftAction,
    actor: &str,
    now: i64,
) -> Result<GiftRecord, TransitionError> {
    let is_owner = actor == gift.owner_id;
    let mut next = gift.clone();

    match action {
        GiftAction::Reserve => {
            if is_owner {
                return Err(TransitionError::SelfGifting);
            }
            if !gift.is_published {
                return Err(TransitionError::NotPublished);
            }
            if gift.status != GiftStatus::Available {
                return Err(wrong_state(action, gift));
            }
            next.status = GiftStatus::Reserved;
            next.reserved_by = Some(actor.to_string());
            next.reserved_at = Some(now);
        }
        GiftAction::Release => {
            if gift.status != GiftStatus::Reserved {
                return Err(wrong_state(action, gift));
            }
            // Owner override is allowed; otherwise only the current reserver.
            if !is_owner && gift.reserved_by.as_deref() != Some(actor) {
                return Err(not_permitted(action));
            }
            next.status = GiftStatus::Available;
            next.reserved_by = None;
            next.reserved_at = None;
        }
        GiftAction::Purchase => {
            if is_owner {
                return Err(TransitionError::SelfGifting);
            }
            // Purchase requires a prior reservation; Available -> Purchased
            // is rejected by the guard, not merely omitted from the UI.
            if gift.status != GiftStatus::Reserved {
                return Err(wrong_state(action, gift));
            }
            if gift.reserved_by.as_deref() != Some(actor) {
                return Err(not_permitted(action));
            }
            next.status = GiftStatus::Purchased;
            next.purchased_by = Some(actor.to_string());
            next.purchased_at = Some(now);
            next.reserved_by = None;
            next.reserved_at = None;
        }
        GiftAction::ConfirmReceipt => {
            if !is_owner {
                return Err(not_permitted(action));
            }
            if gift.status != GiftStatus::Purchased {
                return Err(wrong_state(action, gift));
            }
            next.status = GiftStatus::Received;
            next.received_at = Some(now);
        }
        GiftAction::Publish | GiftAction::Unpublish => {
            if !is_owner {
                return Err(not_permitted(action));
            }
            // Publication toggles only while the gift is unclaimed.
            if gift.status != GiftStatus::Available {
                return Err(wrong_state(action, gift));
            }
            next.is_published = matches!(action, GiftAction::Publish);
        }
        GiftAction::Update(patch) => {
            if !is_owner {
                return Err(not_permitted(action));
            }
            if gift.status.is_terminal() {
                return Err(wrong_state(action, gift));
            }
            patch.apply_to(&mut next);
        }
        GiftAction::Archive => {
            if !is_owner {
                return Err(not_permitted(action));
            }
            if gift.status.is_terminal() {
                return Err(wrong_state(action, gift));
            }
            next.status = GiftStatus::Archived;
            next.reserved_by = None;
            next.reserved_at = None;
            next.purchased_by = None;
            next.archived_at = Some(now);
        }
        GiftAction::Delete => {
            if !is_owner {
                return Err(not_permitted(action));
            }
        }
    }

    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::GiftPatch;

    const OWNER: &str = "owner-1";
    const GIFTER_A: &str = "gifter-a";
    const GIFTER_B: &str = "gifter-b";

    fn published_gift() -> GiftRecord {
        GiftRecord::new("wl-1", OWNER, "Record player").published()
    }

    fn reserved_gift(by: &str) -> GiftRecord {
        apply(&published_gift(), &GiftAction::Reserve, by, 1_000).unwrap()
    }

    #[test]
    fn test_reserve_sets_holder() {
        let gift = reserved_gift(GIFTER_A);
        assert_eq!(gift.status, GiftStatus::Reserved);
        assert_eq!(gift.reserved_by.as_deref(), Some(GIFTER_A));
        assert_eq!(gift.reserved_at, Some(1_000));
        assert!(gift.is_consistent());
    }

    #[test]
    fn test_owner_cannot_reserve_own_gift() {
        let err = apply(&published_gift(), &GiftAction::Reserve, OWNER, 0).unwrap_err();
        assert_eq!(err, TransitionError::SelfGifting);
    }

    #[test]
    fn test_unpublished_gift_cannot_be_reserved() {
        let gift = GiftRecord::new("wl-1", OWNER, "Draft");
        let err = apply(&gift, &GiftAction::Reserve, GIFTER_A, 0).unwrap_err();
        assert_eq!(err, TransitionError::NotPublished);
    }

    #[test]
    fn test_reserve_rejected_when_already_reserved() {
        let gift = reserved_gift(GIFTER_A);
        let err = apply(&gift, &GiftAction::Reserve, GIFTER_B, 0).unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn test_release_by_reserver_and_owner_override() {
        let gift = reserved_gift(GIFTER_A);

        let released = apply(&gift, &GiftAction::Release, GIFTER_A, 2_000).unwrap();
        assert_eq!(released.status, GiftStatus::Available);
        assert!(released.reserved_by.is_none());

        let overridden = apply(&gift, &GiftAction::Release, OWNER, 2_000).unwrap();
        assert_eq!(overridden.status, GiftStatus::Available);
    }

    #[test]
    fn test_release_by_other_gifter_rejected() {
        let gift = reserved_gift(GIFTER_A);
        let err = apply(&gift, &GiftAction::Release, GIFTER_B, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));
    }

    #[test]
    fn test_purchase_requires_prior_reservation() {
        // Available -> Purchased is disallowed directly, even for a gifter.
        let err = apply(&published_gift(), &GiftAction::Purchase, GIFTER_A, 0).unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn test_purchase_only_by_current_reserver() {
        let gift = reserved_gift(GIFTER_A);

        let err = apply(&gift, &GiftAction::Purchase, GIFTER_B, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));

        let purchased = apply(&gift, &GiftAction::Purchase, GIFTER_A, 3_000).unwrap();
        assert_eq!(purchased.status, GiftStatus::Purchased);
        assert_eq!(purchased.purchased_by.as_deref(), Some(GIFTER_A));
        assert!(purchased.reserved_by.is_none());
        assert!(purchased.is_consistent());
    }

    #[test]
    fn test_confirm_receipt_owner_only() {
        let gift = reserved_gift(GIFTER_A);
        let purchased = apply(&gift, &GiftAction::Purchase, GIFTER_A, 0).unwrap();

        let err = apply(&purchased, &GiftAction::ConfirmReceipt, GIFTER_A, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));

        let received = apply(&purchased, &GiftAction::ConfirmReceipt, OWNER, 4_000).unwrap();
        assert_eq!(received.status, GiftStatus::Received);
        assert_eq!(received.received_at, Some(4_000));
    }

    #[test]
    fn test_received_is_terminal() {
        let gift = reserved_gift(GIFTER_A);
        let purchased = apply(&gift, &GiftAction::Purchase, GIFTER_A, 0).unwrap();
        let received = apply(&purchased, &GiftAction::ConfirmReceipt, OWNER, 0).unwrap();

        let err = apply(&received, &GiftAction::Archive, OWNER, 0).unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn test_publish_toggle_only_while_available() {
        let draft = GiftRecord::new("wl-1", OWNER, "Draft");
        let published = apply(&draft, &GiftAction::Publish, OWNER, 0).unwrap();
        assert!(published.is_published);

        let err = apply(&draft, &GiftAction::Publish, GIFTER_A, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));

        let reserved = reserved_gift(GIFTER_A);
        let err = apply(&reserved, &GiftAction::Unpublish, OWNER, 0).unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn test_archive_clears_holders() {
        let gift = reserved_gift(GIFTER_A);
        let archived = apply(&gift, &GiftAction::Archive, OWNER, 5_000).unwrap();
        assert_eq!(archived.status, GiftStatus::Archived);
        assert!(archived.reserved_by.is_none());
        assert!(archived.is_consistent());
    }

    #[test]
    fn test_update_owner_only_and_not_terminal() {
        let gift = published_gift();
        let patch = GiftPatch {
            title: Some("Better title".to_string()),
            ..Default::default()
        };

        let err = apply(&gift, &GiftAction::Update(patch.clone()), GIFTER_A, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));

        let updated = apply(&gift, &GiftAction::Update(patch.clone()), OWNER, 0).unwrap();
        assert_eq!(updated.title, "Better title");

        let archived = apply(&gift, &GiftAction::Archive, OWNER, 0).unwrap();
        let err = apply(&archived, &GiftAction::Update(patch), OWNER, 0).unwrap_err();
        assert!(matches!(err, TransitionError::WrongState { .. }));
    }

    #[test]
    fn test_delete_owner_only() {
        let gift = published_gift();
        let err = apply(&gift, &GiftAction::Delete, GIFTER_A, 0).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));
        assert!(apply(&gift, &GiftAction::Delete, OWNER, 0).is_ok());
    }

    #[test]
    fn test_reserve_release_round_trip_preserves_fields() {
        let original = published_gift()
            .with_description("Blue, 33rpm")
            .with_estimated_price(199.0);

        let reserved = apply(&original, &GiftAction::Reserve, GIFTER_A, 1_000).unwrap();
        let released = apply(&reserved, &GiftAction::Release, GIFTER_A, 2_000).unwrap();

        assert_eq!(released.status, original.status);
        assert_eq!(released.reserved_by, original.reserved_by);
        assert_eq!(released.purchased_by, original.purchased_by);
        assert_eq!(released.title, original.title);
        assert_eq!(released.description, original.description);
        assert_eq!(released.estimated_price, original.estimated_price);
        assert_eq!(released.is_published, original.is_published);
        assert_eq!(released.priority, original.priority);
        // Only timestamps may differ.
        assert_ne!(released.updated_at, original.updated_at);
    }
}
