pub mod action;
pub mod gift;
pub mod policy;
pub mod transition;

pub use action::{ActionKind, GiftAction, GiftPatch};
pub use gift::{GiftPriority, GiftRecord, GiftStatus};
pub use policy::{Role, allowed_actions};
pub use transition::{TransitionError, apply};
