//! Session Context
//!
//! The authenticated identity of the local viewer, supplied by the session
//! provider and passed explicitly into the engine and policy. There is no
//! module-level "current session": every component that needs the identity
//! receives it, so tests can inject arbitrary actors.

use serde::{Deserialize, Serialize};

/// Identity of the locally authenticated viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Actor ID issued by the identity provider
    pub actor_id: String,
}

impl SessionContext {
    /// Create a session for the given actor.
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
        }
    }
}
