//! Mutation Engine
//!
//! Optimistic execution of gift actions with rollback, plus the cancellable
//! grace window wrapping purchases.

mod grace;
mod mutation;

pub use grace::{GraceConfig, GraceCoordinator, GraceError, GraceHandle};
pub use mutation::{EngineError, InFlightPhase, MutationEngine};
