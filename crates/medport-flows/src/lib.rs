//! Medport flows
//!
//! The two flows that own the relationship record: clinic selection (which
//! establishes it) and the inactive-access guard (which polls a blocked
//! relationship until access clears and promotes the session).

pub mod guard;
pub mod selection;

pub use guard::{AccessGuard, GuardOutcome, GuardState, GuardTiming};
pub use selection::{Selection, SelectionFlow};
