//! Core domain types for the slide workflow.
//!
//! This module contains the pure part of the crate:
//! - Slide and slot identifiers
//! - The per-slide state enum
//! - Immutable transition traces
//!
//! Nothing here performs a device call or emits an event; all logic is
//! side-effect free.

mod slide;
mod state;
mod trace;

pub use slide::{IdError, SlideId, Slot, SlotAssignment};
pub use state::{Disposition, SlideState};
pub use trace::{TransitionRecord, TransitionTrace};
