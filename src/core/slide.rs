//! Slide and slot identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error constructing a [`SlideId`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("slide id must be a positive integer, got 0")]
    ZeroSlideId,
}

/// Opaque identifier for one slide, unique within an orchestrator run.
///
/// Slide ids are positive integers; zero is rejected at construction so a
/// `SlideId` in hand is always valid.
///
/// # Example
///
/// ```rust
/// use slideflow::core::SlideId;
///
/// let id = SlideId::new(7).unwrap();
/// assert_eq!(id.get(), 7);
/// assert!(SlideId::new(0).is_err());
/// ```
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SlideId(u32);

impl SlideId {
    /// Create a slide id, rejecting zero.
    pub fn new(id: u32) -> Result<Self, IdError> {
        if id == 0 {
            return Err(IdError::ZeroSlideId);
        }
        Ok(Self(id))
    }

    /// The raw integer value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical rack or instrument position.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(u32);

impl Slot {
    /// Create a slot identifier.
    pub fn new(slot: u32) -> Self {
        Self(slot)
    }

    /// The raw integer value.
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three slot positions one slide moves through.
///
/// A run configuration carries a default assignment; individual slides may
/// override it, so batches can span multiple rack positions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// Rack position the slide is picked up from.
    pub pickup: Slot,
    /// Station deck position used for staining and washing.
    pub station: Slot,
    /// Rack position the slide is dropped off to.
    pub dropoff: Slot,
}

impl SlotAssignment {
    /// Assignment with every position set to the same slot number.
    ///
    /// Matches the reference setup where all instruments use slot 1.
    pub fn uniform(slot: u32) -> Self {
        Self {
            pickup: Slot::new(slot),
            station: Slot::new(slot),
            dropoff: Slot::new(slot),
        }
    }
}
