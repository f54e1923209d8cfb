//! Run configuration and up-front validation.

use crate::core::{SlideId, SlotAssignment};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Invalid run configuration, surfaced at `run` entry before any device
/// call is issued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("slide id {0} appears more than once in the batch")]
    DuplicateSlideId(SlideId),

    #[error("slot override references slide {0}, which is not in the batch")]
    UnassignedOverride(SlideId),
}

/// Configuration for one orchestrator run.
///
/// Carries the wash budget, the default slot assignment, and optional
/// per-slide slot overrides. The budget is unsigned, so the "negative
/// max_wash_loops" misconfiguration cannot be expressed; zero is valid and
/// means one evaluation attempt with no retry.
///
/// # Example
///
/// ```rust
/// use slideflow::core::{SlideId, SlotAssignment};
/// use slideflow::orchestrator::RunConfig;
///
/// let config = RunConfig::new(2, SlotAssignment::uniform(1))
///     .with_override(SlideId::new(4).unwrap(), SlotAssignment::uniform(3));
///
/// assert_eq!(config.max_wash_loops, 2);
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfig {
    /// Upper bound on wash retries per slide.
    pub max_wash_loops: u32,
    /// Default slot assignment for slides without an override.
    pub slots: SlotAssignment,
    /// Per-slide slot assignments overriding the default.
    pub overrides: BTreeMap<SlideId, SlotAssignment>,
}

impl RunConfig {
    pub fn new(max_wash_loops: u32, slots: SlotAssignment) -> Self {
        Self {
            max_wash_loops,
            slots,
            overrides: BTreeMap::new(),
        }
    }

    /// Assign dedicated slots to one slide.
    pub fn with_override(mut self, slide: SlideId, slots: SlotAssignment) -> Self {
        self.overrides.insert(slide, slots);
        self
    }

    /// The slot assignment a slide will use.
    pub fn slots_for(&self, slide: SlideId) -> SlotAssignment {
        self.overrides.get(&slide).copied().unwrap_or(self.slots)
    }

    /// Validate the configuration against a batch. Fail fast: no side
    /// effects have occurred when this returns an error.
    pub fn validate(&self, batch: &[SlideId]) -> Result<(), ConfigError> {
        let mut seen = BTreeSet::new();
        for &slide in batch {
            if !seen.insert(slide) {
                return Err(ConfigError::DuplicateSlideId(slide));
            }
        }
        for &slide in self.overrides.keys() {
            if !seen.contains(&slide) {
                return Err(ConfigError::UnassignedOverride(slide));
            }
        }
        Ok(())
    }
}
