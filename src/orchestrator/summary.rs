//! Run summaries.

use crate::core::SlideId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Final outcome of one slide's workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Evaluation passed and the slide was scanned and dropped off.
    Ok,
    /// The slide was dropped off without a scan. Covers both quality
    /// exhaustion (`reason == "quality-exhausted"`) and device faults.
    Failed { reason: String },
    /// The run was cancelled before the slide finished.
    Aborted,
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Short label used in events and console output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Failed { .. } => "failed",
            Self::Aborted => "aborted",
        }
    }
}

/// Per-slide entry in a run summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideReport {
    pub slide_id: SlideId,
    pub outcome: Outcome,
    /// Wash loops performed; equals the configured budget when the outcome
    /// is quality exhaustion.
    pub wash_loops: u32,
}

/// Result of a full orchestrator run: one report per input slide, in input
/// order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifier of this run.
    pub run_id: Uuid,
    pub slides: Vec<SlideReport>,
}

impl RunSummary {
    /// The report for a given slide, if it was part of the batch.
    pub fn report_for(&self, slide: SlideId) -> Option<&SlideReport> {
        self.slides.iter().find(|r| r.slide_id == slide)
    }

    /// Number of slides that finished with [`Outcome::Ok`].
    pub fn ok_count(&self) -> usize {
        self.slides.iter().filter(|r| r.outcome.is_ok()).count()
    }

    /// Number of slides that did not finish with [`Outcome::Ok`].
    pub fn failed_count(&self) -> usize {
        self.slides.len() - self.ok_count()
    }
}
