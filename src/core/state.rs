//! Per-slide workflow states.
//!
//! States are immutable values describing where a slide currently is in its
//! lifecycle. All methods here are pure - inspection only, no side effects.

use serde::{Deserialize, Serialize};

/// How a slide left the workflow at drop-off.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Disposition {
    /// Quality evaluation passed and a full scan was captured.
    Passed,
    /// The wash budget was exhausted without a passing evaluation.
    Failed,
}

/// State of one slide's workflow.
///
/// The lifecycle runs `NotStarted → PickedUp → AtStation → AtImaging`,
/// then loops through `Washing` back to `AtImaging` while evaluations fail
/// and wash budget remains, and finally reaches `Scanning` (on a passing
/// evaluation) or `Discarding` (budget exhausted) before the terminal
/// `DroppedOff` state. `Aborted` is the terminal state for cooperative
/// cancellation.
///
/// # Example
///
/// ```rust
/// use slideflow::core::{Disposition, SlideState};
///
/// let state = SlideState::DroppedOff(Disposition::Passed);
/// assert!(state.is_terminal());
/// assert!(!state.is_failure());
///
/// let state = SlideState::AtImaging;
/// assert!(!state.is_terminal());
/// assert_eq!(state.name(), "AtImaging");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SlideState {
    /// Waiting in the pickup rack.
    NotStarted,
    /// Held by the arm gripper, en route to the station.
    PickedUp,
    /// In the liquid-handling station for staining.
    AtStation,
    /// Under the imaging unit for safety check and evaluation.
    AtImaging,
    /// Back in the station for a wash cycle after a failed evaluation.
    Washing,
    /// Evaluation passed; full scan in progress, then drop-off.
    Scanning,
    /// Wash budget exhausted; routing to drop-off as failed.
    Discarding,
    /// In the drop-off rack. Terminal.
    DroppedOff(Disposition),
    /// Cancelled between steps. Terminal.
    Aborted,
}

impl SlideState {
    /// The state's name for events and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "NotStarted",
            Self::PickedUp => "PickedUp",
            Self::AtStation => "AtStation",
            Self::AtImaging => "AtImaging",
            Self::Washing => "Washing",
            Self::Scanning => "Scanning",
            Self::Discarding => "Discarding",
            Self::DroppedOff(Disposition::Passed) => "DroppedOff(ok)",
            Self::DroppedOff(Disposition::Failed) => "DroppedOff(failed)",
            Self::Aborted => "Aborted",
        }
    }

    /// Whether this is a terminal state.
    ///
    /// No further device calls are issued for a slide once it is terminal,
    /// and terminal states are never re-entered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DroppedOff(_) | Self::Aborted)
    }

    /// Whether this state represents an unsuccessful end of the workflow.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DroppedOff(Disposition::Failed) | Self::Aborted)
    }
}
