//! In-memory record of applied state transitions.
//!
//! The trace is immutable - `record` returns a new trace with the
//! transition appended. Traces live only for the duration of a run;
//! nothing here is persisted.

use super::state::SlideState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a single applied transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// The state being transitioned from.
    pub from: SlideState,
    /// The state being transitioned to.
    pub to: SlideState,
    /// When the transition was applied.
    pub at: DateTime<Utc>,
    /// The slide's wash loop count at the moment of transition.
    pub wash_loops: u32,
}

/// Ordered trace of the transitions one slide went through.
///
/// # Example
///
/// ```rust
/// use slideflow::core::{SlideState, TransitionRecord, TransitionTrace};
/// use chrono::Utc;
///
/// let trace = TransitionTrace::new();
/// let trace = trace.record(TransitionRecord {
///     from: SlideState::NotStarted,
///     to: SlideState::PickedUp,
///     at: Utc::now(),
///     wash_loops: 0,
/// });
///
/// let path = trace.path();
/// assert_eq!(path, vec![SlideState::NotStarted, SlideState::PickedUp]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionTrace {
    records: Vec<TransitionRecord>,
}

impl TransitionTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition, returning a new trace.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// All recorded transitions, in application order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The sequence of states traversed: the first `from`, then every `to`.
    pub fn path(&self) -> Vec<SlideState> {
        let mut path = Vec::with_capacity(self.records.len() + 1);
        if let Some(first) = self.records.first() {
            path.push(first.from);
        }
        path.extend(self.records.iter().map(|r| r.to));
        path
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(from: SlideState, to: SlideState) -> TransitionRecord {
        TransitionRecord {
            from,
            to,
            at: Utc::now(),
            wash_loops: 0,
        }
    }

    #[test]
    fn empty_trace_has_empty_path() {
        let trace = TransitionTrace::new();
        assert!(trace.is_empty());
        assert!(trace.path().is_empty());
        assert!(trace.last().is_none());
    }

    #[test]
    fn record_does_not_mutate_original() {
        let trace = TransitionTrace::new();
        let extended = trace.record(record(SlideState::NotStarted, SlideState::PickedUp));

        assert_eq!(trace.len(), 0);
        assert_eq!(extended.len(), 1);
    }

    #[test]
    fn path_includes_initial_state() {
        let trace = TransitionTrace::new()
            .record(record(SlideState::NotStarted, SlideState::PickedUp))
            .record(record(SlideState::PickedUp, SlideState::AtStation));

        assert_eq!(
            trace.path(),
            vec![
                SlideState::NotStarted,
                SlideState::PickedUp,
                SlideState::AtStation
            ]
        );
    }

    #[test]
    fn last_returns_most_recent() {
        let trace = TransitionTrace::new()
            .record(record(SlideState::NotStarted, SlideState::PickedUp))
            .record(record(SlideState::PickedUp, SlideState::AtStation));

        assert_eq!(trace.last().unwrap().to, SlideState::AtStation);
    }
}
