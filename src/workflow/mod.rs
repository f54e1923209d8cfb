//! The per-slide workflow state machine.
//!
//! [`SlideWorkflow`] owns the lifecycle of one slide from pickup through
//! drop-off, including the bounded wash-retry loop. Each call to [`step`]
//! executes exactly one state's action block against the shared devices,
//! emits one event per device call (after the call, before advancing), and
//! records the applied transition.
//!
//! [`step`]: SlideWorkflow::step

use crate::core::{
    Disposition, SlideId, SlideState, SlotAssignment, TransitionRecord, TransitionTrace,
};
use crate::device::{Arm, DeviceError, DeviceSuite, Handoff, ImagingStation, LiquidHandler};
use crate::event::{Event, EventSink, Payload};
use crate::payload;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative cancellation signal.
///
/// Clones share one flag. The orchestrator checks the token between steps;
/// once cancelled, in-flight slides move straight to `Aborted` without
/// issuing further device calls.
///
/// # Example
///
/// ```rust
/// use slideflow::workflow::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// State machine for one slide.
///
/// Owned by the orchestrator for the slide's lifetime and driven step by
/// step until [`SlideState::is_terminal`] holds. Invariants maintained:
///
/// - `wash_loops <= max_wash_loops` at all times
/// - terminal states are never re-entered
/// - every device call is followed by exactly one event before the
///   workflow advances
pub struct SlideWorkflow {
    slide: SlideId,
    state: SlideState,
    wash_loops: u32,
    max_wash_loops: u32,
    slots: SlotAssignment,
    trace: TransitionTrace,
}

impl SlideWorkflow {
    /// Create a workflow in `NotStarted` for the given slide.
    pub fn new(slide: SlideId, slots: SlotAssignment, max_wash_loops: u32) -> Self {
        Self {
            slide,
            state: SlideState::NotStarted,
            wash_loops: 0,
            max_wash_loops,
            slots,
            trace: TransitionTrace::new(),
        }
    }

    pub fn slide_id(&self) -> SlideId {
        self.slide
    }

    pub fn state(&self) -> SlideState {
        self.state
    }

    /// Washes performed so far. Never exceeds the configured budget.
    pub fn wash_loops(&self) -> u32 {
        self.wash_loops
    }

    /// Transitions applied so far.
    pub fn trace(&self) -> &TransitionTrace {
        &self.trace
    }

    /// Execute one state's action block and advance.
    ///
    /// Returns the state reached by this step. Calling `step` on a
    /// terminal workflow is a no-op. A [`DeviceError`] leaves the workflow
    /// in its pre-step state; the caller decides what to do with the slide
    /// (the orchestrator reports it as failed and moves on).
    pub fn step<A, L, I, S>(
        &mut self,
        devices: &mut DeviceSuite<A, L, I>,
        sink: &S,
    ) -> Result<SlideState, DeviceError>
    where
        A: Arm,
        L: LiquidHandler,
        I: ImagingStation,
        S: EventSink + ?Sized,
    {
        let slide = self.slide;
        match self.state {
            SlideState::NotStarted => {
                devices.arm.move_to_start()?;
                self.emit(sink, "arm.move_start", payload! { "slide" => slide.get() });
                devices.arm.move_to_pickup(self.slots.pickup)?;
                self.emit(
                    sink,
                    "arm.move_pickup",
                    payload! { "slide" => slide.get(), "slot" => self.slots.pickup.get() },
                );
                devices.arm.close_gripper()?;
                self.emit(sink, "arm.close_gripper", payload! { "slide" => slide.get() });
                self.advance(SlideState::PickedUp);
            }
            SlideState::PickedUp => {
                devices
                    .arm
                    .move_to_station(slide, self.slots.station, Handoff::Receive)?;
                self.emit(sink, "arm.to_station", self.handoff_payload(Handoff::Receive));
                devices.arm.open_gripper()?;
                self.emit(sink, "arm.open_gripper", payload! { "slide" => slide.get() });
                devices.arm.move_to_safety()?;
                self.emit(sink, "arm.safety", payload! { "slide" => slide.get() });
                self.advance(SlideState::AtStation);
            }
            SlideState::AtStation => {
                devices.station.run_staining(slide, self.slots.station)?;
                self.emit(
                    sink,
                    "station.stain",
                    payload! { "slide" => slide.get(), "slot" => self.slots.station.get() },
                );
                devices.arm.move_to_imaging(slide, Handoff::Deliver)?;
                self.emit(
                    sink,
                    "arm.to_imaging",
                    payload! { "slide" => slide.get(), "handoff" => Handoff::Deliver.as_str() },
                );
                self.advance(SlideState::AtImaging);
            }
            SlideState::AtImaging => {
                devices.imaging.safety()?;
                self.emit(sink, "imaging.safety", payload! { "slide" => slide.get() });
                let ok = devices.imaging.evaluate(slide)?;
                self.emit(
                    sink,
                    "imaging.evaluate",
                    payload! { "slide" => slide.get(), "ok" => ok, "loops" => self.wash_loops },
                );
                if ok {
                    self.advance(SlideState::Scanning);
                } else if self.wash_loops < self.max_wash_loops {
                    self.wash_loops += 1;
                    self.advance(SlideState::Washing);
                } else {
                    // Wash budget exhausted. Expected outcome, not an
                    // error; the slide is still routed to drop-off.
                    self.advance(SlideState::Discarding);
                }
            }
            SlideState::Washing => {
                devices
                    .arm
                    .move_to_station(slide, self.slots.station, Handoff::Rewash)?;
                self.emit(sink, "arm.to_station", self.handoff_payload(Handoff::Rewash));
                devices.station.run_washing(slide, self.slots.station)?;
                self.emit(
                    sink,
                    "station.wash",
                    payload! {
                        "slide" => slide.get(),
                        "slot" => self.slots.station.get(),
                        "loops" => self.wash_loops,
                    },
                );
                devices.arm.move_to_imaging(slide, Handoff::Redeliver)?;
                self.emit(
                    sink,
                    "arm.to_imaging",
                    payload! { "slide" => slide.get(), "handoff" => Handoff::Redeliver.as_str() },
                );
                self.advance(SlideState::AtImaging);
            }
            SlideState::Scanning => {
                devices.imaging.scan(slide)?;
                self.emit(sink, "imaging.scan", payload! { "slide" => slide.get() });
                devices.arm.move_to_dropoff(slide, self.slots.dropoff)?;
                self.emit(
                    sink,
                    "arm.to_dropoff",
                    payload! { "slide" => slide.get(), "slot" => self.slots.dropoff.get() },
                );
                self.advance(SlideState::DroppedOff(Disposition::Passed));
            }
            SlideState::Discarding => {
                devices.arm.move_to_dropoff(slide, self.slots.dropoff)?;
                self.emit(
                    sink,
                    "arm.to_dropoff",
                    payload! {
                        "slide" => slide.get(),
                        "slot" => self.slots.dropoff.get(),
                        "reason" => "quality-exhausted",
                    },
                );
                self.advance(SlideState::DroppedOff(Disposition::Failed));
            }
            SlideState::DroppedOff(_) | SlideState::Aborted => {}
        }
        Ok(self.state)
    }

    /// Move directly to `Aborted` without further device calls.
    ///
    /// No-op on a workflow that already reached a terminal state.
    pub fn abort(&mut self) {
        if !self.state.is_terminal() {
            self.advance(SlideState::Aborted);
        }
    }

    fn advance(&mut self, to: SlideState) {
        debug_assert!(!self.state.is_terminal(), "terminal states are never left");
        debug!(
            slide = %self.slide,
            from = self.state.name(),
            to = to.name(),
            loops = self.wash_loops,
            "transition"
        );
        self.trace = self.trace.record(TransitionRecord {
            from: self.state,
            to,
            at: Utc::now(),
            wash_loops: self.wash_loops,
        });
        self.state = to;
    }

    fn handoff_payload(&self, handoff: Handoff) -> Payload {
        payload! {
            "slide" => self.slide.get(),
            "slot" => self.slots.station.get(),
            "handoff" => handoff.as_str(),
        }
    }

    fn emit<S: EventSink + ?Sized>(&self, sink: &S, name: &str, payload: Payload) {
        sink.emit(Event::new(name, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::{SimArm, SimImaging, SimStation};
    use crate::event::MemorySink;

    fn slide(id: u32) -> SlideId {
        SlideId::new(id).unwrap()
    }

    fn suite(imaging: SimImaging) -> DeviceSuite<SimArm, SimStation, SimImaging> {
        DeviceSuite::new(SimArm::new(), SimStation::new(), imaging)
    }

    fn drive(
        workflow: &mut SlideWorkflow,
        devices: &mut DeviceSuite<SimArm, SimStation, SimImaging>,
        sink: &MemorySink,
    ) -> SlideState {
        while !workflow.state().is_terminal() {
            workflow.step(devices, sink).unwrap();
        }
        workflow.state()
    }

    #[test]
    fn happy_path_reaches_dropped_off_ok() {
        let mut devices = suite(SimImaging::passing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 2);

        let terminal = drive(&mut workflow, &mut devices, &sink);

        assert_eq!(terminal, SlideState::DroppedOff(Disposition::Passed));
        assert_eq!(workflow.wash_loops(), 0);
        assert_eq!(
            sink.names(),
            vec![
                "arm.move_start",
                "arm.move_pickup",
                "arm.close_gripper",
                "arm.to_station",
                "arm.open_gripper",
                "arm.safety",
                "station.stain",
                "arm.to_imaging",
                "imaging.safety",
                "imaging.evaluate",
                "imaging.scan",
                "arm.to_dropoff",
            ]
        );
    }

    #[test]
    fn failed_evaluations_loop_until_budget_exhausted() {
        let mut devices = suite(SimImaging::failing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 2);

        let terminal = drive(&mut workflow, &mut devices, &sink);

        assert_eq!(terminal, SlideState::DroppedOff(Disposition::Failed));
        assert_eq!(workflow.wash_loops(), 2);
        assert_eq!(devices.station.wash_count(), 2);
        assert_eq!(devices.imaging.evaluations(), 3);
        // Failed slides are still dropped off, never left in an instrument.
        assert_eq!(devices.arm.count("move_to_dropoff"), 1);
        assert_eq!(sink.count("imaging.scan"), 0);
    }

    #[test]
    fn zero_wash_budget_fails_after_one_evaluation() {
        let mut devices = suite(SimImaging::failing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(5), SlotAssignment::uniform(1), 0);

        let terminal = drive(&mut workflow, &mut devices, &sink);

        assert_eq!(terminal, SlideState::DroppedOff(Disposition::Failed));
        assert_eq!(workflow.wash_loops(), 0);
        assert_eq!(devices.imaging.evaluations(), 1);
        assert_eq!(devices.station.wash_count(), 0);
        assert_eq!(sink.count("arm.to_dropoff"), 1);
    }

    #[test]
    fn recovery_after_washes_reaches_ok() {
        let mut devices = suite(SimImaging::scripted(vec![false, false, true]));
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 2);

        let terminal = drive(&mut workflow, &mut devices, &sink);

        assert_eq!(terminal, SlideState::DroppedOff(Disposition::Passed));
        assert_eq!(workflow.wash_loops(), 2);
        assert_eq!(devices.imaging.evaluations(), 3);
        assert_eq!(devices.station.wash_count(), 2);
        assert_eq!(sink.count("imaging.scan"), 1);
    }

    #[test]
    fn step_on_terminal_state_is_noop() {
        let mut devices = suite(SimImaging::passing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 0);
        drive(&mut workflow, &mut devices, &sink);

        let calls_before = devices.arm.calls().len();
        let events_before = sink.events().len();

        let state = workflow.step(&mut devices, &sink).unwrap();

        assert!(state.is_terminal());
        assert_eq!(devices.arm.calls().len(), calls_before);
        assert_eq!(sink.events().len(), events_before);
    }

    #[test]
    fn device_fault_leaves_state_unchanged() {
        let mut devices = suite(SimImaging::passing());
        devices.station.fail_staining_for(slide(1));
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 2);

        // Advance up to the staining step.
        workflow.step(&mut devices, &sink).unwrap();
        workflow.step(&mut devices, &sink).unwrap();
        assert_eq!(workflow.state(), SlideState::AtStation);

        let err = workflow.step(&mut devices, &sink).unwrap_err();
        assert!(matches!(err, DeviceError::Fault { .. }));
        assert_eq!(workflow.state(), SlideState::AtStation);
    }

    #[test]
    fn abort_moves_to_aborted_without_device_calls() {
        let mut devices = suite(SimImaging::passing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 2);
        workflow.step(&mut devices, &sink).unwrap();

        let calls_before = devices.arm.calls().len();
        workflow.abort();

        assert_eq!(workflow.state(), SlideState::Aborted);
        assert_eq!(devices.arm.calls().len(), calls_before);
        assert_eq!(workflow.trace().last().unwrap().to, SlideState::Aborted);
    }

    #[test]
    fn trace_path_starts_at_not_started() {
        let mut devices = suite(SimImaging::passing());
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 0);
        drive(&mut workflow, &mut devices, &sink);

        let path = workflow.trace().path();
        assert_eq!(path.first(), Some(&SlideState::NotStarted));
        assert_eq!(
            path.last(),
            Some(&SlideState::DroppedOff(Disposition::Passed))
        );
    }

    #[test]
    fn evaluate_event_carries_loop_count() {
        let mut devices = suite(SimImaging::scripted(vec![false, true]));
        let sink = MemorySink::new();
        let mut workflow = SlideWorkflow::new(slide(1), SlotAssignment::uniform(1), 1);
        drive(&mut workflow, &mut devices, &sink);

        let loops: Vec<_> = sink
            .events()
            .iter()
            .filter(|e| e.name == "imaging.evaluate")
            .map(|e| e.payload["loops"].clone())
            .collect();
        assert_eq!(loops, vec![serde_json::json!(0), serde_json::json!(1)]);
    }
}
