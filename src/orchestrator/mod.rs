//! The orchestrator driving slide workflows to completion.
//!
//! Owns the shared device handles, the event sink and the run
//! configuration, and processes a batch of slides strictly one at a time:
//! the three instruments are exclusive shared resources, so overlapping
//! workflows would need a per-device reservation scheme this crate does
//! not implement.
//!
//! A device fault aborts only the slide it happened on. The fault is
//! reported in that slide's summary entry and subsequent slides still run.

mod config;
mod summary;

pub use config::{ConfigError, RunConfig};
pub use summary::{Outcome, RunSummary, SlideReport};

use crate::core::{Disposition, SlideId, SlideState};
use crate::device::{Arm, DeviceSuite, ImagingStation, LiquidHandler};
use crate::event::{Event, EventSink};
use crate::payload;
use crate::workflow::{CancelToken, SlideWorkflow};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome reason reported when the wash budget runs out without a
/// passing evaluation.
pub const QUALITY_EXHAUSTED: &str = "quality-exhausted";

/// Drives one or more slide workflows to a terminal state.
///
/// Generic over the three device contracts so simulated, real and
/// remote-backed devices are interchangeable.
///
/// # Example
///
/// ```rust
/// use slideflow::core::{SlideId, SlotAssignment};
/// use slideflow::device::sim::{SimArm, SimImaging, SimStation};
/// use slideflow::device::DeviceSuite;
/// use slideflow::event::MemorySink;
/// use slideflow::orchestrator::{Orchestrator, RunConfig};
///
/// let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), SimImaging::passing());
/// let sink = MemorySink::new();
/// let config = RunConfig::new(2, SlotAssignment::uniform(1));
/// let mut orchestrator = Orchestrator::new(devices, sink.clone(), config);
///
/// let batch = [SlideId::new(1).unwrap(), SlideId::new(2).unwrap()];
/// let summary = orchestrator.run(&batch).unwrap();
///
/// assert_eq!(summary.ok_count(), 2);
/// assert_eq!(sink.count("workflow.slide_done"), 2);
/// ```
pub struct Orchestrator<A, L, I> {
    devices: DeviceSuite<A, L, I>,
    sink: Box<dyn EventSink>,
    config: RunConfig,
    cancel: CancelToken,
}

impl<A: Arm, L: LiquidHandler, I: ImagingStation> Orchestrator<A, L, I> {
    pub fn new(
        devices: DeviceSuite<A, L, I>,
        sink: impl EventSink + 'static,
        config: RunConfig,
    ) -> Self {
        Self {
            devices,
            sink: Box::new(sink),
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Install a cancellation token shared with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle to this orchestrator's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// The device handles, for inspection after a run.
    pub fn devices(&self) -> &DeviceSuite<A, L, I> {
        &self.devices
    }

    /// Process the batch, in input order, one slide at a time.
    ///
    /// Validates configuration and batch up front; a [`ConfigError`] is
    /// returned before any device call or event. Otherwise every slide
    /// gets a summary entry, whatever happened to it, and the returned
    /// reports are in batch order.
    pub fn run(&mut self, slide_ids: &[SlideId]) -> Result<RunSummary, ConfigError> {
        self.config.validate(slide_ids)?;

        let run_id = Uuid::new_v4();
        info!(run = %run_id, slides = slide_ids.len(), "run started");
        self.sink.emit(Event::new(
            "workflow.start",
            payload! {
                "run" => run_id.to_string(),
                "slides" => slide_ids.iter().map(SlideId::get).collect::<Vec<_>>(),
                "max_wash_loops" => self.config.max_wash_loops,
            },
        ));

        let mut slides = Vec::with_capacity(slide_ids.len());
        for &slide in slide_ids {
            let report = self.run_slide(slide);
            self.sink.emit(Event::new(
                "workflow.slide_done",
                payload! {
                    "slide" => slide.get(),
                    "outcome" => report.outcome.label(),
                    "loops" => report.wash_loops,
                },
            ));
            slides.push(report);
        }

        self.sink.emit(Event::new(
            "workflow.complete",
            payload! { "run" => run_id.to_string() },
        ));
        info!(run = %run_id, "run complete");

        Ok(RunSummary { run_id, slides })
    }

    /// Drive one slide to a terminal state or a reported failure.
    fn run_slide(&mut self, slide: SlideId) -> SlideReport {
        let slots = self.config.slots_for(slide);
        let mut workflow = SlideWorkflow::new(slide, slots, self.config.max_wash_loops);

        loop {
            if self.cancel.is_cancelled() {
                workflow.abort();
                self.sink.emit(Event::new(
                    "workflow.slide_aborted",
                    payload! { "slide" => slide.get(), "loops" => workflow.wash_loops() },
                ));
                return SlideReport {
                    slide_id: slide,
                    outcome: Outcome::Aborted,
                    wash_loops: workflow.wash_loops(),
                };
            }

            match workflow.step(&mut self.devices, self.sink.as_ref()) {
                Ok(state) if state.is_terminal() => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(slide = %slide, error = %err, "device fault, slide abandoned");
                    self.sink.emit(Event::new(
                        "workflow.slide_failed",
                        payload! {
                            "slide" => slide.get(),
                            "reason" => err.to_string(),
                            "loops" => workflow.wash_loops(),
                        },
                    ));
                    return SlideReport {
                        slide_id: slide,
                        outcome: Outcome::Failed {
                            reason: err.to_string(),
                        },
                        wash_loops: workflow.wash_loops(),
                    };
                }
            }
        }

        let outcome = match workflow.state() {
            SlideState::DroppedOff(Disposition::Passed) => Outcome::Ok,
            SlideState::DroppedOff(Disposition::Failed) => Outcome::Failed {
                reason: QUALITY_EXHAUSTED.to_string(),
            },
            // The drive loop exits only on terminal states.
            _ => Outcome::Aborted,
        };

        SlideReport {
            slide_id: slide,
            outcome,
            wash_loops: workflow.wash_loops(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SlotAssignment;
    use crate::device::sim::{SimArm, SimImaging, SimStation};
    use crate::event::{FnSink, MemorySink};

    fn slide(id: u32) -> SlideId {
        SlideId::new(id).unwrap()
    }

    fn orchestrator(
        imaging: SimImaging,
        sink: MemorySink,
        max_wash_loops: u32,
    ) -> Orchestrator<SimArm, SimStation, SimImaging> {
        let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), imaging);
        Orchestrator::new(
            devices,
            sink,
            RunConfig::new(max_wash_loops, SlotAssignment::uniform(1)),
        )
    }

    #[test]
    fn two_slide_scenario_with_recovery() {
        // Slide 1 evaluates [false, false, true], slide 2 [true].
        let sink = MemorySink::new();
        let mut orch = orchestrator(
            SimImaging::scripted(vec![false, false, true, true]),
            sink.clone(),
            2,
        );

        let summary = orch.run(&[slide(1), slide(2)]).unwrap();

        let first = summary.report_for(slide(1)).unwrap();
        assert_eq!(first.outcome, Outcome::Ok);
        assert_eq!(first.wash_loops, 2);

        let second = summary.report_for(slide(2)).unwrap();
        assert_eq!(second.outcome, Outcome::Ok);
        assert_eq!(second.wash_loops, 0);

        assert_eq!(orch.devices().imaging.evaluations(), 4);
        assert_eq!(orch.devices().station.wash_count(), 2);
        assert_eq!(sink.count("station.wash"), 2);
    }

    #[test]
    fn zero_budget_single_failure() {
        let sink = MemorySink::new();
        let mut orch = orchestrator(SimImaging::with_script(vec![false], false), sink.clone(), 0);

        let summary = orch.run(&[slide(5)]).unwrap();

        let report = summary.report_for(slide(5)).unwrap();
        assert_eq!(
            report.outcome,
            Outcome::Failed {
                reason: QUALITY_EXHAUSTED.to_string()
            }
        );
        assert_eq!(report.wash_loops, 0);
        assert_eq!(sink.count("arm.to_dropoff"), 1);
        assert_eq!(sink.count("station.wash"), 0);
    }

    #[test]
    fn duplicate_slide_ids_fail_fast() {
        let sink = MemorySink::new();
        let mut orch = orchestrator(SimImaging::passing(), sink.clone(), 2);

        let err = orch.run(&[slide(1), slide(1)]).unwrap_err();

        assert_eq!(err, ConfigError::DuplicateSlideId(slide(1)));
        // Fail fast: no events, no device calls.
        assert!(sink.events().is_empty());
        assert!(orch.devices().arm.calls().is_empty());
    }

    #[test]
    fn device_fault_does_not_stop_the_batch() {
        let sink = MemorySink::new();
        let devices = {
            let mut station = SimStation::new();
            station.fail_staining_for(slide(2));
            DeviceSuite::new(SimArm::new(), station, SimImaging::passing())
        };
        let mut orch = Orchestrator::new(
            devices,
            sink.clone(),
            RunConfig::new(2, SlotAssignment::uniform(1)),
        );

        let summary = orch.run(&[slide(1), slide(2), slide(3)]).unwrap();

        let ids: Vec<_> = summary.slides.iter().map(|r| r.slide_id).collect();
        assert_eq!(ids, vec![slide(1), slide(2), slide(3)]);
        assert!(summary.report_for(slide(1)).unwrap().outcome.is_ok());
        assert!(summary.report_for(slide(3)).unwrap().outcome.is_ok());
        assert!(matches!(
            summary.report_for(slide(2)).unwrap().outcome,
            Outcome::Failed { ref reason } if reason.contains("run_staining")
        ));
        assert_eq!(sink.count("workflow.slide_failed"), 1);
        assert_eq!(sink.count("workflow.slide_done"), 3);
    }

    #[test]
    fn invalid_evaluation_response_fails_the_slide() {
        let sink = MemorySink::new();
        let mut imaging = SimImaging::passing();
        imaging.invalid_response_for(slide(1));
        let mut orch = orchestrator(imaging, sink.clone(), 2);

        let summary = orch.run(&[slide(1), slide(2)]).unwrap();

        assert!(matches!(
            summary.report_for(slide(1)).unwrap().outcome,
            Outcome::Failed { ref reason } if reason.contains("contract")
        ));
        assert!(summary.report_for(slide(2)).unwrap().outcome.is_ok());
    }

    #[test]
    fn identical_runs_emit_identical_event_sequences() {
        let run = || {
            let sink = MemorySink::new();
            let mut orch = orchestrator(
                SimImaging::scripted(vec![false, true, true]),
                sink.clone(),
                1,
            );
            let summary = orch.run(&[slide(1), slide(2)]).unwrap();
            let signatures: Vec<_> = sink.events().iter().map(|e| e.signature()).collect();
            (signatures, summary.slides)
        };

        let (events_a, slides_a) = run();
        let (events_b, slides_b) = run();

        assert_eq!(events_a, events_b);
        assert_eq!(slides_a, slides_b);
    }

    #[test]
    fn cancellation_aborts_remaining_slides() {
        let sink = MemorySink::new();
        let token = CancelToken::new();

        // Cancel as soon as the first slide finishes.
        let sink_inner = sink.clone();
        let cancel_after_first = {
            let token = token.clone();
            FnSink::new(move |event: Event| {
                if event.name == "workflow.slide_done" {
                    token.cancel();
                }
                sink_inner.emit(event);
            })
        };

        let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), SimImaging::passing());
        let mut orch = Orchestrator::new(
            devices,
            cancel_after_first,
            RunConfig::new(2, SlotAssignment::uniform(1)),
        )
        .with_cancel_token(token);

        let summary = orch.run(&[slide(1), slide(2), slide(3)]).unwrap();

        assert!(summary.report_for(slide(1)).unwrap().outcome.is_ok());
        assert_eq!(summary.report_for(slide(2)).unwrap().outcome, Outcome::Aborted);
        assert_eq!(summary.report_for(slide(3)).unwrap().outcome, Outcome::Aborted);
        // Aborted slides issue no device calls: only slide 1's pickup ran.
        assert_eq!(orch.devices().arm.count("move_to_pickup"), 1);
        assert_eq!(sink.count("workflow.slide_aborted"), 2);
    }

    #[test]
    fn empty_batch_yields_empty_summary() {
        let sink = MemorySink::new();
        let mut orch = orchestrator(SimImaging::passing(), sink.clone(), 2);

        let summary = orch.run(&[]).unwrap();

        assert!(summary.slides.is_empty());
        assert_eq!(sink.names(), vec!["workflow.start", "workflow.complete"]);
    }

    #[test]
    fn per_slide_slot_overrides_reach_the_devices() {
        let sink = MemorySink::new();
        let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), SimImaging::passing());
        let config = RunConfig::new(0, SlotAssignment::uniform(1))
            .with_override(slide(2), SlotAssignment::uniform(7));
        let mut orch = Orchestrator::new(devices, sink.clone(), config);

        orch.run(&[slide(1), slide(2)]).unwrap();

        let dropoffs: Vec<_> = sink
            .events()
            .iter()
            .filter(|e| e.name == "arm.to_dropoff")
            .map(|e| e.payload["slot"].clone())
            .collect();
        assert_eq!(dropoffs, vec![serde_json::json!(1), serde_json::json!(7)]);
    }
}
