//! Slideflow: a slide-processing workflow orchestrator.
//!
//! Slideflow sequences one slide at a time across three instruments - a
//! transfer arm, a liquid-handling station and an imaging unit - enforcing
//! a bounded quality-control wash loop and reporting every operation as a
//! structured event.
//!
//! # Core Concepts
//!
//! - **Device contracts**: [`device::Arm`], [`device::LiquidHandler`] and
//!   [`device::ImagingStation`] model the instruments as blocking
//!   operations; simulated, real and remote-backed implementations are
//!   interchangeable.
//! - **Slide workflow**: [`workflow::SlideWorkflow`] is the per-slide
//!   state machine, from pickup through the wash-retry loop to drop-off.
//! - **Events**: every device call produces one [`event::Event`] pushed
//!   into an [`event::EventSink`], in operation order per slide.
//! - **Orchestrator**: [`orchestrator::Orchestrator`] owns the devices and
//!   configuration and drives a batch to a per-slide summary.
//!
//! # Example
//!
//! ```rust
//! use slideflow::core::{SlideId, SlotAssignment};
//! use slideflow::device::sim::{SimArm, SimImaging, SimStation};
//! use slideflow::device::DeviceSuite;
//! use slideflow::event::MemorySink;
//! use slideflow::orchestrator::{Orchestrator, RunConfig};
//!
//! // Slide 1 needs one wash before it passes evaluation.
//! let imaging = SimImaging::scripted(vec![false, true]);
//! let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), imaging);
//! let sink = MemorySink::new();
//!
//! let config = RunConfig::new(2, SlotAssignment::uniform(1));
//! let mut orchestrator = Orchestrator::new(devices, sink.clone(), config);
//!
//! let summary = orchestrator.run(&[SlideId::new(1).unwrap()]).unwrap();
//!
//! assert_eq!(summary.ok_count(), 1);
//! assert_eq!(summary.slides[0].wash_loops, 1);
//! assert_eq!(sink.count("station.wash"), 1);
//! ```

pub mod core;
pub mod device;
pub mod event;
pub mod orchestrator;
pub mod workflow;

// Re-export commonly used types
pub use self::core::{Disposition, SlideId, SlideState, Slot, SlotAssignment};
pub use self::device::{Arm, DeviceError, DeviceSuite, Handoff, ImagingStation, LiquidHandler};
pub use self::event::{Event, EventSink};
pub use self::orchestrator::{
    ConfigError, Orchestrator, Outcome, RunConfig, RunSummary, SlideReport,
};
pub use self::workflow::{CancelToken, SlideWorkflow};
