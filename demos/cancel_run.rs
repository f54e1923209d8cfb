//! Cancellation Demo
//!
//! Demonstrates cooperative cancellation: a consumer watching the event
//! stream cancels the run as soon as the first slide finishes, and every
//! remaining slide is reported as aborted without further device calls.
//!
//! Run with: cargo run --example cancel_run

use slideflow::core::{SlideId, SlotAssignment};
use slideflow::device::sim::{SimArm, SimImaging, SimStation};
use slideflow::device::DeviceSuite;
use slideflow::event::{Event, FnSink};
use slideflow::orchestrator::{Orchestrator, RunConfig};
use slideflow::workflow::CancelToken;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("=== Cancellation Demo ===\n");

    let token = CancelToken::new();
    let watcher = token.clone();
    let sink = FnSink::new(move |event: Event| {
        println!("{:<24} {:?}", event.name, event.payload);
        if event.name == "workflow.slide_done" {
            println!("-- first slide done, cancelling the run --");
            watcher.cancel();
        }
    });

    let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), SimImaging::passing());
    let config = RunConfig::new(2, SlotAssignment::uniform(1));
    let mut orchestrator = Orchestrator::new(devices, sink, config).with_cancel_token(token);

    let batch: Vec<SlideId> = (1..=4).map(|id| SlideId::new(id).unwrap()).collect();
    let summary = orchestrator.run(&batch).expect("batch configuration is valid");

    println!("\n=== Summary ===");
    for report in &summary.slides {
        println!("slide {:<4} {}", report.slide_id.get(), report.outcome.label());
    }
}
