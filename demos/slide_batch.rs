//! Slide Batch Demo
//!
//! Runs a batch of slides through the full workflow on simulated devices
//! and renders every emitted event to the console.
//!
//! Key concepts:
//! - Device contracts backed by simulated instruments
//! - The bounded wash-retry loop (the first slide needs two washes)
//! - Structured events as the only observability surface
//! - The per-slide run summary
//!
//! Run with: cargo run --example slide_batch -- [--loops N] [SLIDE_ID ...]

use slideflow::core::{SlideId, SlotAssignment};
use slideflow::device::sim::{SimArm, SimImaging, SimStation};
use slideflow::device::DeviceSuite;
use slideflow::event::{Event, FnSink};
use slideflow::orchestrator::{Orchestrator, RunConfig};

fn parse_args() -> (Vec<SlideId>, u32) {
    let mut slides = Vec::new();
    let mut loops = 2u32;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--loops" {
            loops = args
                .next()
                .and_then(|v| v.parse().ok())
                .expect("--loops needs a non-negative integer");
        } else {
            let id: u32 = arg.parse().expect("slide ids are positive integers");
            slides.push(SlideId::new(id).expect("slide ids are positive integers"));
        }
    }
    if slides.is_empty() {
        slides = (1..=4).map(|id| SlideId::new(id).unwrap()).collect();
    }
    (slides, loops)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let (slides, max_wash_loops) = parse_args();

    println!("=== Slide Batch Demo ===\n");
    println!("Slides: {:?}", slides.iter().map(|s| s.get()).collect::<Vec<_>>());
    println!("Max wash loops: {max_wash_loops}\n");

    let console = FnSink::new(|event: Event| {
        let station = event.device().to_uppercase();
        let payload = serde_json::to_string(&event.payload).unwrap_or_default();
        println!("[{station:<10}] {:<24} {payload}", event.name);
    });

    // The first slide fails evaluation twice before passing; the rest pass
    // on the first attempt.
    let imaging = SimImaging::scripted(vec![false, false, true]);
    let devices = DeviceSuite::new(SimArm::new(), SimStation::new(), imaging);

    let config = RunConfig::new(max_wash_loops, SlotAssignment::uniform(1));
    let mut orchestrator = Orchestrator::new(devices, console, config);

    let summary = orchestrator.run(&slides).expect("batch configuration is valid");

    println!("\n=== Summary (run {}) ===", summary.run_id);
    for report in &summary.slides {
        println!(
            "slide {:<4} {:<8} wash loops: {}",
            report.slide_id.get(),
            report.outcome.label(),
            report.wash_loops
        );
    }
    println!(
        "\n{} ok, {} failed",
        summary.ok_count(),
        summary.failed_count()
    );
}
