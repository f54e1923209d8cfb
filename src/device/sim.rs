//! Simulated devices.
//!
//! Call-recording implementations of the device contracts, used by the
//! demos and the test suite. Each simulated device records every call it
//! receives, supports targeted fault injection, and the imaging unit runs
//! its evaluations from a configurable script so retry behavior is
//! deterministic.

use super::{Arm, DeviceError, Handoff, ImagingStation, LiquidHandler};
use crate::core::{SlideId, Slot};
use std::collections::VecDeque;

/// A fault armed on a simulated device.
///
/// Fires when the named action is called, optionally only for one slide so
/// a single bad slide can be injected into a batch.
#[derive(Clone, Debug)]
struct ArmedFault {
    action: &'static str,
    slide: Option<SlideId>,
}

impl ArmedFault {
    fn fires(&self, action: &'static str, slide: Option<SlideId>) -> bool {
        self.action == action && self.slide.map_or(true, |want| Some(want) == slide)
    }
}

/// Simulated transfer arm.
#[derive(Debug, Default)]
pub struct SimArm {
    calls: Vec<String>,
    fault: Option<ArmedFault>,
}

impl SimArm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault on the named action, for every slide.
    pub fn fail_on(&mut self, action: &'static str) {
        self.fault = Some(ArmedFault {
            action,
            slide: None,
        });
    }

    /// Arm a fault on the named action, only for one slide.
    pub fn fail_on_for(&mut self, action: &'static str, slide: SlideId) {
        self.fault = Some(ArmedFault {
            action,
            slide: Some(slide),
        });
    }

    /// Every call received, in order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Number of calls whose action matches `action`.
    pub fn count(&self, action: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(action))
            .count()
    }

    fn call(
        &mut self,
        action: &'static str,
        slide: Option<SlideId>,
        detail: String,
    ) -> Result<(), DeviceError> {
        if let Some(fault) = &self.fault {
            if fault.fires(action, slide) {
                return Err(DeviceError::fault("arm", action, "injected fault"));
            }
        }
        self.calls.push(detail);
        Ok(())
    }
}

impl Arm for SimArm {
    fn move_to_start(&mut self) -> Result<(), DeviceError> {
        self.call("move_to_start", None, "move_to_start".to_string())
    }

    fn move_to_pickup(&mut self, slot: Slot) -> Result<(), DeviceError> {
        self.call("move_to_pickup", None, format!("move_to_pickup slot={slot}"))
    }

    fn close_gripper(&mut self) -> Result<(), DeviceError> {
        self.call("close_gripper", None, "close_gripper".to_string())
    }

    fn open_gripper(&mut self) -> Result<(), DeviceError> {
        self.call("open_gripper", None, "open_gripper".to_string())
    }

    fn move_to_station(
        &mut self,
        slide: SlideId,
        slot: Slot,
        handoff: Handoff,
    ) -> Result<(), DeviceError> {
        self.call(
            "move_to_station",
            Some(slide),
            format!(
                "move_to_station slide={slide} slot={slot} handoff={}",
                handoff.as_str()
            ),
        )
    }

    fn move_to_imaging(&mut self, slide: SlideId, handoff: Handoff) -> Result<(), DeviceError> {
        self.call(
            "move_to_imaging",
            Some(slide),
            format!("move_to_imaging slide={slide} handoff={}", handoff.as_str()),
        )
    }

    fn move_to_dropoff(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError> {
        self.call(
            "move_to_dropoff",
            Some(slide),
            format!("move_to_dropoff slide={slide} slot={slot}"),
        )
    }

    fn move_to_safety(&mut self) -> Result<(), DeviceError> {
        self.call("move_to_safety", None, "move_to_safety".to_string())
    }
}

/// Simulated liquid-handling station.
#[derive(Debug, Default)]
pub struct SimStation {
    calls: Vec<String>,
    fault: Option<ArmedFault>,
}

impl SimStation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a fault on the staining protocol, only for one slide.
    pub fn fail_staining_for(&mut self, slide: SlideId) {
        self.fault = Some(ArmedFault {
            action: "run_staining",
            slide: Some(slide),
        });
    }

    /// Arm a fault on the washing protocol, only for one slide.
    pub fn fail_washing_for(&mut self, slide: SlideId) {
        self.fault = Some(ArmedFault {
            action: "run_washing",
            slide: Some(slide),
        });
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Number of staining protocol runs.
    pub fn stain_count(&self) -> usize {
        self.count("run_staining")
    }

    /// Number of washing protocol runs.
    pub fn wash_count(&self) -> usize {
        self.count("run_washing")
    }

    fn count(&self, action: &str) -> usize {
        self.calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(action))
            .count()
    }

    fn call(
        &mut self,
        action: &'static str,
        slide: SlideId,
        slot: Slot,
    ) -> Result<(), DeviceError> {
        if let Some(fault) = &self.fault {
            if fault.fires(action, Some(slide)) {
                return Err(DeviceError::fault("station", action, "injected fault"));
            }
        }
        self.calls.push(format!("{action} slide={slide} slot={slot}"));
        Ok(())
    }
}

impl LiquidHandler for SimStation {
    fn run_staining(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError> {
        self.call("run_staining", slide, slot)
    }

    fn run_washing(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError> {
        self.call("run_washing", slide, slot)
    }
}

/// Simulated imaging unit with scripted evaluation results.
///
/// Evaluations pop from the front of the script; once the script is
/// exhausted every further evaluation returns the fallback result.
///
/// # Example
///
/// ```rust
/// use slideflow::core::SlideId;
/// use slideflow::device::sim::SimImaging;
/// use slideflow::device::ImagingStation;
///
/// let mut imaging = SimImaging::scripted(vec![false, true]);
/// let slide = SlideId::new(1).unwrap();
/// assert_eq!(imaging.evaluate(slide).unwrap(), false);
/// assert_eq!(imaging.evaluate(slide).unwrap(), true);
/// assert_eq!(imaging.evaluations(), 2);
/// ```
#[derive(Debug)]
pub struct SimImaging {
    calls: Vec<String>,
    script: VecDeque<bool>,
    fallback: bool,
    evaluations: u32,
    fault: Option<ArmedFault>,
    invalid_for: Option<SlideId>,
}

impl SimImaging {
    /// Every evaluation passes.
    pub fn passing() -> Self {
        Self::with_script(Vec::new(), true)
    }

    /// Every evaluation fails, driving the wash loop to exhaustion.
    pub fn failing() -> Self {
        Self::with_script(Vec::new(), false)
    }

    /// Evaluations follow `script`, then pass once it is exhausted.
    pub fn scripted(script: Vec<bool>) -> Self {
        Self::with_script(script, true)
    }

    /// Evaluations follow `script`, then return `fallback`.
    pub fn with_script(script: Vec<bool>, fallback: bool) -> Self {
        Self {
            calls: Vec::new(),
            script: script.into(),
            fallback,
            evaluations: 0,
            fault: None,
            invalid_for: None,
        }
    }

    /// Arm a fault on the named action, only for one slide.
    pub fn fail_on_for(&mut self, action: &'static str, slide: SlideId) {
        self.fault = Some(ArmedFault {
            action,
            slide: Some(slide),
        });
    }

    /// Make evaluations of `slide` report a contract violation, simulating
    /// a remote backend that does not return a boolean.
    pub fn invalid_response_for(&mut self, slide: SlideId) {
        self.invalid_for = Some(slide);
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    /// Total number of evaluate calls.
    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }

    /// Total number of full scans.
    pub fn scan_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some("scan"))
            .count()
    }

    fn trip(&self, action: &'static str, slide: Option<SlideId>) -> Result<(), DeviceError> {
        if let Some(fault) = &self.fault {
            if fault.fires(action, slide) {
                return Err(DeviceError::fault("imaging", action, "injected fault"));
            }
        }
        Ok(())
    }
}

impl ImagingStation for SimImaging {
    fn safety(&mut self) -> Result<(), DeviceError> {
        self.trip("safety", None)?;
        self.calls.push("safety".to_string());
        Ok(())
    }

    fn evaluate(&mut self, slide: SlideId) -> Result<bool, DeviceError> {
        self.trip("evaluate", Some(slide))?;
        if self.invalid_for == Some(slide) {
            return Err(DeviceError::InvalidResponse {
                device: "imaging",
                detail: "evaluation result is not a boolean".to_string(),
            });
        }
        self.evaluations += 1;
        let result = self.script.pop_front().unwrap_or(self.fallback);
        self.calls.push(format!("evaluate slide={slide} ok={result}"));
        Ok(result)
    }

    fn scan(&mut self, slide: SlideId) -> Result<(), DeviceError> {
        self.trip("scan", Some(slide))?;
        self.calls.push(format!("scan slide={slide}"));
        Ok(())
    }
}
