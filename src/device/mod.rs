//! Device capability contracts.
//!
//! Each trait models one physical instrument as a set of blocking
//! operations. Implementations may be synchronous simulations (see
//! [`sim`]), real hardware drivers, or proxies to a remote task-execution
//! platform; the workflow depends only on the contracts and never assumes
//! local execution.
//!
//! Every method takes `&mut self`: each instrument is an exclusive shared
//! resource, and a call uses the device exclusively until it returns.

pub mod sim;

mod error;

pub use error::DeviceError;

use crate::core::{SlideId, Slot};
use serde::{Deserialize, Serialize};

/// Intent tag passed with arm hand-off moves.
///
/// Tells the receiving instrument why the slide is arriving, so a driver
/// can select the matching approach path or deck state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Handoff {
    /// First delivery to the station for staining.
    Receive,
    /// Return to the station for a wash cycle.
    Rewash,
    /// First delivery to the imaging unit.
    Deliver,
    /// Return to the imaging unit after a wash.
    Redeliver,
}

impl Handoff {
    /// Stable string form used in event payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receive => "receive",
            Self::Rewash => "rewash",
            Self::Deliver => "deliver",
            Self::Redeliver => "redeliver",
        }
    }
}

/// The transfer arm moving slides between rack, station, imaging unit and
/// drop-off.
pub trait Arm {
    /// Move to the neutral start position.
    fn move_to_start(&mut self) -> Result<(), DeviceError>;

    /// Move over the given pickup rack slot.
    fn move_to_pickup(&mut self, slot: Slot) -> Result<(), DeviceError>;

    /// Close the gripper around the slide under the arm.
    fn close_gripper(&mut self) -> Result<(), DeviceError>;

    /// Release the slide.
    fn open_gripper(&mut self) -> Result<(), DeviceError>;

    /// Carry the slide to the liquid-handling station.
    fn move_to_station(
        &mut self,
        slide: SlideId,
        slot: Slot,
        handoff: Handoff,
    ) -> Result<(), DeviceError>;

    /// Carry the slide to the imaging unit.
    fn move_to_imaging(&mut self, slide: SlideId, handoff: Handoff) -> Result<(), DeviceError>;

    /// Carry the slide to the drop-off rack.
    fn move_to_dropoff(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError>;

    /// Retract to the safety position, clear of all instruments.
    fn move_to_safety(&mut self) -> Result<(), DeviceError>;
}

/// The liquid-handling station running staining and washing protocols.
pub trait LiquidHandler {
    /// Run the staining protocol on the slide in the given deck slot.
    fn run_staining(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError>;

    /// Run the washing protocol on the slide in the given deck slot.
    fn run_washing(&mut self, slide: SlideId, slot: Slot) -> Result<(), DeviceError>;
}

/// The imaging unit performing safety moves, quality evaluation and full
/// scans.
pub trait ImagingStation {
    /// Move optics to the safety position before the arm approaches.
    fn safety(&mut self) -> Result<(), DeviceError>;

    /// Low-magnification quality evaluation.
    ///
    /// Returns `true` when staining quality is sufficient to scan. The
    /// result is strictly boolean; a backend that cannot produce one must
    /// return [`DeviceError::InvalidResponse`] rather than coerce.
    fn evaluate(&mut self, slide: SlideId) -> Result<bool, DeviceError>;

    /// Full high-resolution scan.
    fn scan(&mut self, slide: SlideId) -> Result<(), DeviceError>;
}

/// The three device handles a workflow operates on, owned together by the
/// orchestrator.
#[derive(Debug)]
pub struct DeviceSuite<A, L, I> {
    pub arm: A,
    pub station: L,
    pub imaging: I,
}

impl<A: Arm, L: LiquidHandler, I: ImagingStation> DeviceSuite<A, L, I> {
    pub fn new(arm: A, station: L, imaging: I) -> Self {
        Self {
            arm,
            station,
            imaging,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handoff_strings_are_stable() {
        assert_eq!(Handoff::Receive.as_str(), "receive");
        assert_eq!(Handoff::Rewash.as_str(), "rewash");
        assert_eq!(Handoff::Deliver.as_str(), "deliver");
        assert_eq!(Handoff::Redeliver.as_str(), "redeliver");
    }
}
