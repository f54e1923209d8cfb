//! Structured workflow events and the sinks that consume them.
//!
//! Every device call made by a workflow is reported as exactly one [`Event`]
//! pushed into an [`EventSink`]. Events are the crate's only observability
//! surface: callers render them to a console, plot them, or forward them to
//! external monitoring. The core guarantees per-slide emission order matches
//! operation order, and assumes the sink does not block significantly.

mod sink;

pub use sink::{ChannelSink, EventSink, FnSink, MemorySink};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Payload of an event: field name to JSON value, deterministically ordered.
pub type Payload = BTreeMap<String, Value>;

/// One structured event emitted by the workflow.
///
/// Names are dot-separated `device.action` pairs (`"arm.to_station"`,
/// `"imaging.evaluate"`) or orchestrator-level markers (`"workflow.start"`).
/// Events are immutable once emitted.
///
/// # Example
///
/// ```rust
/// use slideflow::event::Event;
/// use slideflow::payload;
///
/// let event = Event::new("imaging.evaluate", payload! { "slide" => 1 });
/// assert_eq!(event.device(), "imaging");
/// assert_eq!(event.payload["slide"], serde_json::json!(1));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Dot-separated event name.
    pub name: String,
    /// Structured fields describing the operation.
    pub payload: Payload,
    /// When the event was emitted.
    pub at: DateTime<Utc>,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(name: impl Into<String>, payload: Payload) -> Self {
        Self {
            name: name.into(),
            payload,
            at: Utc::now(),
        }
    }

    /// The device portion of the name (everything before the first dot).
    pub fn device(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Name and payload without the timestamp, for order/equality checks.
    pub fn signature(&self) -> (String, Payload) {
        (self.name.clone(), self.payload.clone())
    }
}

/// Build an event [`Payload`] from `key => value` pairs.
///
/// Values are converted with [`serde_json::json!`].
///
/// # Example
///
/// ```rust
/// use slideflow::payload;
///
/// let p = payload! { "slide" => 3, "slot" => 1 };
/// assert_eq!(p["slide"], serde_json::json!(3));
/// ```
#[macro_export]
macro_rules! payload {
    () => { $crate::event::Payload::new() };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut map = $crate::event::Payload::new();
        $( map.insert($key.to_string(), ::serde_json::json!($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_is_prefix_before_dot() {
        let event = Event::new("arm.to_station", payload! { "slide" => 1 });
        assert_eq!(event.device(), "arm");
    }

    #[test]
    fn device_falls_back_to_full_name() {
        let event = Event::new("heartbeat", Payload::new());
        assert_eq!(event.device(), "heartbeat");
    }

    #[test]
    fn payload_macro_orders_keys_deterministically() {
        let p = payload! { "slot" => 2, "slide" => 1 };
        let keys: Vec<_> = p.keys().cloned().collect();
        assert_eq!(keys, vec!["slide", "slot"]);
    }

    #[test]
    fn signatures_ignore_timestamps() {
        let a = Event::new("station.wash", payload! { "slide" => 1 });
        let b = Event::new("station.wash", payload! { "slide" => 1 });
        assert_eq!(a.signature(), b.signature());
    }
}
