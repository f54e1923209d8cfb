//! Event sink implementations.

use super::Event;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Consumer of workflow events.
///
/// The workflow calls `emit` once per device call, in operation order, and
/// once per orchestrator-level marker. Implementations must not block the
/// control loop indefinitely; a sink that needs slow processing should hand
/// the event off (see [`ChannelSink`]).
pub trait EventSink {
    fn emit(&self, event: Event);
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn emit(&self, event: Event) {
        (**self).emit(event);
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn emit(&self, event: Event) {
        (**self).emit(event);
    }
}

/// Sink wrapping a plain callback - the single-callback contract.
///
/// # Example
///
/// ```rust
/// use slideflow::event::{Event, EventSink, FnSink};
/// use slideflow::payload;
///
/// let sink = FnSink::new(|event: Event| {
///     println!("{} {:?}", event.name, event.payload);
/// });
/// sink.emit(Event::new("imaging.scan", payload! { "slide" => 1 }));
/// ```
pub struct FnSink<F: Fn(Event)> {
    callback: F,
}

impl<F: Fn(Event)> FnSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: Fn(Event)> EventSink for FnSink<F> {
    fn emit(&self, event: Event) {
        (self.callback)(event);
    }
}

/// Sink that collects events in memory.
///
/// Clones share the same buffer, so a handle kept by the caller still sees
/// everything emitted through the handle given to the orchestrator.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    // Events are append-only, so a panic mid-push cannot leave the buffer
    // in a partial state; a poisoned lock is still safe to read and extend.
    fn buffer(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<Event> {
        self.buffer().clone()
    }

    /// Names of all events emitted so far, in order.
    pub fn names(&self) -> Vec<String> {
        self.buffer().iter().map(|e| e.name.clone()).collect()
    }

    /// Number of emitted events with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.buffer().iter().filter(|e| e.name == name).count()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: Event) {
        self.buffer().push(event);
    }
}

/// Sink that forwards events into a channel.
///
/// Decouples emission from consumption: the producer pushes and returns
/// immediately while a consumer drains the receiving end at its own pace.
/// Events emitted after the receiver is dropped are discarded.
pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        // A disconnected consumer is not the workflow's problem.
        let _ = self.tx.send(event);
    }
}
