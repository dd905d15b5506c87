//! Entity events

use std::any::Any;

/// An event instance attached to an entity through an event set.
///
/// Events are opaque to the core; gameplay systems downcast to concrete
/// types when triggering them.
pub trait EntityEvent: Any {
    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

/// A plain named signal event.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    /// Signal name raised when the event triggers
    pub signal: String,
}

impl SignalEvent {
    /// Create a signal event.
    #[must_use]
    pub fn new(signal: impl Into<String>) -> Self {
        Self {
            signal: signal.into(),
        }
    }
}

impl EntityEvent for SignalEvent {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
