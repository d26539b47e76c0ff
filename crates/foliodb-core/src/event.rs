//! Lifecycle events.
//!
//! Repository operations buffer events while the transaction is open
//! and drain them into the sink strictly after commit. A rolled-back
//! operation emits nothing: the buffer is dropped with the transaction.

use crate::entry::Entry;
use foliodb_schema::types::SchemaRef;
use std::sync::Mutex;

///
/// EventAction
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[remain::sorted]
pub enum EventAction {
    Create,
    Delete,
    DraftDiscard,
    Publish,
    Unpublish,
    Update,
}

impl EventAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "entry.create",
            Self::Delete => "entry.delete",
            Self::DraftDiscard => "entry.draft-discard",
            Self::Publish => "entry.publish",
            Self::Unpublish => "entry.unpublish",
            Self::Update => "entry.update",
        }
    }
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

///
/// Event
///

#[derive(Clone, Debug)]
pub struct Event {
    pub action: EventAction,
    pub schema: SchemaRef,
    pub entry: Entry,
}

///
/// EventSink
///
/// The only bridge between repository operations and observers.
/// Implementations must not assume they run inside the transaction;
/// they never do.
///

pub trait EventSink {
    fn on_event(&self, event: &Event);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn on_event(&self, event: &Event) {
        (**self).on_event(event);
    }
}

///
/// NullSink
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&self, _event: &Event) {}
}

///
/// RecordingSink
///
/// Buffers every event for structural assertions in tests and demos.
///

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and return all buffered events.
    #[must_use]
    pub fn take(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    /// Event names in emission order, without clearing.
    #[must_use]
    pub fn actions(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .map(|events| events.iter().map(|event| event.action.as_str()).collect())
            .unwrap_or_default()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

///
/// EventBuffer
///

#[derive(Debug, Default)]
pub(crate) struct EventBuffer {
    events: Vec<Event>,
}

impl EventBuffer {
    pub(crate) const fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn push(&mut self, action: EventAction, schema: &SchemaRef, entry: Entry) {
        self.events.push(Event {
            action,
            schema: schema.clone(),
            entry,
        });
    }

    /// Emit everything buffered; called only after a successful commit.
    pub(crate) fn drain_into(self, sink: &dyn EventSink) {
        for event in &self.events {
            tracing::debug!(action = %event.action, schema = %event.schema, "emitting event");
            sink.on_event(event);
        }
    }
}
