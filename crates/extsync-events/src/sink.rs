use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex, PoisonError,
};

use crate::SyncEvent;

/// Trait for consuming events.
///
/// Each frontend provides its own implementation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Channel-based event sink.
///
/// Sends events through a standard mpsc channel; the receiver can be drained from any thread.
pub struct ChannelSink {
    sender: Sender<SyncEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<SyncEvent>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}

/// No-op event sink for tests or headless operation.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Collector sink that stores all events for inspection.
#[derive(Default)]
pub struct CollectorSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl CollectorSink {
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for CollectorSink {
    fn emit(&self, event: SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
