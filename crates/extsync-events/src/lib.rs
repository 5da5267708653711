mod event;
mod sink;

use std::sync::Arc;

pub use event::*;
pub use sink::*;

/// Unique identifier for a running fetch and the installs fanned out from it.
pub type OperationId = u64;

/// Shared handle to an event sink.
pub type EventSinkHandle = Arc<dyn EventSink>;
