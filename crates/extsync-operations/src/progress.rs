use std::sync::atomic::{AtomicU64, Ordering};

use extsync_events::OperationId;

/// Returns a process-unique id for a fetch and the installs fanned out from it.
pub fn next_op_id() -> OperationId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
