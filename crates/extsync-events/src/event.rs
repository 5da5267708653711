use std::path::PathBuf;

use crate::OperationId;

/// All event types emitted while synchronizing extensions.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// An extension is being fetched from its store.
    FetchStarting {
        op_id: OperationId,
        store: String,
        identifier: String,
    },
    /// The artifact is available in the local cache.
    FetchComplete {
        op_id: OperationId,
        store: String,
        identifier: String,
        artifact: PathBuf,
    },
    /// Fetching failed; no profile will be installed for this extension.
    FetchFailed {
        op_id: OperationId,
        store: String,
        identifier: String,
        error: String,
    },
    /// Install stage for one profile.
    Installing {
        op_id: OperationId,
        identifier: String,
        profile: PathBuf,
        stage: InstallStage,
    },
    /// An extension finished, together with all of its installs.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
}

/// Stages of a per-profile install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStage {
    Starting,
    Installed,
    Skipped,
    Failed(String),
}
