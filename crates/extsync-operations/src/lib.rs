pub mod context;
pub mod progress;
pub mod request;
pub mod sync;
pub mod types;

pub use context::SyncContext;
pub use request::{group_requests, ExtensionRequest};
pub use sync::synchronize;
pub use types::*;
