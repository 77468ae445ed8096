//! Completion store: the resumption ledger.
//!
//! A stage is skipped when its checkpoint is present in the store. Presence
//! is the only thing ever checked; the content behind a marker is never
//! re-validated.
//!
//! - [`FsCompletionStore`] reads and writes the on-disk layout under the
//!   archive root, so batches resume from whatever earlier runs left behind.
//! - [`MemoryCompletionStore`] keeps markers and logs in memory, for tests.

mod fs;
mod memory;
mod traits;
mod types;

pub use fs::FsCompletionStore;
pub use memory::MemoryCompletionStore;
pub use traits::CompletionStore;
pub use types::{Checkpoint, StageKind, StoreError};
