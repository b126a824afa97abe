//! HubSpot synchronization
//!
//! Local business-state changes are queued in `sync_queue` and pushed by
//! [`processor::run_processor`]. Pulls compare the deal stage in HubSpot
//! with the local state and open a [`conflict`] record on divergence.

pub mod conflict;
pub mod processor;
pub mod queue;

pub use conflict::Resolution;
pub use processor::{ItemOutcome, process_next_item, run_processor};
pub use queue::{Priority, SyncOperation, SyncStatus};
