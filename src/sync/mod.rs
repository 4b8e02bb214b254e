//! Reconciliation engine and its optional periodic trigger.

pub mod reconciler;
pub mod scheduler;

pub use reconciler::{Reconciler, SkippedRecord, SyncError, SyncReport};
