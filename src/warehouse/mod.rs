//! Upstream warehouse access.
//!
//! The warehouse owns its invoice table. This service holds a narrow
//! capability over it: list pending rows, look up the row behind a task,
//! and rewrite a single row's status. [`WarehouseSource`] is the seam
//! the reconciler and the inspection workflow depend on.

pub mod sqlite;

use std::future::Future;
use std::pin::Pin;

use crate::models::invoice::{InvoiceTarget, RowLookup, UpstreamInvoiceRecord};
use crate::Result;

pub use sqlite::SqliteWarehouse;

/// Read/write capability over the warehouse invoice table.
pub trait WarehouseSource: Send + Sync {
    /// Every row whose status is unset or one of the pending spellings,
    /// newest id first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`](crate::AppError::Upstream) if the
    /// warehouse cannot be queried.
    fn fetch_pending(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<UpstreamInvoiceRecord>>> + Send + '_>>;

    /// The row addressed by `lookup`, in any status. Key lookups return
    /// the newest matching row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`](crate::AppError::Upstream) on query failure.
    fn find_row<'a>(
        &'a self,
        lookup: &'a RowLookup,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UpstreamInvoiceRecord>>> + Send + 'a>>;

    /// Overwrite the status column of the addressed row(s).
    ///
    /// Returns the number of rows touched. The invoice/part fallback can
    /// touch more than one.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Upstream`](crate::AppError::Upstream) on write failure.
    fn update_status<'a>(
        &'a self,
        target: &'a InvoiceTarget,
        status: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>>;
}

/// Decides whether a warehouse status still means "waiting for IQC".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingStatuses {
    spellings: Vec<String>,
}

impl PendingStatuses {
    /// Build from the configured spellings. Blank entries are dropped.
    #[must_use]
    pub fn new(spellings: &[String]) -> Self {
        Self {
            spellings: spellings
                .iter()
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// The accepted non-null spellings.
    #[must_use]
    pub fn spellings(&self) -> &[String] {
        &self.spellings
    }

    /// `None`, blank, or any configured spelling counts as pending.
    #[must_use]
    pub fn is_pending(&self, status: Option<&str>) -> bool {
        match status.map(str::trim) {
            None | Some("") => true,
            Some(s) => self.spellings.iter().any(|p| p == s),
        }
    }
}
