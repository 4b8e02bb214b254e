//! `SQLite`-backed warehouse source.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sqlx::{QueryBuilder, Sqlite};
use tracing::warn;

use crate::models::invoice::{InvoiceTarget, RowLookup, UpstreamInvoiceRecord};
use crate::persistence::db::Database;
use crate::{AppError, Result};

use super::{PendingStatuses, WarehouseSource};

/// Warehouse invoice table reached through its own pool.
#[derive(Clone)]
pub struct SqliteWarehouse {
    db: Arc<Database>,
    pending: PendingStatuses,
}

fn upstream(err: sqlx::Error) -> AppError {
    AppError::Upstream(err.to_string())
}

impl SqliteWarehouse {
    /// Wrap an open warehouse pool.
    #[must_use]
    pub fn new(db: Arc<Database>, pending: PendingStatuses) -> Self {
        Self { db, pending }
    }

    /// Create the invoice table when it is missing.
    ///
    /// Production warehouses already carry it; this serves local setups and
    /// tests.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the DDL fails.
    pub async fn bootstrap_schema(&self) -> Result<()> {
        sqlx::raw_sql(
            r"
CREATE TABLE IF NOT EXISTS warehouse_invoice (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice     TEXT,
    part        TEXT,
    part_name   TEXT,
    po_number   TEXT,
    qty         INTEGER,
    vendor      TEXT,
    status      TEXT,
    received_at TEXT
);
",
        )
        .execute(self.db.as_ref())
        .await
        .map_err(upstream)?;
        Ok(())
    }

    async fn fetch_pending_rows(&self) -> Result<Vec<UpstreamInvoiceRecord>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, invoice, part, part_name, po_number, qty, vendor, status, received_at
             FROM warehouse_invoice WHERE status IS NULL OR TRIM(status) = ''",
        );
        if !self.pending.spellings().is_empty() {
            builder.push(" OR TRIM(status) IN (");
            let mut separated = builder.separated(", ");
            for spelling in self.pending.spellings() {
                separated.push_bind(spelling.clone());
            }
            separated.push_unseparated(")");
        }
        builder.push(" ORDER BY id DESC");

        builder
            .build_query_as::<UpstreamInvoiceRecord>()
            .fetch_all(self.db.as_ref())
            .await
            .map_err(upstream)
    }

    async fn lookup_row(&self, lookup: &RowLookup) -> Result<Option<UpstreamInvoiceRecord>> {
        match lookup {
            RowLookup::Id(id) => {
                sqlx::query_as(
                    "SELECT id, invoice, part, part_name, po_number, qty, vendor, status, received_at
                     FROM warehouse_invoice WHERE id = ?1",
                )
                .bind(*id)
                .fetch_optional(self.db.as_ref())
                .await
            }
            RowLookup::Key {
                invoice,
                part,
                vendor,
            } => {
                sqlx::query_as(
                    "SELECT id, invoice, part, part_name, po_number, qty, vendor, status, received_at
                     FROM warehouse_invoice
                     WHERE TRIM(invoice) = ?1 AND TRIM(part) = ?2
                       AND TRIM(COALESCE(vendor, '')) = ?3
                     ORDER BY id DESC LIMIT 1",
                )
                .bind(invoice)
                .bind(part)
                .bind(vendor)
                .fetch_optional(self.db.as_ref())
                .await
            }
        }
        .map_err(upstream)
    }

    async fn write_status(&self, target: &InvoiceTarget, status: &str) -> Result<u64> {
        let outcome = match target {
            InvoiceTarget::Id(id) => {
                sqlx::query("UPDATE warehouse_invoice SET status = ?1 WHERE id = ?2")
                    .bind(status)
                    .bind(*id)
                    .execute(self.db.as_ref())
                    .await
            }
            InvoiceTarget::InvoicePart { invoice, part } => {
                sqlx::query(
                    "UPDATE warehouse_invoice SET status = ?1 WHERE invoice = ?2 AND part = ?3",
                )
                .bind(status)
                .bind(invoice)
                .bind(part)
                .execute(self.db.as_ref())
                .await
            }
        }
        .map_err(upstream)?;

        let touched = outcome.rows_affected();
        if touched > 1 {
            // Known gap: the invoice/part fallback does not look at vendor.
            warn!(?target, touched, "status write matched several warehouse rows");
        }
        Ok(touched)
    }
}

impl WarehouseSource for SqliteWarehouse {
    fn fetch_pending(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<UpstreamInvoiceRecord>>> + Send + '_>> {
        Box::pin(self.fetch_pending_rows())
    }

    fn find_row<'a>(
        &'a self,
        lookup: &'a RowLookup,
    ) -> Pin<Box<dyn Future<Output = Result<Option<UpstreamInvoiceRecord>>> + Send + 'a>> {
        Box::pin(self.lookup_row(lookup))
    }

    fn update_status<'a>(
        &'a self,
        target: &'a InvoiceTarget,
        status: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<u64>> + Send + 'a>> {
        Box::pin(self.write_status(target, status))
    }
}
