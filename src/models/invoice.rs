//! Upstream warehouse invoice record.
//!
//! Owned by the warehouse system; this service only reads rows and
//! rewrites the status column.

use serde::{Deserialize, Serialize};

/// One invoice line as the warehouse stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamInvoiceRecord {
    /// Warehouse row id.
    pub id: i64,
    /// Invoice number; malformed rows may lack it.
    pub invoice: Option<String>,
    /// Part number; malformed rows may lack it.
    pub part: Option<String>,
    /// Part description.
    pub part_name: Option<String>,
    /// Purchase order number.
    pub po_number: Option<String>,
    /// Invoiced quantity.
    pub qty: Option<i64>,
    /// Vendor.
    pub vendor: Option<String>,
    /// Free-form status as written by the warehouse.
    pub status: Option<String>,
    /// Arrival timestamp as text, when recorded.
    pub received_at: Option<String>,
}

/// How to address a single warehouse row for a status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceTarget {
    /// Row id recovered from a `LOT-{id}` lot number.
    Id(i64),
    /// Fallback match on invoice and part. May hit rows from several
    /// vendors sharing the pair.
    InvoicePart {
        /// Invoice number.
        invoice: String,
        /// Part number.
        part: String,
    },
}

impl InvoiceTarget {
    /// Derive the target for a local task: the lot-encoded id when it
    /// parses, otherwise the invoice/part pair.
    #[must_use]
    pub fn for_task(lot_no: &str, invoice: &str, part: &str) -> Self {
        lot_upstream_id(lot_no).map_or_else(
            || Self::InvoicePart {
                invoice: invoice.to_owned(),
                part: part.to_owned(),
            },
            Self::Id,
        )
    }
}

/// How to find the one warehouse row a local task came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowLookup {
    /// Row id recovered from a `LOT-{id}` lot number.
    Id(i64),
    /// Newest row for the task's own (invoice, part, vendor).
    Key {
        /// Invoice number.
        invoice: String,
        /// Part number.
        part: String,
        /// Vendor, trimmed; empty when the warehouse had none.
        vendor: String,
    },
}

impl RowLookup {
    /// The lot-encoded id when it parses, otherwise the task's full key.
    #[must_use]
    pub fn for_task(lot_no: &str, invoice: &str, part: &str, vendor: &str) -> Self {
        lot_upstream_id(lot_no).map_or_else(
            || Self::Key {
                invoice: invoice.to_owned(),
                part: part.to_owned(),
                vendor: vendor.to_owned(),
            },
            Self::Id,
        )
    }
}

/// Lot number derived from a warehouse row id.
#[must_use]
pub fn lot_number(upstream_id: i64) -> String {
    format!("LOT-{upstream_id}")
}

/// Recover the warehouse row id from a `LOT-{id}` lot number.
#[must_use]
pub fn lot_upstream_id(lot_no: &str) -> Option<i64> {
    lot_no
        .strip_prefix("LOT-")
        .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}
