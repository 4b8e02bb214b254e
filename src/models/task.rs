//! Inbound task model and its lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

/// Lifecycle status for an inbound task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Registered by hand, not yet queued for inspection.
    Pending,
    /// Synced from the warehouse and waiting for an inspector.
    AwaitingInspection,
    /// An inspector has picked the task up.
    InInspection,
    /// Passed inspection and released to the warehouse.
    Released,
    /// Failed inspection and held in quarantine.
    Quarantined,
}

/// Events that drive a task through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    /// Inspector starts working on the task.
    Start,
    /// Inspector submits a PASS verdict.
    Pass,
    /// Inspector submits a FAIL verdict.
    Fail,
}

impl TaskStatus {
    /// Statuses that still occupy the active queue.
    pub const ACTIVE: [Self; 3] = [
        Self::Pending,
        Self::AwaitingInspection,
        Self::InInspection,
    ];

    /// Statuses the reconciler may retire when the warehouse moves on.
    pub const RETIRABLE: [Self; 2] = [Self::Pending, Self::AwaitingInspection];

    /// Whether no further event is accepted.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Quarantined)
    }

    /// Storage and wire label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AwaitingInspection => "awaiting_inspection",
            Self::InInspection => "in_inspection",
            Self::Released => "released",
            Self::Quarantined => "quarantined",
        }
    }

    /// Parse a storage label.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown label.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "awaiting_inspection" => Ok(Self::AwaitingInspection),
            "in_inspection" => Ok(Self::InInspection),
            "released" => Ok(Self::Released),
            "quarantined" => Ok(Self::Quarantined),
            other => Err(AppError::Validation(format!("unknown task status: {other}"))),
        }
    }

    /// Apply `event` and return the next status.
    ///
    /// Forward-only: `Start` moves a queued task into inspection, `Pass`
    /// and `Fail` close an in-progress inspection. Terminal statuses accept
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidTransition` when the event is not allowed
    /// from the current status.
    pub fn apply(self, event: TaskEvent) -> Result<Self> {
        match (self, event) {
            (Self::Pending | Self::AwaitingInspection, TaskEvent::Start) => Ok(Self::InInspection),
            (Self::InInspection, TaskEvent::Pass) => Ok(Self::Released),
            (Self::InInspection, TaskEvent::Fail) => Ok(Self::Quarantined),
            (from, event) => Err(AppError::InvalidTransition(format!(
                "{event:?} not allowed from {}",
                from.as_str()
            ))),
        }
    }
}

/// A unit of inbound material awaiting inspection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InboundTask {
    /// Unique record identifier.
    pub id: String,
    /// Warehouse invoice number.
    pub invoice: String,
    /// Purchase order number.
    pub po_number: Option<String>,
    /// Supplying vendor; empty when unknown.
    pub vendor: String,
    /// Part number.
    pub part: String,
    /// Part description.
    pub part_name: Option<String>,
    /// Lot number, `LOT-{upstream id}` for synced tasks.
    pub lot_no: String,
    /// Planned quantity on the invoice.
    pub qty: i64,
    /// Task-specific AQL code overriding the system default.
    pub aql: Option<String>,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Who registered the receipt.
    pub received_by: Option<String>,
    /// When the material arrived.
    pub received_at: DateTime<Utc>,
    /// Inspector currently assigned.
    pub assigned_to: Option<String>,
    /// Identifier of the inspection result that closed the task.
    pub result_id: Option<String>,
    /// When the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl InboundTask {
    /// Construct a new task in `status` with fresh identifiers and timestamps.
    #[must_use]
    pub fn new(input: NewTask, status: TaskStatus) -> Self {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let lot_no = input
            .lot_no
            .unwrap_or_else(|| format!("LOT-{}", &id[..8]));
        Self {
            id,
            invoice: input.invoice,
            po_number: input.po_number,
            vendor: input.vendor,
            part: input.part,
            part_name: input.part_name,
            lot_no,
            qty: input.qty,
            aql: input.aql,
            status,
            received_by: input.received_by,
            received_at: input.received_at.unwrap_or(now),
            assigned_to: None,
            result_id: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the task still sits in the active queue.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Validated field set used to create a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Invoice number (required, non-blank).
    pub invoice: String,
    /// Part number (required, non-blank).
    pub part: String,
    /// Vendor, empty when unknown.
    pub vendor: String,
    /// Purchase order number.
    pub po_number: Option<String>,
    /// Part description.
    pub part_name: Option<String>,
    /// Explicit lot number; generated when absent.
    pub lot_no: Option<String>,
    /// Planned quantity.
    pub qty: i64,
    /// AQL override.
    pub aql: Option<String>,
    /// Receiver.
    pub received_by: Option<String>,
    /// Arrival timestamp; defaults to now.
    pub received_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /api/tasks`.
///
/// Unknown fields are rejected so arbitrary payloads never reach storage.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct CreateTask {
    /// Invoice number.
    pub invoice: Option<String>,
    /// Part number.
    pub part: Option<String>,
    /// Vendor.
    pub vendor: Option<String>,
    /// Purchase order number.
    pub po_number: Option<String>,
    /// Part description.
    pub part_name: Option<String>,
    /// Lot number.
    pub lot_no: Option<String>,
    /// Planned quantity.
    pub qty: Option<i64>,
    /// AQL override.
    pub aql: Option<String>,
    /// Receiver.
    pub received_by: Option<String>,
    /// Arrival timestamp.
    pub received_at: Option<DateTime<Utc>>,
}

impl CreateTask {
    /// Check required fields and produce a [`NewTask`].
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when `invoice` or `part` is missing or
    /// blank, or when `qty` is negative.
    pub fn validate(self) -> Result<NewTask> {
        let invoice = required(self.invoice, "invoice")?;
        let part = required(self.part, "part")?;
        let qty = self.qty.unwrap_or(0);
        if qty < 0 {
            return Err(AppError::Validation("qty must not be negative".into()));
        }

        Ok(NewTask {
            invoice,
            part,
            vendor: self.vendor.map(|v| v.trim().to_owned()).unwrap_or_default(),
            po_number: non_blank(self.po_number),
            part_name: non_blank(self.part_name),
            lot_no: non_blank(self.lot_no),
            qty,
            aql: non_blank(self.aql),
            received_by: non_blank(self.received_by),
            received_at: self.received_at,
        })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
