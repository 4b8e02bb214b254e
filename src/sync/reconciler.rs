//! Warehouse → local task reconciliation.
//!
//! One run pulls every pending warehouse invoice, creates a task for each
//! (invoice, part, vendor) not yet known locally, then retires queued tasks
//! whose warehouse row has since moved past pending. Each step is
//! idempotent, so an interrupted run is repaired by the next one. Rows are
//! processed one at a time with no enclosing transaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::models::invoice::{lot_number, RowLookup, UpstreamInvoiceRecord};
use crate::models::task::{non_blank, InboundTask, NewTask, TaskStatus};
use crate::persistence::db::Database;
use crate::persistence::part_repo::PartRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::warehouse::{PendingStatuses, WarehouseSource};
use crate::{AppError, Result};

/// Receiver recorded on tasks created by reconciliation.
pub const SYNC_RECEIVER: &str = "warehouse-sync";

const ALREADY_EXISTS: &str = "already exists";

/// Summary returned by one reconciliation run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Human-readable one-line summary.
    pub message: String,
    /// Tasks created.
    pub synced_count: usize,
    /// Records skipped because a task already exists.
    pub skipped_count: usize,
    /// Local tasks retired because the warehouse moved on.
    pub removed_count: usize,
    /// Records or tasks that failed individually.
    pub error_count: usize,
    /// Tasks created by this run.
    pub tasks: Vec<InboundTask>,
    /// Records skipped by this run.
    pub skipped: Vec<SkippedRecord>,
    /// Per-item failures.
    pub errors: Vec<SyncError>,
}

/// A warehouse record that already had a task.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedRecord {
    /// Invoice number.
    pub invoice: String,
    /// Part number.
    pub part: String,
    /// Vendor.
    pub vendor: String,
    /// Why it was skipped.
    pub reason: String,
}

/// A per-item failure isolated from the rest of the run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncError {
    /// Invoice number, when the record had one.
    pub invoice: Option<String>,
    /// Part number, when the record had one.
    pub part: Option<String>,
    /// Failure description.
    pub reason: String,
}

enum Ingest {
    Created(InboundTask),
    Skipped(SkippedRecord),
}

/// Reconciles warehouse invoices into local inbound tasks.
#[derive(Clone)]
pub struct Reconciler {
    tasks: TaskRepo,
    parts: PartRepo,
    warehouse: Arc<dyn WarehouseSource>,
    pending: PendingStatuses,
    timeout: Duration,
    run_lock: Arc<Mutex<()>>,
}

impl Reconciler {
    /// Build a reconciler over the local store and the warehouse capability.
    ///
    /// `timeout` bounds every individual warehouse call.
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        warehouse: Arc<dyn WarehouseSource>,
        pending: PendingStatuses,
        timeout: Duration,
    ) -> Self {
        Self {
            tasks: TaskRepo::new(Arc::clone(&db)),
            parts: PartRepo::new(db),
            warehouse,
            pending,
            timeout,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Runs from the same process are serialized. Runs from separate
    /// processes rely on the storage uniqueness constraint: the losing
    /// insert is reported as an item error.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` if the initial warehouse fetch fails or
    /// times out. Per-record failures never abort the run; they are listed
    /// in [`SyncReport::errors`].
    pub async fn reconcile(&self) -> Result<SyncReport> {
        let _guard = self.run_lock.lock().await;
        self.run().instrument(info_span!("reconcile")).await
    }

    async fn run(&self) -> Result<SyncReport> {
        let records = tokio::time::timeout(self.timeout, self.warehouse.fetch_pending())
            .await
            .map_err(|_| {
                AppError::Upstream(format!(
                    "warehouse fetch timed out after {}s",
                    self.timeout.as_secs()
                ))
            })??;
        info!(count = records.len(), "fetched pending warehouse records");

        let mut report = SyncReport::default();

        for record in &records {
            match self.ingest(record).await {
                Ok(Ingest::Created(task)) => {
                    info!(invoice = %task.invoice, part = %task.part, lot = %task.lot_no, "task created");
                    report.tasks.push(task);
                }
                Ok(Ingest::Skipped(skipped)) => {
                    debug!(invoice = %skipped.invoice, part = %skipped.part, "skipped, already exists");
                    report.skipped.push(skipped);
                }
                Err(err) => {
                    warn!(upstream_id = record.id, %err, "warehouse record not synced");
                    report.errors.push(SyncError {
                        invoice: record.invoice.clone(),
                        part: record.part.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        self.retire_claimed(&mut report).await;

        report.synced_count = report.tasks.len();
        report.skipped_count = report.skipped.len();
        report.error_count = report.errors.len();
        report.message = format!(
            "sync completed: {} created, {} skipped, {} removed, {} errors",
            report.synced_count, report.skipped_count, report.removed_count, report.error_count
        );
        info!(
            synced = report.synced_count,
            skipped = report.skipped_count,
            removed = report.removed_count,
            errors = report.error_count,
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn ingest(&self, record: &UpstreamInvoiceRecord) -> Result<Ingest> {
        let invoice = non_blank(record.invoice.clone())
            .ok_or_else(|| AppError::Validation("missing invoice".into()))?;
        let part = non_blank(record.part.clone())
            .ok_or_else(|| AppError::Validation("missing part".into()))?;
        let vendor = record
            .vendor
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_owned();

        if self
            .tasks
            .find_by_key(&invoice, &part, &vendor)
            .await?
            .is_some()
        {
            return Ok(Ingest::Skipped(SkippedRecord {
                invoice,
                part,
                vendor,
                reason: ALREADY_EXISTS.into(),
            }));
        }

        self.parts.upsert(&part, record.part_name.as_deref()).await?;

        let task = InboundTask::new(
            NewTask {
                invoice,
                part,
                vendor,
                po_number: non_blank(record.po_number.clone()),
                part_name: non_blank(record.part_name.clone()),
                lot_no: Some(lot_number(record.id)),
                qty: record.qty.unwrap_or(0).max(0),
                aql: None,
                received_by: Some(SYNC_RECEIVER.into()),
                received_at: record.received_at.as_deref().and_then(parse_received_at),
            },
            TaskStatus::AwaitingInspection,
        );
        let task = self.tasks.create(&task).await?;
        Ok(Ingest::Created(task))
    }

    /// Delete queued tasks whose warehouse row is no longer pending.
    async fn retire_claimed(&self, report: &mut SyncReport) {
        let candidates = match self.tasks.list_by_statuses(&TaskStatus::RETIRABLE).await {
            Ok(tasks) => tasks,
            Err(err) => {
                warn!(%err, "could not list tasks for cleanup");
                report.errors.push(SyncError {
                    invoice: None,
                    part: None,
                    reason: format!("cleanup skipped: {err}"),
                });
                return;
            }
        };

        for task in candidates {
            match self.retire_if_claimed(&task).await {
                Ok(true) => {
                    info!(task_id = %task.id, invoice = %task.invoice, part = %task.part, "task removed, claimed upstream");
                    report.removed_count += 1;
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(task_id = %task.id, %err, "cleanup check failed");
                    report.errors.push(SyncError {
                        invoice: Some(task.invoice.clone()),
                        part: Some(task.part.clone()),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    /// Only the task's own row counts: the lot-encoded id, or the full
    /// (invoice, part, vendor) key for manually numbered lots.
    async fn retire_if_claimed(&self, task: &InboundTask) -> Result<bool> {
        let lookup = RowLookup::for_task(&task.lot_no, &task.invoice, &task.part, &task.vendor);
        let upstream = tokio::time::timeout(self.timeout, self.warehouse.find_row(&lookup))
            .await
            .map_err(|_| AppError::Upstream("warehouse lookup timed out".into()))??;

        match upstream {
            Some(row) if !self.pending.is_pending(row.status.as_deref()) => {
                self.tasks.delete(&task.id).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Parse the warehouse's arrival timestamp; `None` when absent or unreadable.
fn parse_received_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    debug!(raw, "unreadable received_at, defaulting to now");
    None
}
