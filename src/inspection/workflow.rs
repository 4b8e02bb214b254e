//! Inspection lifecycle: pick up a task, record the verdict, and push the
//! outcome back to the warehouse.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use crate::config::InspectionConfig;
use crate::models::inspection::{InspectionResult, ResultStatus, SubmitInspection, Verdict};
use crate::models::invoice::InvoiceTarget;
use crate::models::task::{non_blank, InboundTask, TaskEvent, TaskStatus};
use crate::persistence::db::Database;
use crate::persistence::result_repo::ResultRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::warehouse::WarehouseSource;
use crate::{AppError, Result};

use super::sampling::{sampling_plan, SamplingPlan};

/// What a verdict submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    /// The persisted result.
    pub result: InspectionResult,
    /// The task after it left the active queue.
    pub task: InboundTask,
    /// Whether the warehouse status write landed.
    pub upstream_updated: bool,
}

/// Drives tasks through inspection.
#[derive(Clone)]
pub struct InspectionWorkflow {
    db: Arc<Database>,
    tasks: TaskRepo,
    warehouse: Arc<dyn WarehouseSource>,
    settings: InspectionConfig,
    upstream_timeout: Duration,
}

impl InspectionWorkflow {
    /// Build a workflow over the local store and the warehouse capability.
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        warehouse: Arc<dyn WarehouseSource>,
        settings: InspectionConfig,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            tasks: TaskRepo::new(Arc::clone(&db)),
            db,
            warehouse,
            settings,
            upstream_timeout,
        }
    }

    /// Effective inspection settings.
    #[must_use]
    pub fn settings(&self) -> &InspectionConfig {
        &self.settings
    }

    /// The task's AQL, or the system default.
    #[must_use]
    pub fn effective_aql<'a>(&'a self, task: &'a InboundTask) -> &'a str {
        task.aql
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(&self.settings.default_aql)
    }

    /// Sampling plan for a task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown task.
    pub async fn plan(&self, task_id: &str) -> Result<SamplingPlan> {
        let task = self.load(task_id).await?;
        Ok(sampling_plan(task.qty, self.effective_aql(&task)))
    }

    /// Assign an inspector and move the task into inspection.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank inspector,
    /// `AppError::NotFound` for an unknown task, and
    /// `AppError::InvalidTransition` unless the task is pending or awaiting
    /// inspection.
    pub async fn start(&self, task_id: &str, inspector: &str) -> Result<InboundTask> {
        let inspector = non_blank(Some(inspector.to_owned()))
            .ok_or_else(|| AppError::Validation("inspector is required".into()))?;
        let task = self.load(task_id).await?;
        let next = task.status.apply(TaskEvent::Start)?;

        self.tasks
            .transition(task_id, task.status, next, Some(&inspector), None)
            .await?;
        info!(task_id, inspector = %inspector, "inspection started");

        self.load(task_id).await
    }

    /// Record a final verdict and close the task.
    ///
    /// A task still queued is started implicitly. The task is moved to
    /// `released`/`quarantined` and the result persisted in one transaction
    /// before the warehouse write; a failed write is logged and reported through
    /// [`SubmissionOutcome::upstream_updated`], never rolled back.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for bad quantities or a blank
    /// inspector, `AppError::NotFound` for an unknown task,
    /// `AppError::InvalidTransition` for a closed task, and
    /// `AppError::Conflict` if another submission closed it first.
    pub async fn submit(&self, task_id: &str, input: SubmitInspection) -> Result<SubmissionOutcome> {
        let span = info_span!("submit_inspection", task_id, verdict = input.verdict.as_str());
        self.submit_inner(task_id, input).instrument(span).await
    }

    async fn submit_inner(
        &self,
        task_id: &str,
        input: SubmitInspection,
    ) -> Result<SubmissionOutcome> {
        let inspector = non_blank(Some(input.inspector.clone()))
            .ok_or_else(|| AppError::Validation("inspector is required".into()))?;
        let mut task = self.load(task_id).await?;
        if task.status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "task {task_id} is already {}",
                task.status.as_str()
            )));
        }

        let plan = sampling_plan(task.qty, self.effective_aql(&task));
        let (qty_inspected, qty_passed, qty_failed) = resolve_quantities(&input, &task, &plan)?;

        if task.status != TaskStatus::InInspection {
            let started = task.status.apply(TaskEvent::Start)?;
            self.tasks
                .transition(task_id, task.status, started, Some(&inspector), None)
                .await?;
            task.status = started;
        }
        let event = match input.verdict {
            Verdict::Pass => TaskEvent::Pass,
            Verdict::Fail => TaskEvent::Fail,
        };
        let closed = task.status.apply(event)?;

        let status = ResultStatus::for_verdict(input.verdict, self.settings.invert_result_status);
        let mut result = InspectionResult::new(task.id.clone(), input.verdict, status, inspector);
        result.invoice.clone_from(&task.invoice);
        result.part.clone_from(&task.part);
        result.lot_no.clone_from(&task.lot_no);
        result.aql.clone_from(&plan.aql);
        result.sample_size = plan.sample_size;
        result.qty_inspected = qty_inspected;
        result.qty_passed = qty_passed;
        result.qty_failed = qty_failed;
        result.remark = non_blank(input.remark);

        // The status guard admits one closer per task. Closing and the
        // result insert commit together or not at all.
        let mut tx = self.db.begin().await?;
        TaskRepo::transition_on(&mut *tx, task_id, task.status, closed, None, Some(&result.id))
            .await?;
        let result = ResultRepo::create_on(&mut *tx, &result).await?;
        tx.commit().await?;
        info!(
            result_id = %result.id,
            status = status.as_str(),
            action = %result.action,
            "inspection recorded"
        );

        let target = InvoiceTarget::for_task(&task.lot_no, &task.invoice, &task.part);
        let upstream_updated = self.push_upstream(&target, status).await;

        let task = self.load(task_id).await?;
        Ok(SubmissionOutcome {
            result,
            task,
            upstream_updated,
        })
    }

    async fn push_upstream(&self, target: &InvoiceTarget, status: ResultStatus) -> bool {
        let write = self.warehouse.update_status(target, status.as_str());
        match tokio::time::timeout(self.upstream_timeout, write).await {
            Ok(Ok(0)) => {
                warn!(?target, "warehouse status write matched no rows");
                false
            }
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                warn!(?target, %err, "warehouse status write failed");
                false
            }
            Err(_) => {
                warn!(?target, "warehouse status write timed out");
                false
            }
        }
    }

    async fn load(&self, task_id: &str) -> Result<InboundTask> {
        self.tasks
            .get_by_id(task_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("task {task_id} not found")))
    }
}

/// `(inspected, passed, failed)` with defaults applied and checked.
fn resolve_quantities(
    input: &SubmitInspection,
    task: &InboundTask,
    plan: &SamplingPlan,
) -> Result<(i64, i64, i64)> {
    let inspected = input
        .qty_inspected
        .unwrap_or_else(|| plan.sample_size.min(task.qty));
    let failed = input.qty_failed.unwrap_or(0);
    if inspected < 0 || failed < 0 {
        return Err(AppError::Validation("quantities must not be negative".into()));
    }
    if failed > inspected {
        return Err(AppError::Validation(format!(
            "qty_failed {failed} exceeds qty_inspected {inspected}"
        )));
    }
    let passed = input.qty_passed.unwrap_or(inspected - failed);
    if passed < 0 || passed + failed > inspected {
        return Err(AppError::Validation(format!(
            "qty_passed {passed} plus qty_failed {failed} exceeds qty_inspected {inspected}"
        )));
    }
    Ok((inspected, passed, failed))
}
