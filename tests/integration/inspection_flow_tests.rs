//! End-to-end inspection: sync, plan, start, verdict, upstream write-back.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use iqc_tracker::config::InspectionConfig;
use iqc_tracker::inspection::InspectionWorkflow;
use iqc_tracker::models::inspection::{ResultStatus, SubmitInspection, Verdict};
use iqc_tracker::models::task::{InboundTask, NewTask, TaskStatus};
use iqc_tracker::persistence::result_repo::ResultRepo;
use iqc_tracker::persistence::schema;
use iqc_tracker::persistence::task_repo::TaskRepo;
use iqc_tracker::AppError;

use super::test_helpers::{Failure, Fixture, ScriptedWarehouse};

fn verdict(verdict: Verdict) -> SubmitInspection {
    SubmitInspection {
        verdict,
        inspector: "kim".into(),
        qty_inspected: None,
        qty_failed: None,
        qty_passed: None,
        remark: None,
    }
}

fn manual_task(invoice: &str, part: &str, lot_no: Option<&str>, aql: Option<&str>) -> InboundTask {
    InboundTask::new(
        NewTask {
            invoice: invoice.to_owned(),
            part: part.to_owned(),
            vendor: "V1".into(),
            po_number: None,
            part_name: None,
            lot_no: lot_no.map(str::to_owned),
            qty: 1000,
            aql: aql.map(str::to_owned),
            received_by: None,
            received_at: None,
        },
        TaskStatus::Pending,
    )
}

/// Seed one pending row, sync it, and return (warehouse id, task id).
async fn synced_task(fx: &Fixture) -> (i64, String) {
    let id = fx.seed(Some("INV-1"), Some("P-1"), "V1", 1000, None).await;
    let report = fx.reconciler().reconcile().await.expect("sync");
    (id, report.tasks[0].id.clone())
}

#[tokio::test]
async fn pass_releases_the_lot_and_updates_the_warehouse() {
    let fx = Fixture::new().await;
    let (upstream_id, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);

    let plan = workflow.plan(&task_id).await.expect("plan");
    assert_eq!(plan.sample_size, 80);
    assert_eq!(plan.aql, "1.0");
    assert_eq!((plan.accept_limit, plan.reject_limit), (5, 7));

    let started = workflow.start(&task_id, "kim").await.expect("start");
    assert_eq!(started.status, TaskStatus::InInspection);
    assert_eq!(started.assigned_to.as_deref(), Some("kim"));

    let outcome = workflow
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .expect("submit");

    assert!(outcome.upstream_updated);
    assert_eq!(outcome.task.status, TaskStatus::Released);
    assert_eq!(outcome.task.result_id.as_deref(), Some(outcome.result.id.as_str()));
    assert!(outcome.task.completed_at.is_some());
    assert_eq!(outcome.result.status, ResultStatus::Passed);
    assert_eq!(outcome.result.action, "Release to WH");
    assert_eq!(outcome.result.sample_size, 80);
    assert_eq!(
        (
            outcome.result.qty_inspected,
            outcome.result.qty_passed,
            outcome.result.qty_failed
        ),
        (80, 80, 0)
    );
    assert_eq!(outcome.result.lot_no, format!("LOT-{upstream_id}"));
    assert_eq!(fx.status_of(upstream_id).await.as_deref(), Some("Passed"));
}

#[tokio::test]
async fn fail_quarantines_the_lot() {
    let fx = Fixture::new().await;
    let (upstream_id, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);
    workflow.start(&task_id, "kim").await.expect("start");

    let mut input = verdict(Verdict::Fail);
    input.qty_inspected = Some(80);
    input.qty_failed = Some(9);
    input.remark = Some("burrs on edge".into());
    let outcome = workflow.submit(&task_id, input).await.expect("submit");

    assert_eq!(outcome.task.status, TaskStatus::Quarantined);
    assert_eq!(outcome.result.action, "Hold");
    assert_eq!(outcome.result.status, ResultStatus::Rejected);
    assert_eq!(outcome.result.qty_passed, 71);
    assert_eq!(outcome.result.remark.as_deref(), Some("burrs on edge"));
    assert_eq!(fx.status_of(upstream_id).await.as_deref(), Some("Rejected"));
}

#[tokio::test]
async fn inverted_labels_reproduce_legacy_wiring() {
    let fx = Fixture::new().await;
    let (upstream_id, task_id) = synced_task(&fx).await;

    let outcome = fx
        .workflow(true)
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .expect("submit");

    assert_eq!(outcome.task.status, TaskStatus::Released);
    assert_eq!(outcome.result.status, ResultStatus::Rejected);
    assert_eq!(fx.status_of(upstream_id).await.as_deref(), Some("Rejected"));
}

#[tokio::test]
async fn submitting_a_queued_task_starts_it_implicitly() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;

    let outcome = fx
        .workflow(false)
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .expect("submit");
    assert_eq!(outcome.task.assigned_to.as_deref(), Some("kim"));
    assert_eq!(outcome.task.status, TaskStatus::Released);
}

#[tokio::test]
async fn closed_task_rejects_a_second_verdict() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);
    workflow
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .expect("first");

    let err = workflow
        .submit(&task_id, verdict(Verdict::Fail))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let err = workflow.start(&task_id, "lee").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let results = ResultRepo::new(Arc::clone(&fx.local))
        .list_for_task(&task_id)
        .await
        .expect("results");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn racing_verdicts_record_one_result() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);
    workflow.start(&task_id, "kim").await.expect("start");

    let (a, b) = tokio::join!(
        workflow.submit(&task_id, verdict(Verdict::Pass)),
        workflow.submit(&task_id, verdict(Verdict::Fail)),
    );
    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);

    let results = ResultRepo::new(Arc::clone(&fx.local))
        .list_for_task(&task_id)
        .await
        .expect("results");
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn failed_result_insert_leaves_the_task_open() {
    let fx = Fixture::new().await;
    let (upstream_id, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);
    sqlx::query("DROP TABLE inspection_result")
        .execute(fx.local.as_ref())
        .await
        .expect("drop");

    let err = workflow
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Db(_)), "got {err}");

    let repo = TaskRepo::new(Arc::clone(&fx.local));
    let task = repo.get_by_id(&task_id).await.expect("get").expect("exists");
    assert_eq!(task.status, TaskStatus::InInspection);
    assert_eq!(task.result_id, None);
    assert_eq!(task.completed_at, None);
    assert_eq!(fx.status_of(upstream_id).await, None);

    schema::bootstrap_schema(fx.local.as_ref())
        .await
        .expect("restore");
    let outcome = workflow
        .submit(&task_id, verdict(Verdict::Pass))
        .await
        .expect("resubmit");
    assert_eq!(outcome.task.status, TaskStatus::Released);
    assert_eq!(outcome.task.result_id.as_deref(), Some(outcome.result.id.as_str()));
}

#[tokio::test]
async fn restarting_an_inspection_is_rejected() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);
    workflow.start(&task_id, "kim").await.expect("start");

    let err = workflow.start(&task_id, "lee").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition(_)));
}

#[tokio::test]
async fn blank_inspector_is_rejected() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;
    let workflow = fx.workflow(false);

    assert!(matches!(
        workflow.start(&task_id, "  ").await,
        Err(AppError::Validation(_))
    ));
    let mut input = verdict(Verdict::Pass);
    input.inspector = String::new();
    assert!(matches!(
        workflow.submit(&task_id, input).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let fx = Fixture::new().await;
    let workflow = fx.workflow(false);

    assert!(matches!(
        workflow.plan("missing").await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        workflow.submit("missing", verdict(Verdict::Pass)).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn task_aql_overrides_the_default() {
    let fx = Fixture::new().await;
    let task = manual_task("INV-7", "P-7", None, Some("0.65"));
    TaskRepo::new(Arc::clone(&fx.local))
        .create(&task)
        .await
        .expect("create");

    let plan = fx.workflow(false).plan(&task.id).await.expect("plan");
    assert_eq!(plan.aql, "0.65");
    assert_eq!((plan.accept_limit, plan.reject_limit), (2, 3));
}

#[tokio::test]
async fn manual_lot_falls_back_to_invoice_and_part() {
    let fx = Fixture::new().await;
    let upstream_id = fx
        .seed(Some("INV-5"), Some("P-5"), "V1", 1000, Some("Received"))
        .await;
    let task = manual_task("INV-5", "P-5", Some("B-2024-07"), None);
    TaskRepo::new(Arc::clone(&fx.local))
        .create(&task)
        .await
        .expect("create");

    let outcome = fx
        .workflow(false)
        .submit(&task.id, verdict(Verdict::Fail))
        .await
        .expect("submit");
    assert!(outcome.upstream_updated);
    assert_eq!(fx.status_of(upstream_id).await.as_deref(), Some("Rejected"));
}

#[tokio::test]
async fn missing_warehouse_row_is_reported_not_fatal() {
    let fx = Fixture::new().await;
    let task = manual_task("INV-6", "P-6", Some("LOT-999"), None);
    TaskRepo::new(Arc::clone(&fx.local))
        .create(&task)
        .await
        .expect("create");

    let outcome = fx
        .workflow(false)
        .submit(&task.id, verdict(Verdict::Pass))
        .await
        .expect("submit");
    assert!(!outcome.upstream_updated);
    assert_eq!(outcome.task.status, TaskStatus::Released);
}

#[tokio::test]
async fn upstream_failure_keeps_the_local_verdict() {
    let fx = Fixture::new().await;
    let task = manual_task("INV-1", "P-1", Some("LOT-1"), None);
    TaskRepo::new(Arc::clone(&fx.local))
        .create(&task)
        .await
        .expect("create");
    let warehouse = ScriptedWarehouse::new(Failure::Unreachable);
    let workflow = InspectionWorkflow::new(
        Arc::clone(&fx.local),
        warehouse.clone(),
        InspectionConfig::default(),
        Duration::from_secs(2),
    );

    let outcome = workflow
        .submit(&task.id, verdict(Verdict::Pass))
        .await
        .expect("submit");

    assert!(!outcome.upstream_updated);
    assert_eq!(warehouse.writes.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.task.status, TaskStatus::Released);
    let stored = ResultRepo::new(Arc::clone(&fx.local))
        .get_by_id(&outcome.result.id)
        .await
        .expect("get");
    assert!(stored.is_some());
}

#[tokio::test]
async fn hung_upstream_write_times_out() {
    let fx = Fixture::new().await;
    let task = manual_task("INV-1", "P-1", Some("LOT-1"), None);
    TaskRepo::new(Arc::clone(&fx.local))
        .create(&task)
        .await
        .expect("create");
    let workflow = InspectionWorkflow::new(
        Arc::clone(&fx.local),
        ScriptedWarehouse::new(Failure::Hang),
        InspectionConfig::default(),
        Duration::from_millis(100),
    );

    let outcome = workflow
        .submit(&task.id, verdict(Verdict::Fail))
        .await
        .expect("submit");
    assert!(!outcome.upstream_updated);
    assert_eq!(outcome.task.status, TaskStatus::Quarantined);
}

#[tokio::test]
async fn bad_quantities_leave_the_task_untouched() {
    let fx = Fixture::new().await;
    let (_, task_id) = synced_task(&fx).await;
    let mut input = verdict(Verdict::Fail);
    input.qty_inspected = Some(10);
    input.qty_failed = Some(11);

    let err = fx.workflow(false).submit(&task_id, input).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let task = TaskRepo::new(Arc::clone(&fx.local))
        .get_by_id(&task_id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(task.status, TaskStatus::AwaitingInspection);
}
