use std::sync::Arc;
use std::time::Duration;

use iqc_tracker::persistence::task_repo::TaskRepo;
use iqc_tracker::sync::scheduler::spawn_sync_task;
use tokio_util::sync::CancellationToken;

use super::test_helpers::Fixture;

#[tokio::test]
async fn periodic_sync_picks_up_new_rows() {
    let fx = Fixture::new().await;
    fx.seed(Some("INV-1"), Some("P-1"), "V1", 10, None).await;
    let ct = CancellationToken::new();
    let handle = spawn_sync_task(fx.reconciler(), Duration::from_millis(50), ct.clone());

    let repo = TaskRepo::new(Arc::clone(&fx.local));
    let mut found = false;
    for _ in 0..40 {
        if repo
            .find_by_key("INV-1", "P-1", "V1")
            .await
            .expect("query")
            .is_some()
        {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    ct.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("task stops on cancel")
        .expect("task did not panic");
    assert!(found, "scheduled sync never created the task");
}

#[tokio::test]
async fn cancelled_before_first_tick_does_nothing() {
    let fx = Fixture::new().await;
    fx.seed(Some("INV-1"), Some("P-1"), "V1", 10, None).await;
    let ct = CancellationToken::new();
    let handle = spawn_sync_task(fx.reconciler(), Duration::from_secs(3600), ct.clone());

    ct.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("task stops on cancel")
        .expect("task did not panic");

    let task = TaskRepo::new(Arc::clone(&fx.local))
        .find_by_key("INV-1", "P-1", "V1")
        .await
        .expect("query");
    assert!(task.is_none());
}
