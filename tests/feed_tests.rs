mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use salesboard::services::{spawn_metrics_feed, spawn_sales_feed, Phase};
use salesboard::supabase::{DataSource, FilterOp};

use common::{sample_rows, wait_for, FakeSource};

fn source(fake: &Arc<FakeSource>) -> Arc<dyn DataSource> {
    fake.clone()
}

#[tokio::test]
async fn sales_feed_loads_newest_first() {
    let fake = FakeSource::new(sample_rows());
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();

    let state = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;

    let ids: Vec<&str> = state.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["s1", "s3", "s2", "s4", "s5"]);
    assert_eq!(state.generation, 1);
    assert!(state.error.is_none());
    assert!(!state.is_loading());

    let queries = fake.queries();
    assert_eq!(queries.len(), 1);
    let order = queries[0].order.as_ref().unwrap();
    assert_eq!(order.column, "created_at");
    assert!(order.descending);
    assert!(queries[0].filters.is_empty());
}

#[tokio::test]
async fn change_event_triggers_one_reload() {
    let fake = FakeSource::with_gate(sample_rows(), 1);
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();
    wait_for(&mut rx, |s| s.phase == Phase::Ready).await;

    fake.emit_change().await;
    let loading = wait_for(&mut rx, |s| s.phase == Phase::Loading).await;
    assert_eq!(loading.generation, 1);
    assert_eq!(loading.data.len(), 5);

    fake.release(1);
    let state = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;
    assert_eq!(state.generation, 2);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fake.query_count(), 2);
    assert_eq!(feed.snapshot().phase, Phase::Ready);
}

#[tokio::test]
async fn changes_during_a_fetch_are_not_lost() {
    let fake = FakeSource::with_gate(Vec::new(), 0);
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();
    wait_for(&mut rx, |s| s.phase == Phase::Loading).await;

    // Initial fetch is still held; the new rows only exist after it started.
    fake.set_rows(sample_rows());
    fake.emit_change().await;
    fake.emit_change().await;
    fake.release(3);

    let state = wait_for(&mut rx, |s| s.generation == 3).await;
    assert_eq!(state.phase, Phase::Ready);
    assert_eq!(state.data.len(), 5);
    assert_eq!(fake.query_count(), 3);
}

#[tokio::test]
async fn failure_keeps_previous_records() {
    let fake = FakeSource::new(sample_rows());
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();
    wait_for(&mut rx, |s| s.phase == Phase::Ready).await;

    fake.fail_with(503, "upstream unavailable");
    assert!(feed.refetch().await);
    let failed = wait_for(&mut rx, |s| s.phase == Phase::Failed).await;
    assert_eq!(failed.data.len(), 5);
    assert!(failed.error.as_deref().unwrap().contains("upstream unavailable"));
    assert_eq!(failed.generation, 1);

    fake.recover();
    assert!(feed.refetch().await);
    let recovered = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;
    assert!(recovered.error.is_none());
    assert_eq!(recovered.generation, 2);
}

#[tokio::test]
async fn initial_failure_leaves_empty_records() {
    let fake = FakeSource::new(sample_rows());
    fake.fail_with(401, "Invalid API key");
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();

    let state = wait_for(&mut rx, |s| s.phase == Phase::Failed).await;
    assert!(state.data.is_empty());
    assert!(state.updated_at.is_none());
    assert!(state.error.unwrap().contains("401"));
}

#[tokio::test]
async fn metrics_feed_reduces_approved_sales() {
    let fake = FakeSource::new(sample_rows());
    let feed = spawn_metrics_feed(source(&fake), 30).unwrap();
    let mut rx = feed.handle().subscribe();

    let state = wait_for(&mut rx, |s| s.phase == Phase::Ready).await;
    let m = state.data.as_ref();
    assert_eq!(m.total_revenue, Decimal::from(350));
    assert_eq!(m.total_sales, 3);
    assert_eq!(m.total_affiliates, 2);
    assert_eq!(m.average_ticket.round_dp(2), Decimal::new(11667, 2));

    let query = &fake.queries()[0];
    assert_eq!(query.filters.len(), 1);
    assert_eq!(query.filters[0].column, "status");
    assert_eq!(query.filters[0].op, FilterOp::Eq);
    assert_eq!(query.filters[0].value, "approved");
}

#[tokio::test]
async fn metrics_feed_surfaces_errors_and_keeps_values() {
    let fake = FakeSource::new(sample_rows());
    let feed = spawn_metrics_feed(source(&fake), 30).unwrap();
    let mut rx = feed.handle().subscribe();
    wait_for(&mut rx, |s| s.phase == Phase::Ready).await;

    fake.fail_with(500, "statement timeout");
    fake.emit_change().await;

    let state = wait_for(&mut rx, |s| s.phase == Phase::Failed).await;
    assert!(!state.is_loading());
    assert!(state.error.unwrap().contains("statement timeout"));
    assert_eq!(state.data.total_sales, 3);
}

#[tokio::test]
async fn shutdown_releases_subscription_and_drops_inflight_fetch() {
    let fake = FakeSource::with_gate(sample_rows(), 0);
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let handle = feed.handle();
    let mut rx = handle.subscribe();
    wait_for(&mut rx, |s| s.phase == Phase::Loading).await;
    assert_eq!(fake.open_subscriptions(), 1);

    feed.shutdown();
    for _ in 0..50 {
        if fake.open_subscriptions() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fake.open_subscriptions(), 0);

    fake.release(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = handle.snapshot();
    assert_eq!(state.generation, 0);
    assert!(state.data.is_empty());
    assert!(!handle.refetch().await);
}

#[tokio::test]
async fn metrics_feed_rejects_unrepresentable_window() {
    let fake = FakeSource::new(sample_rows());
    let err = spawn_metrics_feed(source(&fake), i64::MAX).err().unwrap();

    assert!(err.to_string().contains("out of range"));
    assert_eq!(fake.query_count(), 0);
    assert_eq!(fake.open_subscriptions(), 0);
}

#[tokio::test]
async fn malformed_row_does_not_blank_the_feed() {
    let mut rows = sample_rows();
    rows[0]["price"] = serde_json::Value::Null;
    let fake = FakeSource::new(rows);
    let feed = spawn_sales_feed(source(&fake)).unwrap();
    let mut rx = feed.handle().subscribe();

    let state = wait_for(&mut rx, |s| s.phase != Phase::Idle && s.phase != Phase::Loading).await;
    assert_eq!(state.phase, Phase::Ready);
    assert!(state.error.is_none());
    let ids: Vec<&str> = state.data.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, ["s1", "s3", "s4", "s5"]);
}
