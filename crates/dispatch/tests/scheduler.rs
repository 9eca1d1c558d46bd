//! Scheduler sweep tests against the in-memory store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;

use courier_core::notification::{Channel, Notification, Status};
use courier_dispatch::Scheduler;
use courier_queue::PriorityQueue;

use common::{eventually, MemStore};

fn scheduled(offset: ChronoDuration) -> Notification {
    let mut n = Notification::new("+15551234567", Channel::Sms, "deferred");
    n.status = Status::Scheduled;
    n.scheduled_at = Some(Utc::now() + offset);
    n
}

#[tokio::test]
async fn sweep_promotes_only_due_records() {
    let store = MemStore::new();
    let queue = Arc::new(PriorityQueue::new());

    let due = scheduled(ChronoDuration::seconds(-5));
    let future = scheduled(ChronoDuration::hours(1));
    store.insert(due.clone()).await;
    store.insert(future.clone()).await;

    let scheduler = Scheduler::new(store.clone(), queue.clone(), Duration::from_secs(10), 100);
    scheduler.sweep().await.unwrap();

    assert_eq!(queue.depth(Channel::Sms).await, 1);
    assert_eq!(store.get(due.id).await.unwrap().status, Status::Queued);
    assert_eq!(store.get(future.id).await.unwrap().status, Status::Scheduled);
}

#[tokio::test]
async fn sweep_respects_batch_size_soonest_first() {
    let store = MemStore::new();
    let queue = Arc::new(PriorityQueue::new());

    let older = scheduled(ChronoDuration::seconds(-60));
    let newer = scheduled(ChronoDuration::seconds(-1));
    store.insert(older.clone()).await;
    store.insert(newer.clone()).await;

    let scheduler = Scheduler::new(store.clone(), queue.clone(), Duration::from_secs(10), 1);
    scheduler.sweep().await.unwrap();

    // Only the soonest-due record fits in the sweep budget.
    assert_eq!(store.get(older.id).await.unwrap().status, Status::Queued);
    assert_eq!(store.get(newer.id).await.unwrap().status, Status::Scheduled);
}

#[tokio::test]
async fn run_sweeps_immediately_on_startup_and_stops_on_cancel() {
    let store = MemStore::new();
    let queue = Arc::new(PriorityQueue::new());

    let due = scheduled(ChronoDuration::seconds(-5));
    store.insert(due.clone()).await;

    // A long interval proves the startup sweep is immediate.
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        queue.clone(),
        Duration::from_secs(3600),
        100,
    ));
    let cancel = CancellationToken::new();

    let run_cancel = cancel.clone();
    let run_scheduler = scheduler.clone();
    let handle = tokio::spawn(async move { run_scheduler.run(run_cancel).await });

    let queue_probe = queue.clone();
    eventually(move || {
        let queue = queue_probe.clone();
        async move { queue.depth(Channel::Sms).await == 1 }
    })
    .await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop on cancellation")
        .unwrap();
}
