//! Admission service integration tests against the in-memory store.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use courier_core::notification::{Channel, Priority, Status};
use courier_core::template::Template;
use courier_core::CoreError;
use courier_dispatch::{AdmissionService, CreateNotification, ServiceError};
use courier_queue::PriorityQueue;

use common::{CollectSink, MemStore, MemTemplates};

struct Harness {
    store: Arc<MemStore>,
    templates: Arc<MemTemplates>,
    queue: Arc<PriorityQueue>,
    sink: Arc<CollectSink>,
    admission: AdmissionService,
}

fn harness() -> Harness {
    let store = MemStore::new();
    let templates = MemTemplates::new();
    let queue = Arc::new(PriorityQueue::new());
    let sink = CollectSink::new();
    let admission = AdmissionService::new(
        store.clone(),
        templates.clone(),
        queue.clone(),
        sink.clone(),
    );
    Harness {
        store,
        templates,
        queue,
        sink,
        admission,
    }
}

fn sms_request(content: &str) -> CreateNotification {
    CreateNotification {
        recipient: "+15551234567".to_string(),
        channel: "sms".to_string(),
        content: Some(content.to_string()),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_pending_notification_is_enqueued_and_marked_queued() {
    let h = harness();

    let created = h.admission.create(sms_request("hello")).await.unwrap();

    assert_eq!(created.status, Status::Queued);
    assert_eq!(h.queue.depth(Channel::Sms).await, 1);

    let stored = h.store.get(created.id).await.unwrap();
    assert_eq!(stored.status, Status::Queued);
}

#[tokio::test]
async fn create_respects_explicit_priority() {
    let h = harness();

    let mut req = sms_request("urgent");
    req.priority = Some("high".to_string());
    let created = h.admission.create(req).await.unwrap();

    assert_eq!(created.priority, Priority::High);
}

#[tokio::test]
async fn scheduled_notification_is_deferred_not_enqueued() {
    let h = harness();

    let mut req = sms_request("later");
    req.scheduled_at = Some(Utc::now() + ChronoDuration::hours(1));
    let created = h.admission.create(req).await.unwrap();

    assert_eq!(created.status, Status::Scheduled);
    assert_eq!(h.queue.depth(Channel::Sms).await, 0);
}

#[tokio::test]
async fn past_schedule_time_is_rejected() {
    let h = harness();

    let mut req = sms_request("too late");
    req.scheduled_at = Some(Utc::now() - ChronoDuration::seconds(1));
    let err = h.admission.create(req).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Core(CoreError::Validation {
            field: "scheduled_at",
            ..
        })
    ));
}

#[tokio::test]
async fn invalid_channel_is_rejected() {
    let h = harness();

    let mut req = sms_request("hi");
    req.channel = "fax".to_string();
    let err = h.admission.create(req).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Core(CoreError::Validation { field: "channel", .. })
    ));
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn missing_content_is_rejected() {
    let h = harness();

    let mut req = sms_request("");
    req.content = None;
    let err = h.admission.create(req).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Core(CoreError::Validation { field: "content", .. })
    ));
}

#[tokio::test]
async fn content_at_channel_cap_is_accepted_over_cap_rejected() {
    let h = harness();

    let at_cap = "x".repeat(Channel::Sms.max_content_length());
    assert!(h.admission.create(sms_request(&at_cap)).await.is_ok());

    let over_cap = "x".repeat(Channel::Sms.max_content_length() + 1);
    let err = h.admission.create(sms_request(&over_cap)).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Core(CoreError::Validation { field: "content", .. })
    ));
}

// ---------------------------------------------------------------------------
// Idempotency
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_idempotency_key_returns_original_unchanged() {
    let h = harness();

    let mut first = sms_request("original content");
    first.idempotency_key = Some("k1".to_string());
    let original = h.admission.create(first).await.unwrap();

    let mut second = sms_request("different content");
    second.idempotency_key = Some("k1".to_string());
    let repeat = h.admission.create(second).await.unwrap();

    assert_eq!(repeat.id, original.id);
    assert_eq!(repeat.content, "original content");
    assert_eq!(h.store.count().await, 1);
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn template_is_rendered_into_content() {
    let h = harness();
    h.templates
        .insert(Template::new(
            "otp",
            Channel::Sms,
            "Your code is {{code}}",
        ))
        .await;

    let mut req = sms_request("");
    req.content = None;
    req.template_name = Some("otp".to_string());
    req.template_vars = HashMap::from([("code".to_string(), "123456".to_string())]);

    let created = h.admission.create(req).await.unwrap();
    assert_eq!(created.content, "Your code is 123456");
}

#[tokio::test]
async fn missing_template_variables_fail_admission() {
    let h = harness();
    h.templates
        .insert(Template::new(
            "otp",
            Channel::Sms,
            "Code {{code}} expires in {{minutes}}m",
        ))
        .await;

    let mut req = sms_request("");
    req.content = None;
    req.template_name = Some("otp".to_string());
    req.template_vars = HashMap::from([("code".to_string(), "123456".to_string())]);

    let err = h.admission.create(req).await.unwrap_err();
    match err {
        ServiceError::Core(CoreError::MissingVariables(missing)) => {
            assert_eq!(missing, vec!["minutes"]);
        }
        other => panic!("expected MissingVariables, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_template_fails_admission() {
    let h = harness();

    let mut req = sms_request("");
    req.content = None;
    req.template_name = Some("ghost".to_string());

    let err = h.admission.create(req).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Core(CoreError::TemplateNotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_above_limit_is_rejected() {
    let h = harness();

    let requests: Vec<CreateNotification> = (0..1001).map(|_| sms_request("hi")).collect();
    let err = h.admission.create_batch(requests).await.unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Core(CoreError::BatchSizeExceeded { size: 1001, max: 1000 })
    ));
    assert_eq!(h.store.count().await, 0);
}

#[tokio::test]
async fn batch_shares_one_batch_id_and_enqueues_pending_items() {
    let h = harness();

    let mut deferred = sms_request("later");
    deferred.scheduled_at = Some(Utc::now() + ChronoDuration::hours(1));

    let created = h
        .admission
        .create_batch(vec![sms_request("a"), sms_request("b"), deferred])
        .await
        .unwrap();

    let batch_id = created[0].batch_id.unwrap();
    assert!(created.iter().all(|n| n.batch_id == Some(batch_id)));

    // Two immediate items queued, the deferred one left to the scheduler.
    assert_eq!(h.queue.depth(Channel::Sms).await, 2);
    assert_eq!(created[2].status, Status::Scheduled);

    let stored_first = h.store.get(created[0].id).await.unwrap();
    assert_eq!(stored_first.status, Status::Queued);
}

#[tokio::test]
async fn batch_validation_failure_is_positional_and_atomic() {
    let h = harness();

    let mut bad = sms_request("hi");
    bad.channel = "pigeon".to_string();

    let err = h
        .admission
        .create_batch(vec![sms_request("ok"), bad])
        .await
        .unwrap_err();

    match err {
        ServiceError::BatchItem { index, .. } => assert_eq!(index, 1),
        other => panic!("expected BatchItem, got {other:?}"),
    }
    // Nothing persisted, nothing enqueued.
    assert_eq!(h.store.count().await, 0);
    assert_eq!(h.queue.depth(Channel::Sms).await, 0);
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_publishes_status_and_is_terminal() {
    let h = harness();

    let mut req = sms_request("later");
    req.scheduled_at = Some(Utc::now() + ChronoDuration::hours(1));
    let created = h.admission.create(req).await.unwrap();

    let cancelled = h.admission.cancel(created.id).await.unwrap();
    assert_eq!(cancelled.status, Status::Cancelled);
    assert!(h
        .sink
        .updates()
        .contains(&(created.id, Status::Cancelled)));

    // A second cancel is forbidden: cancelled is terminal.
    let err = h.admission.cancel(created.id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Core(CoreError::CannotCancel {
            status: Status::Cancelled
        })
    ));
}

#[tokio::test]
async fn list_filters_by_status() {
    let h = harness();

    h.admission.create(sms_request("a")).await.unwrap();
    let mut deferred = sms_request("b");
    deferred.scheduled_at = Some(Utc::now() + ChronoDuration::hours(1));
    h.admission.create(deferred).await.unwrap();

    let filter = courier_core::notification::NotificationFilter {
        status: Some(Status::Scheduled),
        ..Default::default()
    };
    let page = h.admission.list(&filter).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.notifications[0].status, Status::Scheduled);
}
