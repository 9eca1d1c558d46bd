// Shared test doubles for pipeline integration tests. Not every test
// binary uses every helper, so dead_code warnings are suppressed here.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use courier_core::notification::{
    Notification, NotificationFilter, NotificationPage, Status,
};
use courier_core::provider::{ProviderError, ProviderRequest, ProviderResponse};
use courier_core::template::Template;
use courier_core::types::Timestamp;
use courier_db::DbError;
use courier_dispatch::{NotificationStore, Provider, TemplateStore};
use courier_events::StatusSink;

// ---------------------------------------------------------------------------
// MemStore
// ---------------------------------------------------------------------------

/// In-memory notification store implementing the same contract as the
/// PostgreSQL-backed store, including idempotency-conflict detection.
#[derive(Default)]
pub struct MemStore {
    rows: Mutex<HashMap<Uuid, Notification>>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a row directly, bypassing admission.
    pub async fn insert(&self, n: Notification) {
        self.rows.lock().await.insert(n.id, n);
    }

    pub async fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows.lock().await.get(&id).cloned()
    }

    pub async fn count(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl NotificationStore for MemStore {
    async fn create(&self, n: &Notification) -> Result<(), DbError> {
        let mut rows = self.rows.lock().await;
        if let Some(key) = &n.idempotency_key {
            if rows
                .values()
                .any(|row| row.idempotency_key.as_ref() == Some(key))
            {
                return Err(DbError::IdempotencyConflict);
            }
        }
        rows.insert(n.id, n.clone());
        Ok(())
    }

    async fn create_batch(&self, notifications: &[Notification]) -> Result<(), DbError> {
        let mut rows = self.rows.lock().await;
        for n in notifications {
            if let Some(key) = &n.idempotency_key {
                if rows
                    .values()
                    .any(|row| row.idempotency_key.as_ref() == Some(key))
                {
                    return Err(DbError::IdempotencyConflict);
                }
            }
        }
        for n in notifications {
            rows.insert(n.id, n.clone());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Notification, DbError> {
        self.rows
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn get_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<Notification>, DbError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<Notification> = rows
            .values()
            .filter(|n| n.batch_id == Some(batch_id))
            .cloned()
            .collect();
        matching.sort_by_key(|n| n.created_at);
        Ok(matching)
    }

    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<Notification>, DbError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .find(|n| n.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn update(&self, n: &Notification) -> Result<(), DbError> {
        let mut rows = self.rows.lock().await;
        if !rows.contains_key(&n.id) {
            return Err(DbError::NotFound);
        }
        rows.insert(n.id, n.clone());
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: Status) -> Result<(), DbError> {
        let mut rows = self.rows.lock().await;
        let row = rows.get_mut(&id).ok_or(DbError::NotFound)?;
        row.status = status;
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<NotificationPage, DbError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<Notification> = rows
            .values()
            .filter(|n| filter.status.is_none_or(|s| n.status == s))
            .filter(|n| filter.channel.is_none_or(|c| n.channel == c))
            .filter(|n| filter.batch_id.is_none_or(|b| n.batch_id == Some(b)))
            .filter(|n| filter.start_date.is_none_or(|d| n.created_at >= d))
            .filter(|n| filter.end_date.is_none_or(|d| n.created_at <= d))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(20).clamp(1, 100);
        let offset = ((page - 1) * page_size) as usize;

        let notifications: Vec<Notification> = matching
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .collect();

        Ok(NotificationPage {
            notifications,
            total,
            page,
            page_size,
            total_pages: (total + page_size - 1) / page_size,
        })
    }

    async fn list_due_scheduled(
        &self,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let rows = self.rows.lock().await;
        let mut due: Vec<Notification> = rows
            .values()
            .filter(|n| n.status == Status::Scheduled)
            .filter(|n| n.scheduled_at.is_some_and(|at| at <= before))
            .cloned()
            .collect();
        due.sort_by_key(|n| n.scheduled_at);
        due.truncate(limit as usize);
        Ok(due)
    }
}

// ---------------------------------------------------------------------------
// MemTemplates
// ---------------------------------------------------------------------------

/// In-memory template store keyed by name.
#[derive(Default)]
pub struct MemTemplates {
    templates: Mutex<HashMap<String, Template>>,
}

impl MemTemplates {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn insert(&self, template: Template) {
        self.templates
            .lock()
            .await
            .insert(template.name.clone(), template);
    }
}

#[async_trait]
impl TemplateStore for MemTemplates {
    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, DbError> {
        Ok(self.templates.lock().await.get(name).cloned())
    }
}

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// Scripted provider double. Outcomes are consumed front-to-back; once
/// the script is exhausted every call succeeds.
#[derive(Default)]
pub struct MockProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    calls: Mutex<Vec<ProviderRequest>>,
}

impl MockProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue an HTTP-status failure for the next unscripted call.
    pub async fn fail_with_status(&self, status: u16) {
        self.script
            .lock()
            .await
            .push_back(Err(ProviderError::from_status(status, "scripted failure")));
    }

    /// Queue a success with a fixed message id.
    pub async fn succeed_with(&self, message_id: &str) {
        self.script.lock().await.push_back(Ok(ProviderResponse {
            message_id: message_id.to_string(),
            status: "accepted".to_string(),
            timestamp: Utc::now(),
        }));
    }

    pub async fn calls(&self) -> Vec<ProviderRequest> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn send(&self, req: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.calls.lock().await.push(req.clone());
        match self.script.lock().await.pop_front() {
            Some(outcome) => outcome,
            None => Ok(ProviderResponse {
                message_id: format!("msg-ok-{}", self.calls.lock().await.len()),
                status: "accepted".to_string(),
                timestamp: Utc::now(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// CollectSink
// ---------------------------------------------------------------------------

/// Status sink that records every published transition.
#[derive(Default)]
pub struct CollectSink {
    updates: std::sync::Mutex<Vec<(Uuid, Status)>>,
}

impl CollectSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn updates(&self) -> Vec<(Uuid, Status)> {
        self.updates.lock().expect("sink lock").clone()
    }
}

impl StatusSink for CollectSink {
    fn publish_status(&self, notification: &Notification) {
        self.updates
            .lock()
            .expect("sink lock")
            .push((notification.id, notification.status));
    }
}

// ---------------------------------------------------------------------------
// Polling helper
// ---------------------------------------------------------------------------

/// Poll `check` every 10 ms until it returns true, panicking after five
/// seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}
