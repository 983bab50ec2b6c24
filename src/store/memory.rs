use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{NotificationStore, StoreError, StoreResult};
use crate::models::notification::{NewNotification, Notification};

/// Row plus the order it was inserted in, so `list` is deterministic.
#[derive(Clone)]
struct StoredRow {
    seq: u64,
    notification: Notification,
}

/// In-process notification table keyed by id.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<DashMap<Uuid, StoredRow>>,
    next_seq: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed row (used for seeding with fixed timestamps).
    pub fn insert(&self, notification: Notification) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.rows
            .insert(notification.id, StoredRow { seq, notification });
    }

    pub fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows.get(&id).map(|row| row.notification.clone())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let mut rows: Vec<StoredRow> = self
            .rows
            .iter()
            .filter(|entry| entry.notification.user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.seq);
        Ok(rows.into_iter().map(|row| row.notification).collect())
    }

    async fn unread_count(&self, user_id: Uuid) -> StoreResult<u64> {
        let count = self
            .rows
            .iter()
            .filter(|entry| entry.notification.user_id == user_id && !entry.notification.is_read)
            .count();
        Ok(count as u64)
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<()> {
        match self.rows.get_mut(&id) {
            Some(mut row) => {
                row.notification.is_read = true;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut updated = 0;
        for mut entry in self.rows.iter_mut() {
            let n = &mut entry.notification;
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn create(&self, new: NewNotification) -> StoreResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            r#type: new.r#type,
            title: new.title,
            message: new.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.insert(notification.clone());
        tracing::debug!(
            id = %notification.id,
            user_id = %notification.user_id,
            kind = %notification.r#type,
            "notification created"
        );
        Ok(notification)
    }
}
