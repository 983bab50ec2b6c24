//! Remote Notification Store boundary.
//!
//! `NotificationSync` only ever talks to a `NotificationStore`. The HTTP
//! client is what the portal uses in production; the in-memory store backs
//! the dev server and tests.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::notification::{NewNotification, Notification};

pub mod http;
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("notification not found: {0}")]
    NotFound(Uuid),

    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid store response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// All notifications owned by `user_id`, in whatever order the store keeps them.
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Notification>>;

    async fn unread_count(&self, user_id: Uuid) -> StoreResult<u64>;

    /// Set `is_read = true` on a single notification.
    async fn mark_read(&self, id: Uuid) -> StoreResult<()>;

    /// Set `is_read = true` on every notification owned by `user_id`.
    /// Returns the number of rows that changed.
    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn create(&self, new: NewNotification) -> StoreResult<Notification>;
}
