//! REST client for the hosted notification table.
//!
//! Routes (relative to the configured base URL):
//! - `GET    /api/v1/notifications?user_id=`         list
//! - `GET    /api/v1/notifications/unread?user_id=`  unread count
//! - `PATCH  /api/v1/notifications/:id`              mark one read
//! - `PATCH  /api/v1/notifications?user_id=`         mark all read
//! - `POST   /api/v1/notifications`                  create

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use super::{NotificationStore, StoreError, StoreResult};
use crate::models::notification::{
    NewNotification, Notification, ReadStatePatch, UnreadCount, UpdatedCount,
};

const READ: ReadStatePatch = ReadStatePatch { is_read: true };

#[derive(Clone)]
pub struct HttpStore {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("portal-notify/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key)),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> StoreResult<Response> {
        let resp = self.authorize(req).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> StoreResult<T> {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NotificationStore for HttpStore {
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<Notification>> {
        let req = self
            .http
            .get(self.url("/notifications"))
            .query(&[("user_id", user_id.to_string())]);
        let resp = self.send(req).await?;
        Self::decode(resp).await
    }

    async fn unread_count(&self, user_id: Uuid) -> StoreResult<u64> {
        let req = self
            .http
            .get(self.url("/notifications/unread"))
            .query(&[("user_id", user_id.to_string())]);
        let resp = self.send(req).await?;
        let body: UnreadCount = Self::decode(resp).await?;
        Ok(body.count)
    }

    async fn mark_read(&self, id: Uuid) -> StoreResult<()> {
        let req = self
            .http
            .patch(self.url(&format!("/notifications/{}", id)))
            .json(&READ);
        match self.send(req).await {
            Ok(_) => Ok(()),
            Err(StoreError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(StoreError::NotFound(id))
            }
            Err(e) => Err(e),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let req = self
            .http
            .patch(self.url("/notifications"))
            .query(&[("user_id", user_id.to_string())])
            .json(&READ);
        let resp = self.send(req).await?;
        let body: UpdatedCount = Self::decode(resp).await?;
        Ok(body.updated)
    }

    async fn create(&self, new: NewNotification) -> StoreResult<Notification> {
        let req = self.http.post(self.url("/notifications")).json(&new);
        let resp = self.send(req).await?;
        Self::decode(resp).await
    }
}
