use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::ApiState;
use crate::errors::AppError;
use crate::models::notification::{
    NewNotification, Notification, ReadStatePatch, UnreadCount, UpdatedCount,
};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}

fn require_read(patch: ReadStatePatch) -> Result<(), AppError> {
    if patch.is_read {
        Ok(())
    } else {
        Err(AppError::ReadStateRegression)
    }
}

/// GET /api/v1/notifications?user_id= - all notifications for a user
pub async fn list_notifications(
    State(store): State<ApiState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let rows = store.list(params.user_id).await?;
    Ok(Json(rows))
}

/// GET /api/v1/notifications/unread?user_id= - count unread
pub async fn count_unread_notifications(
    State(store): State<ApiState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<UnreadCount>, AppError> {
    let count = store.unread_count(params.user_id).await?;
    Ok(Json(UnreadCount { count }))
}

/// PATCH /api/v1/notifications/:id - mark one as read
pub async fn mark_notification_read(
    State(store): State<ApiState>,
    Path(id_str): Path<String>,
    Json(patch): Json<ReadStatePatch>,
) -> Result<Json<UpdatedCount>, AppError> {
    let id = Uuid::parse_str(&id_str)
        .map_err(|_| AppError::BadRequest(format!("invalid notification id '{}'", id_str)))?;
    require_read(patch)?;

    store.mark_read(id).await?;
    tracing::debug!(%id, "notification marked read");
    Ok(Json(UpdatedCount { updated: 1 }))
}

/// PATCH /api/v1/notifications?user_id= - mark all of a user's notifications as read
pub async fn mark_all_notifications_read(
    State(store): State<ApiState>,
    Query(params): Query<UserQuery>,
    Json(patch): Json<ReadStatePatch>,
) -> Result<Json<UpdatedCount>, AppError> {
    require_read(patch)?;

    let updated = store.mark_all_read(params.user_id).await?;
    tracing::debug!(user_id = %params.user_id, updated, "notifications marked read");
    Ok(Json(UpdatedCount { updated }))
}

/// POST /api/v1/notifications - create
pub async fn create_notification(
    State(store): State<ApiState>,
    Json(new): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    if new.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".into()));
    }
    let created = store.create(new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
