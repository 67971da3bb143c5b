//! Notification handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::Notification;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::notifications::{BulkResult, UnreadCount};
use crate::services::NotificationService;
use crate::AppState;

/// List the caller's notifications, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    let service = NotificationService::new(state.db.clone());
    Ok(Json(service.list(user.user_id).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UnreadCount>> {
    let service = NotificationService::new(state.db.clone());
    Ok(Json(service.unread_count(user.user_id).await?))
}

pub async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let service = NotificationService::new(state.db.clone());
    Ok(Json(service.mark_read(user.user_id, notification_id).await?))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<BulkResult>> {
    let service = NotificationService::new(state.db.clone());
    Ok(Json(service.mark_all_read(user.user_id).await?))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = NotificationService::new(state.db.clone());
    service.delete(user.user_id, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete all of the caller's notifications
pub async fn clear_all(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<BulkResult>> {
    let service = NotificationService::new(state.db.clone());
    Ok(Json(service.clear_all(user.user_id).await?))
}
