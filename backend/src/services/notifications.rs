//! In-app notification service
//!
//! Notifications are written alongside report changes (see
//! [`crate::services::reports`]) and read back, marked and cleared by their
//! owner only.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::models::{NewNotification, Notification, Report};

use crate::error::{AppError, AppResult};

pub const REPORT_CREATED_TITLE: &str = "New User Report";
pub const STATUS_UPDATED_TITLE: &str = "Report Status Updated";

/// Characters of the report description quoted in status messages
const DESCRIPTION_PREVIEW_CHARS: usize = 30;

const NOTIFICATION_COLUMNS: &str = "id, user_id, report_id, title, message, is_read, created_at";

/// Notification service
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

/// Unread notification count
#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// Number of rows touched by a bulk operation
#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub message: String,
    pub affected: u64,
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Notifications addressed to the user, newest first
    pub async fn list(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<UnreadCount> {
        let unread = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(UnreadCount { unread })
    }

    /// Mark one of the user's notifications as read
    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> AppResult<BulkResult> {
        let affected = sqlx::query(
            "UPDATE notifications SET is_read = true WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(&self.db)
        .await?
        .rows_affected();

        Ok(BulkResult {
            message: "All notifications marked as read.".to_string(),
            affected,
        })
    }

    /// Delete one of the user's notifications
    pub async fn delete(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }
        Ok(())
    }

    /// Delete every notification of the user
    pub async fn clear_all(&self, user_id: Uuid) -> AppResult<BulkResult> {
        let affected = sqlx::query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        Ok(BulkResult {
            message: "All notifications cleared.".to_string(),
            affected,
        })
    }
}

/// Write pending notifications on an open connection or transaction
pub(crate) async fn insert_notifications(
    conn: &mut PgConnection,
    notifications: &[NewNotification],
) -> AppResult<()> {
    for notification in notifications {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, report_id, title, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.report_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// One notification per admin announcing a newly submitted report
pub fn report_created_notifications(
    report: &Report,
    admin_ids: &[Uuid],
) -> Vec<NewNotification> {
    let message = format!(
        "A new report has been submitted by {}.\n\nDescription: {}\nLocation: ({}, {})",
        report.user_email, report.description, report.latitude, report.longitude
    );

    admin_ids
        .iter()
        .map(|admin_id| NewNotification {
            user_id: *admin_id,
            report_id: Some(report.id),
            title: REPORT_CREATED_TITLE.to_string(),
            message: message.clone(),
        })
        .collect()
}

/// The notification sent to a report's owner after a status change
pub fn status_changed_notification(report: &Report) -> NewNotification {
    let preview: String = report
        .description
        .chars()
        .take(DESCRIPTION_PREVIEW_CHARS)
        .collect();

    NewNotification {
        user_id: report.user_id,
        report_id: Some(report.id),
        title: STATUS_UPDATED_TITLE.to_string(),
        message: format!(
            "Your report '{}...' has been marked as '{}'.",
            preview, report.status
        ),
    }
}
