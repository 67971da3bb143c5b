//! Citizen report service
//!
//! Every report write and the notifications it triggers share one
//! transaction: a report is never stored without its notifications.

use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::{Report, StatusChange};
use shared::types::{ReportStatus, Role};
use shared::validation::validate_coordinates;

use crate::error::{AppError, AppResult};
use crate::services::notifications::{
    insert_notifications, report_created_notifications, status_changed_notification,
};

const REPORT_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.email AS user_email, r.name, r.contact, r.description,
           r.latitude, r.longitude, r.image, r.status, r.date_created, r.updated_at
    FROM reports r
    JOIN users u ON u.id = r.user_id
"#;

/// Report service
#[derive(Clone)]
pub struct ReportService {
    db: PgPool,
}

/// Input for submitting a report
#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Contact is required"))]
    pub contact: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(max = 500))]
    pub image: Option<String>,
}

/// Admin edit of a report; a present `status` notifies the owner
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateReportInput {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Contact cannot be empty"))]
    pub contact: Option<String>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(length(max = 500))]
    pub image: Option<String>,
    pub status: Option<String>,
}

/// Body of a status patch
#[derive(Debug, Deserialize)]
pub struct StatusUpdateInput {
    pub status: String,
}

impl ReportService {
    /// Create a new ReportService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Submit a report and notify every active admin
    pub async fn create_report(&self, user_id: Uuid, input: CreateReportInput) -> AppResult<Report> {
        input.validate()?;
        validate_coordinates(input.latitude, input.longitude)
            .map_err(|m| AppError::validation("latitude", m))?;

        let mut tx = self.db.begin().await?;

        let report_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO reports (user_id, name, contact, description, latitude, longitude, image, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(input.name.trim())
        .bind(input.contact.trim())
        .bind(&input.description)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(&input.image)
        .bind(ReportStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let report = fetch_report(&mut tx, report_id).await?;

        let admin_ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE role = $1 AND is_active = true ORDER BY created_at",
        )
        .bind(Role::Admin.as_str())
        .fetch_all(&mut *tx)
        .await?;

        if admin_ids.is_empty() {
            tracing::warn!(%report_id, "No active admin to notify about new report");
        }

        insert_notifications(&mut tx, &report_created_notifications(&report, &admin_ids)).await?;
        tx.commit().await?;

        tracing::info!(%report_id, %user_id, admins = admin_ids.len(), "Report submitted");
        Ok(report)
    }

    /// All reports, newest first
    pub async fn list_reports(&self) -> AppResult<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            "{REPORT_SELECT} ORDER BY r.date_created DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(reports)
    }

    /// Reports submitted by one user, newest first
    pub async fn list_user_reports(&self, user_id: Uuid) -> AppResult<Vec<Report>> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            "{REPORT_SELECT} WHERE r.user_id = $1 ORDER BY r.date_created DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(reports)
    }

    /// Edit a report; omitted fields keep their value
    pub async fn update_report(&self, report_id: Uuid, input: UpdateReportInput) -> AppResult<Report> {
        input.validate()?;
        let status = input.status.as_deref().map(parse_status).transpose()?;

        let mut tx = self.db.begin().await?;
        let existing = fetch_report(&mut tx, report_id).await?;

        let latitude = input.latitude.unwrap_or(existing.latitude);
        let longitude = input.longitude.unwrap_or(existing.longitude);
        validate_coordinates(latitude, longitude)
            .map_err(|m| AppError::validation("latitude", m))?;

        sqlx::query(
            r#"
            UPDATE reports
            SET name = $1, contact = $2, description = $3, latitude = $4, longitude = $5,
                image = $6, status = $7, updated_at = NOW()
            WHERE id = $8
            "#,
        )
        .bind(input.name.as_deref().map(str::trim).unwrap_or(&existing.name))
        .bind(input.contact.as_deref().map(str::trim).unwrap_or(&existing.contact))
        .bind(input.description.as_deref().unwrap_or(&existing.description))
        .bind(latitude)
        .bind(longitude)
        .bind(input.image.as_ref().or(existing.image.as_ref()))
        .bind(status.unwrap_or(existing.status).as_str())
        .bind(report_id)
        .execute(&mut *tx)
        .await?;

        let report = fetch_report(&mut tx, report_id).await?;
        if status.is_some() {
            insert_notifications(&mut tx, &[status_changed_notification(&report)]).await?;
        }
        tx.commit().await?;

        Ok(report)
    }

    /// Set a report's status and notify its owner
    pub async fn update_status(&self, report_id: Uuid, status: &str) -> AppResult<StatusChange> {
        let status = parse_status(status)?;

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query("UPDATE reports SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(report_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound("Report".to_string()));
        }

        let report = fetch_report(&mut tx, report_id).await?;
        insert_notifications(&mut tx, &[status_changed_notification(&report)]).await?;
        tx.commit().await?;

        tracing::info!(%report_id, %status, "Report status updated");
        Ok(StatusChange {
            message: "Status updated successfully.".to_string(),
            status,
        })
    }
}

async fn fetch_report(conn: &mut PgConnection, report_id: Uuid) -> AppResult<Report> {
    sqlx::query_as::<_, Report>(&format!("{REPORT_SELECT} WHERE r.id = $1"))
        .bind(report_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Report".to_string()))
}

/// Parse a client-supplied status, rejecting anything outside the workflow
pub fn parse_status(raw: &str) -> AppResult<ReportStatus> {
    raw.parse::<ReportStatus>()
        .map_err(|_| AppError::validation("status", "Invalid status value."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::{REPORT_CREATED_TITLE, STATUS_UPDATED_TITLE};

    async fn add_user(pool: &PgPool, email: &str, role: Role, is_active: bool) -> Uuid {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO users (email, password_hash, role, first_name, is_active) \
             VALUES ($1, 'not-a-real-hash', $2, 'Test', $3) RETURNING id",
        )
        .bind(email)
        .bind(role.as_str())
        .bind(is_active)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn flood_report() -> CreateReportInput {
        CreateReportInput {
            name: "Juan Dela Cruz".to_string(),
            contact: "09171234567".to_string(),
            description: "Flooded road near the market".to_string(),
            latitude: 7.86,
            longitude: 125.06,
            image: None,
        }
    }

    /// (recipient, title) of every notification about a report
    async fn notifications_for(pool: &PgPool, report_id: Uuid) -> Vec<(Uuid, String)> {
        sqlx::query_as::<_, (Uuid, String)>(
            "SELECT user_id, title FROM notifications WHERE report_id = $1 ORDER BY created_at, user_id",
        )
        .bind(report_id)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_new_report_notifies_each_active_admin(pool: PgPool) {
        let first_admin = add_user(&pool, "admin1@example.com", Role::Admin, true).await;
        let second_admin = add_user(&pool, "admin2@example.com", Role::Admin, true).await;
        add_user(&pool, "retired@example.com", Role::Admin, false).await;
        let citizen = add_user(&pool, "juan@example.com", Role::User, true).await;

        let report = ReportService::new(pool.clone())
            .create_report(citizen, flood_report())
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.user_email, "juan@example.com");

        let notifications = notifications_for(&pool, report.id).await;
        assert_eq!(notifications.len(), 2);
        let mut recipients: Vec<Uuid> = notifications.iter().map(|(user, _)| *user).collect();
        recipients.sort();
        let mut admins = vec![first_admin, second_admin];
        admins.sort();
        assert_eq!(recipients, admins);
        assert!(notifications
            .iter()
            .all(|(_, title)| title == REPORT_CREATED_TITLE));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_report_without_admins_is_still_stored(pool: PgPool) {
        let citizen = add_user(&pool, "juan@example.com", Role::User, true).await;
        let service = ReportService::new(pool.clone());

        let report = service.create_report(citizen, flood_report()).await.unwrap();

        assert!(notifications_for(&pool, report.id).await.is_empty());
        assert_eq!(service.list_user_reports(citizen).await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_status_change_notifies_owner_once(pool: PgPool) {
        add_user(&pool, "admin@example.com", Role::Admin, true).await;
        let citizen = add_user(&pool, "juan@example.com", Role::User, true).await;
        let service = ReportService::new(pool.clone());
        let report = service.create_report(citizen, flood_report()).await.unwrap();

        let change = service.update_status(report.id, "In Progress").await.unwrap();
        assert_eq!(change.status, ReportStatus::InProgress);

        let owner_notifications: Vec<_> = notifications_for(&pool, report.id)
            .await
            .into_iter()
            .filter(|(user, _)| *user == citizen)
            .collect();
        assert_eq!(owner_notifications.len(), 1);
        assert_eq!(owner_notifications[0].1, STATUS_UPDATED_TITLE);

        let stored = service.list_user_reports(citizen).await.unwrap();
        assert_eq!(stored[0].status, ReportStatus::InProgress);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_edit_notifies_owner_only_when_status_given(pool: PgPool) {
        let citizen = add_user(&pool, "juan@example.com", Role::User, true).await;
        let service = ReportService::new(pool.clone());
        let report = service.create_report(citizen, flood_report()).await.unwrap();

        let edited = service
            .update_report(
                report.id,
                UpdateReportInput {
                    description: Some("Flooded road, knee deep".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.description, "Flooded road, knee deep");
        assert!(notifications_for(&pool, report.id).await.is_empty());

        service
            .update_report(
                report.id,
                UpdateReportInput {
                    status: Some("Resolved".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            notifications_for(&pool, report.id).await,
            vec![(citizen, STATUS_UPDATED_TITLE.to_string())]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_status_change_on_unknown_report_writes_nothing(pool: PgPool) {
        let result = ReportService::new(pool.clone())
            .update_status(Uuid::new_v4(), "Resolved")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_parse_known_statuses() {
        assert_eq!(parse_status("Pending").unwrap(), ReportStatus::Pending);
        assert_eq!(parse_status("In Progress").unwrap(), ReportStatus::InProgress);
        assert_eq!(parse_status("Resolved").unwrap(), ReportStatus::Resolved);
    }

    #[test]
    fn test_unknown_status_is_validation_error() {
        match parse_status("Closed") {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "status");
                assert_eq!(message, "Invalid status value.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_create_input_requires_description() {
        let input = CreateReportInput {
            name: "Juan Dela Cruz".to_string(),
            contact: "09171234567".to_string(),
            description: String::new(),
            latitude: 7.86,
            longitude: 125.06,
            image: None,
        };
        assert!(input.validate().is_err());
    }
}
