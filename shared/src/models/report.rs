//! Citizen incident report models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::ReportStatus;

/// A geotagged incident report submitted by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Report {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub name: String,
    pub contact: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub status: ReportStatus,
    pub date_created: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body returned after a status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub message: String,
    pub status: ReportStatus,
}
