//! User account models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Role;

/// A user account as exposed over the API (never carries the password hash)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub role: Role,
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub purok: Option<String>,
    pub barangay: Option<String>,
    pub municipal: Option<String>,
    pub province: Option<String>,
    pub sex: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
