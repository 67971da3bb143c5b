//! User account service

use serde::Deserialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::models::UserProfile;
use shared::types::Role;
use shared::validation::{validate_contact_number, validate_sex};

use crate::error::{AppError, AppResult};
use crate::services::auth::USER_COLUMNS;

/// User service
#[derive(Clone)]
pub struct UserService {
    db: PgPool,
}

/// Profile fields a user may change on their own account
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 150, message = "First name cannot be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150, message = "Last name cannot be empty"))]
    pub last_name: Option<String>,
    #[validate(range(min = 0, max = 150, message = "Age must be between 0 and 150"))]
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub sex: Option<String>,
    #[validate(length(max = 50))]
    pub purok: Option<String>,
    #[validate(length(max = 100))]
    pub barangay: Option<String>,
    #[validate(length(max = 100))]
    pub municipal: Option<String>,
    #[validate(length(max = 100))]
    pub province: Option<String>,
}

/// Admin update: profile fields plus role and activation
#[derive(Debug, Default, Deserialize)]
pub struct AdminUpdateUserInput {
    #[serde(flatten)]
    pub profile: UpdateProfileInput,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserService {
    /// Create a new UserService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Load a user profile
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// All users, newest first
    pub async fn list_users(&self) -> AppResult<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    /// Update the caller's own profile; role and email are not editable here
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        input: UpdateProfileInput,
    ) -> AppResult<UserProfile> {
        validate_profile_update(&input)?;

        let mut conn = self.db.acquire().await?;
        apply_update(&mut conn, user_id, input, None, None).await
    }

    /// Update any account, including role and activation
    ///
    /// The last active admin can be neither demoted nor deactivated.
    pub async fn admin_update(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        input: AdminUpdateUserInput,
    ) -> AppResult<UserProfile> {
        if actor_id == user_id && revokes_admin(input.role, input.is_active) {
            return Err(AppError::validation(
                "role",
                "Admins cannot demote or deactivate their own account",
            ));
        }
        validate_profile_update(&input.profile)?;

        let mut tx = self.db.begin().await?;

        if revokes_admin(input.role, input.is_active) {
            // Row locks serialize concurrent demotions
            let active_admins = sqlx::query_scalar::<_, Uuid>(
                "SELECT id FROM users WHERE role = $1 AND is_active = true FOR UPDATE",
            )
            .bind(Role::Admin.as_str())
            .fetch_all(&mut *tx)
            .await?;

            if active_admins == [user_id] {
                return Err(AppError::validation(
                    "role",
                    "At least one active admin account is required",
                ));
            }
        }

        let user = apply_update(&mut tx, user_id, input.profile, input.role, input.is_active).await?;
        tx.commit().await?;

        tracing::info!(%actor_id, %user_id, role = %user.role, is_active = user.is_active, "User updated by admin");
        Ok(user)
    }
}

/// Whether an update would take admin rights away from an account
fn revokes_admin(role: Option<Role>, is_active: Option<bool>) -> bool {
    role == Some(Role::User) || is_active == Some(false)
}

async fn apply_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    input: UpdateProfileInput,
    role: Option<Role>,
    is_active: Option<bool>,
) -> AppResult<UserProfile> {
    sqlx::query_as::<_, UserProfile>(&format!(
        r#"
        UPDATE users
        SET first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            age = COALESCE($3, age),
            contact_number = COALESCE($4, contact_number),
            sex = COALESCE($5, sex),
            purok = COALESCE($6, purok),
            barangay = COALESCE($7, barangay),
            municipal = COALESCE($8, municipal),
            province = COALESCE($9, province),
            role = COALESCE($10, role),
            is_active = COALESCE($11, is_active),
            updated_at = NOW()
        WHERE id = $12
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(input.first_name.as_deref().map(str::trim))
    .bind(input.last_name.as_deref().map(str::trim))
    .bind(input.age)
    .bind(&input.contact_number)
    .bind(&input.sex)
    .bind(&input.purok)
    .bind(&input.barangay)
    .bind(&input.municipal)
    .bind(&input.province)
    .bind(role.map(|r| r.as_str()))
    .bind(is_active)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("User".to_string()))
}

fn validate_profile_update(input: &UpdateProfileInput) -> AppResult<()> {
    input.validate()?;
    validate_sex(input.sex.as_deref()).map_err(|m| AppError::validation("sex", m))?;
    if let Some(contact) = input.contact_number.as_deref() {
        validate_contact_number(contact).map_err(|m| AppError::validation("contact_number", m))?;
    }
    Ok(())
}
