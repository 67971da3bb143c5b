//! User profile handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use shared::models::UserProfile;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::users::{AdminUpdateUserInput, UpdateProfileInput};
use crate::services::UserService;
use crate::AppState;

/// Get the caller's profile
pub async fn get_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<UserProfile>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get_user(user.user_id).await?))
}

/// Update the caller's profile
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<UpdateProfileInput>,
) -> AppResult<Json<UserProfile>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.update_profile(user.user_id, body).await?))
}

/// List all users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<UserProfile>>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.list_users().await?))
}

/// Get any user's profile
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<UserProfile>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.get_user(user_id).await?))
}

/// Update any user, including role and activation
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    AppJson(body): AppJson<AdminUpdateUserInput>,
) -> AppResult<Json<UserProfile>> {
    let service = UserService::new(state.db.clone());
    Ok(Json(service.admin_update(admin.user_id, user_id, body).await?))
}
