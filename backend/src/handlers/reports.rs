//! Citizen report handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::models::{Report, StatusChange};

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::reports::{CreateReportInput, StatusUpdateInput, UpdateReportInput};
use crate::services::ReportService;
use crate::AppState;

/// Submit a report
pub async fn create_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(body): AppJson<CreateReportInput>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let service = ReportService::new(state.db.clone());
    let report = service.create_report(user.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// List every report
pub async fn list_reports(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<Vec<Report>>> {
    let service = ReportService::new(state.db.clone());
    Ok(Json(service.list_reports().await?))
}

/// List the caller's own reports
pub async fn my_reports(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Report>>> {
    let service = ReportService::new(state.db.clone());
    Ok(Json(service.list_user_reports(user.user_id).await?))
}

/// Edit a report
pub async fn update_report(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(report_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateReportInput>,
) -> AppResult<Json<Report>> {
    let service = ReportService::new(state.db.clone());
    Ok(Json(service.update_report(report_id, body).await?))
}

/// Change a report's status
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(report_id): Path<Uuid>,
    AppJson(body): AppJson<StatusUpdateInput>,
) -> AppResult<Json<StatusChange>> {
    let service = ReportService::new(state.db.clone());
    Ok(Json(service.update_status(report_id, &body.status).await?))
}
