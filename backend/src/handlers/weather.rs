//! Weather ingestion, history, forecast and live handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{DailyAggregate, ForecastReport, LiveWeather};
use shared::types::MessageResponse;

use crate::error::AppResult;
use crate::extract::AppQuery;
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::weather::IngestionSummary;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub station_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct LiveQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Run one ingestion pass now; any failed station turns the answer into 502
pub async fn fetch_weather(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> AppResult<(StatusCode, Json<IngestionSummary>)> {
    tracing::info!(admin = %admin.email, "Manual weather ingestion triggered");
    let summary = state.weather_service().ingest_all().await?;

    let status = if summary.has_failures() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    Ok((status, Json(summary)))
}

/// Daily aggregates of the past week
pub async fn history(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppQuery(query): AppQuery<HistoryQuery>,
) -> AppResult<Json<MessageResponse<Vec<DailyAggregate>>>> {
    let data = state.weather_service().history(query.station_id).await?;
    Ok(Json(MessageResponse::new("Weather history (past week)", data)))
}

/// Live daily forecast
pub async fn forecast(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppQuery(query): AppQuery<ForecastQuery>,
) -> AppResult<Json<ForecastReport>> {
    let report = state
        .weather_service()
        .forecast(query.latitude, query.longitude)
        .await?;
    Ok(Json(report))
}

/// Live current conditions
pub async fn live(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppQuery(query): AppQuery<LiveQuery>,
) -> AppResult<Json<LiveWeather>> {
    let weather = state.weather_service().live(query.lat, query.lon).await?;
    Ok(Json(weather))
}
