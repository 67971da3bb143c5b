//! Station registry handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::{StationOverview, WeatherReading};

use crate::error::AppResult;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::{AdminUser, CurrentUser};
use crate::services::stations::{CreateStationInput, UpdateStationInput};
use crate::services::StationService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub limit: Option<i64>,
}

/// List stations with their latest reading
pub async fn list_stations(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> AppResult<Json<Vec<StationOverview>>> {
    let service = StationService::new(state.db.clone());
    Ok(Json(service.list_overviews().await?))
}

pub async fn get_station(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(station_id): Path<Uuid>,
) -> AppResult<Json<StationOverview>> {
    let service = StationService::new(state.db.clone());
    Ok(Json(service.get_overview(station_id).await?))
}

/// Register a station
pub async fn create_station(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppJson(body): AppJson<CreateStationInput>,
) -> AppResult<(StatusCode, Json<StationOverview>)> {
    let service = StationService::new(state.db.clone());
    let station = service.create_station(body).await?;
    Ok((StatusCode::CREATED, Json(station)))
}

pub async fn update_station(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(station_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateStationInput>,
) -> AppResult<Json<StationOverview>> {
    let service = StationService::new(state.db.clone());
    Ok(Json(service.update_station(station_id, body).await?))
}

pub async fn delete_station(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(station_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = StationService::new(state.db.clone());
    service.delete_station(station_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Most recent readings of one station
pub async fn station_readings(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(station_id): Path<Uuid>,
    AppQuery(query): AppQuery<ReadingsQuery>,
) -> AppResult<Json<Vec<WeatherReading>>> {
    let readings = state
        .weather_service()
        .station_readings(station_id, query.limit)
        .await?;
    Ok(Json(readings))
}
