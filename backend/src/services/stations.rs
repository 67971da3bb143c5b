//! Station registry service

use std::borrow::Cow;

use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use shared::models::{Station, StationOverview};
use shared::validation::validate_coordinates;

use crate::error::{AppError, AppResult};

/// Maximum station name length
pub const MAX_STATION_NAME_LENGTH: usize = 128;

const STATION_COLUMNS: &str =
    "s.id, s.name, s.latitude, s.longitude, s.elevation, s.description, s.created_at, s.updated_at";

/// Station service for managing monitoring stations
#[derive(Clone)]
pub struct StationService {
    db: PgPool,
}

/// Input for creating a station
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStationInput {
    #[validate(custom = "validate_station_name")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[validate(custom = "validate_elevation")]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub description: String,
}

/// Input for updating a station
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStationInput {
    #[validate(custom = "validate_station_name")]
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(custom = "validate_elevation")]
    pub elevation: Option<f64>,
    pub description: Option<String>,
}

impl StationService {
    /// Create a new StationService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All stations ordered by name, without readings
    pub async fn list_stations(&self) -> AppResult<Vec<Station>> {
        let stations = sqlx::query_as::<_, Station>(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s ORDER BY s.name, s.id"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(stations)
    }

    /// All stations ordered by name, each with its latest reading
    pub async fn list_overviews(&self) -> AppResult<Vec<StationOverview>> {
        let stations = sqlx::query_as::<_, StationOverview>(&overview_query(""))
            .fetch_all(&self.db)
            .await?;

        Ok(stations)
    }

    /// One station with its latest reading
    pub async fn get_overview(&self, station_id: Uuid) -> AppResult<StationOverview> {
        sqlx::query_as::<_, StationOverview>(&overview_query("WHERE s.id = $1"))
            .bind(station_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Station".to_string()))
    }

    /// Load a station by ID
    pub async fn get_station(&self, station_id: Uuid) -> AppResult<Station> {
        sqlx::query_as::<_, Station>(&format!(
            "SELECT {STATION_COLUMNS} FROM stations s WHERE s.id = $1"
        ))
        .bind(station_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Station".to_string()))
    }

    /// Register a new station
    pub async fn create_station(&self, input: CreateStationInput) -> AppResult<StationOverview> {
        input.validate()?;
        validate_coordinates(input.latitude, input.longitude)
            .map_err(|m| AppError::validation("latitude", m))?;
        let name = input.name.trim();

        let station_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stations (name, latitude, longitude, elevation, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(input.latitude)
        .bind(input.longitude)
        .bind(input.elevation)
        .bind(input.description.trim())
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%station_id, name, "Station registered");
        self.get_overview(station_id).await
    }

    /// Update a station; omitted fields keep their value
    pub async fn update_station(
        &self,
        station_id: Uuid,
        input: UpdateStationInput,
    ) -> AppResult<StationOverview> {
        input.validate()?;
        let existing = self.get_station(station_id).await?;

        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name);
        let latitude = input.latitude.unwrap_or(existing.latitude);
        let longitude = input.longitude.unwrap_or(existing.longitude);
        validate_coordinates(latitude, longitude)
            .map_err(|m| AppError::validation("latitude", m))?;
        let elevation = input.elevation.or(existing.elevation);
        let description = input
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or(existing.description);

        sqlx::query(
            r#"
            UPDATE stations
            SET name = $1, latitude = $2, longitude = $3, elevation = $4,
                description = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&name)
        .bind(latitude)
        .bind(longitude)
        .bind(elevation)
        .bind(&description)
        .bind(station_id)
        .execute(&self.db)
        .await?;

        self.get_overview(station_id).await
    }

    /// Delete a station (cascade removes its readings)
    pub async fn delete_station(&self, station_id: Uuid) -> AppResult<()> {
        let deleted = sqlx::query("DELETE FROM stations WHERE id = $1")
            .bind(station_id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Station".to_string()));
        }

        tracing::info!(%station_id, "Station deleted");
        Ok(())
    }
}

fn overview_query(filter: &str) -> String {
    format!(
        r#"
        SELECT {STATION_COLUMNS},
               w.temperature, w.humidity, w.precipitation_probability AS rain_chance,
               w.wind_speed, w.timestamp AS last_updated
        FROM stations s
        LEFT JOIN LATERAL (
            SELECT temperature, humidity, precipitation_probability, wind_speed, timestamp
            FROM weather_data
            WHERE station_id = s.id
            ORDER BY timestamp DESC
            LIMIT 1
        ) w ON true
        {filter}
        ORDER BY s.name, s.id
        "#
    )
}

fn validate_station_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("station_name", "Station name cannot be empty"));
    }
    if name.chars().count() > MAX_STATION_NAME_LENGTH {
        return Err(invalid(
            "station_name",
            "Station name must be at most 128 characters",
        ));
    }
    Ok(())
}

fn validate_elevation(elevation: f64) -> Result<(), ValidationError> {
    if !elevation.is_finite() {
        return Err(invalid("elevation", "Elevation must be a finite number"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input(name: &str) -> CreateStationInput {
        CreateStationInput {
            name: name.to_string(),
            latitude: 7.88,
            longitude: 125.06,
            elevation: Some(320.0),
            description: String::new(),
        }
    }

    #[test]
    fn test_station_name_rules() {
        assert!(create_input("  Musuan Station ").validate().is_ok());
        assert!(create_input(&"x".repeat(128)).validate().is_ok());
        assert!(create_input(&"x".repeat(129)).validate().is_err());

        match AppError::from(create_input("   ").validate().unwrap_err()) {
            AppError::Validation { field, message } => {
                assert_eq!(field, "name");
                assert_eq!(message, "Station name cannot be empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_overview_query_filters_before_ordering() {
        let query = overview_query("WHERE s.id = $1");
        let filter = query.find("WHERE s.id").unwrap();
        let order = query.rfind("ORDER BY s.name").unwrap();
        assert!(filter < order);
    }

    #[test]
    fn test_elevation_must_be_finite() {
        let mut input = create_input("Musuan");
        input.elevation = None;
        assert!(input.validate().is_ok());
        input.elevation = Some(f64::NAN);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_partial_update_checks_only_present_fields() {
        assert!(UpdateStationInput::default().validate().is_ok());

        let input = UpdateStationInput {
            name: Some(String::new()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
