//! Weather ingestion and read-side service
//!
//! Ingestion walks every registered station sequentially, fetches current
//! conditions plus the trailing day of hourly values and upserts them keyed by
//! (station, timestamp). A failure for one station is recorded in the summary
//! and the run moves on to the next one.

use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::aggregation::{aggregate_daily, history_window_start};
use shared::models::{DailyAggregate, ForecastReport, LiveWeather, Observation, WeatherReading};
use shared::validation::validate_coordinates;

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};
use crate::external::WeatherClient;
use crate::services::stations::StationService;

/// Default number of readings returned per station
pub const DEFAULT_READINGS_LIMIT: i64 = 24;
/// Upper bound on readings returned per station
pub const MAX_READINGS_LIMIT: i64 = 500;

const READING_COLUMNS: &str = "id, station_id, timestamp, temperature, humidity, \
     precipitation_probability, wind_speed, location_name, latitude, longitude, created_at, updated_at";

/// Weather service
#[derive(Clone)]
pub struct WeatherService {
    db: PgPool,
    client: WeatherClient,
    config: WeatherConfig,
}

/// A location to ingest: a registered station or the standalone default
#[derive(Debug, Clone)]
struct IngestionTarget {
    station_id: Option<Uuid>,
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionStatus {
    Ok,
    Error,
}

/// Outcome of ingesting one station
#[derive(Debug, Clone, Serialize)]
pub struct StationIngestion {
    pub station_id: Option<Uuid>,
    pub station_name: String,
    pub status: IngestionStatus,
    pub inserted: usize,
    pub updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestionSummary {
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stations: Vec<StationIngestion>,
}

impl IngestionSummary {
    fn from_results(started_at: DateTime<Utc>, stations: Vec<StationIngestion>) -> Self {
        let failed = stations
            .iter()
            .filter(|s| s.status == IngestionStatus::Error)
            .count();
        let message = if stations.is_empty() {
            "No stations registered".to_string()
        } else if failed == 0 {
            "Weather data fetched successfully".to_string()
        } else {
            format!("Weather fetch failed for {} of {} stations", failed, stations.len())
        };

        Self {
            message,
            started_at,
            finished_at: Utc::now(),
            stations,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.stations
            .iter()
            .any(|s| s.status == IngestionStatus::Error)
    }

    pub fn total_inserted(&self) -> usize {
        self.stations.iter().map(|s| s.inserted).sum()
    }

    pub fn total_updated(&self) -> usize {
        self.stations.iter().map(|s| s.updated).sum()
    }
}

impl WeatherService {
    /// Create a new WeatherService instance
    pub fn new(db: PgPool, client: WeatherClient, config: WeatherConfig) -> Self {
        Self { db, client, config }
    }

    /// Ingest every registered station (or the standalone default location)
    pub async fn ingest_all(&self) -> AppResult<IngestionSummary> {
        let started_at = Utc::now();
        let targets = self.ingestion_targets().await?;

        let mut results = Vec::with_capacity(targets.len());
        for target in &targets {
            let result = match self.ingest_target(target).await {
                Ok((inserted, updated)) => {
                    tracing::info!(
                        station = %target.name,
                        inserted,
                        updated,
                        "Weather ingestion succeeded"
                    );
                    StationIngestion {
                        station_id: target.station_id,
                        station_name: target.name.clone(),
                        status: IngestionStatus::Ok,
                        inserted,
                        updated,
                        error: None,
                    }
                }
                Err(err) => {
                    tracing::warn!(station = %target.name, error = %err, "Weather ingestion failed");
                    StationIngestion {
                        station_id: target.station_id,
                        station_name: target.name.clone(),
                        status: IngestionStatus::Error,
                        inserted: 0,
                        updated: 0,
                        error: Some(err.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let summary = IngestionSummary::from_results(started_at, results);
        tracing::info!(
            stations = summary.stations.len(),
            inserted = summary.total_inserted(),
            updated = summary.total_updated(),
            failed = summary.has_failures(),
            "Weather ingestion run finished"
        );

        Ok(summary)
    }

    async fn ingestion_targets(&self) -> AppResult<Vec<IngestionTarget>> {
        let stations = StationService::new(self.db.clone()).list_stations().await?;

        if stations.is_empty() && self.config.standalone_fallback {
            let location = &self.config.default_location;
            return Ok(vec![IngestionTarget {
                station_id: None,
                name: location.name.clone(),
                latitude: location.latitude,
                longitude: location.longitude,
            }]);
        }

        Ok(stations
            .into_iter()
            .map(|s| IngestionTarget {
                station_id: Some(s.id),
                name: s.name,
                latitude: s.latitude,
                longitude: s.longitude,
            })
            .collect())
    }

    /// Fetch and upsert one target; returns (inserted, updated)
    async fn ingest_target(&self, target: &IngestionTarget) -> AppResult<(usize, usize)> {
        let observations = self
            .client
            .fetch_observations(target.latitude, target.longitude)
            .await?;

        let mut tx = self.db.begin().await?;
        let (mut inserted, mut updated) = (0, 0);
        for observation in &observations {
            if upsert_reading(&mut tx, target, observation).await? {
                inserted += 1;
            } else {
                updated += 1;
            }
        }
        tx.commit().await?;

        Ok((inserted, updated))
    }

    /// Daily aggregates over the trailing seven days
    pub async fn history(&self, station_id: Option<Uuid>) -> AppResult<Vec<DailyAggregate>> {
        let since = history_window_start(Utc::now().date_naive());
        let since_ts = Utc.from_utc_datetime(&since.and_time(NaiveTime::MIN));

        let readings = sqlx::query_as::<_, WeatherReading>(&format!(
            r#"
            SELECT {READING_COLUMNS}
            FROM weather_data
            WHERE timestamp >= $1 AND ($2::uuid IS NULL OR station_id = $2)
            ORDER BY timestamp
            "#
        ))
        .bind(since_ts)
        .bind(station_id)
        .fetch_all(&self.db)
        .await?;

        Ok(aggregate_daily(&readings, since))
    }

    /// Most recent readings of a station, newest first
    pub async fn station_readings(
        &self,
        station_id: Uuid,
        limit: Option<i64>,
    ) -> AppResult<Vec<WeatherReading>> {
        StationService::new(self.db.clone())
            .get_station(station_id)
            .await?;

        let readings = sqlx::query_as::<_, WeatherReading>(&format!(
            r#"
            SELECT {READING_COLUMNS}
            FROM weather_data
            WHERE station_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#
        ))
        .bind(station_id)
        .bind(clamp_limit(limit))
        .fetch_all(&self.db)
        .await?;

        Ok(readings)
    }

    /// Live daily forecast for the given or the default coordinates
    pub async fn forecast(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> AppResult<ForecastReport> {
        let default = &self.config.default_location;
        let (location, latitude, longitude) = match (latitude, longitude) {
            (None, None) => (default.name.clone(), default.latitude, default.longitude),
            (Some(lat), Some(lon)) => {
                validate_coordinates(lat, lon).map_err(|m| AppError::validation("latitude", m))?;
                (format!("{}, {}", lat, lon), lat, lon)
            }
            _ => {
                return Err(AppError::validation(
                    "latitude",
                    "Both latitude and longitude are required",
                ))
            }
        };

        let data = self
            .client
            .fetch_daily_forecast(latitude, longitude, self.config.forecast_days)
            .await?;

        Ok(ForecastReport {
            message: format!("{}-day forecast", self.config.forecast_days),
            location,
            latitude,
            longitude,
            data,
        })
    }

    /// Current conditions at a coordinate pair
    pub async fn live(&self, latitude: Option<f64>, longitude: Option<f64>) -> AppResult<LiveWeather> {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Err(AppError::validation(
                "lat",
                "Both lat and lon query parameters are required",
            ));
        };
        validate_coordinates(latitude, longitude).map_err(|m| AppError::validation("lat", m))?;

        self.client.fetch_current(latitude, longitude).await
    }
}

/// Insert or overwrite one reading; returns `true` when a row was inserted
async fn upsert_reading(
    tx: &mut Transaction<'_, Postgres>,
    target: &IngestionTarget,
    observation: &Observation,
) -> AppResult<bool> {
    let conflict_target = match target.station_id {
        Some(_) => "(station_id, timestamp)",
        None => "(timestamp) WHERE station_id IS NULL",
    };

    let inserted = sqlx::query_scalar::<_, bool>(&format!(
        r#"
        INSERT INTO weather_data (station_id, timestamp, temperature, humidity,
                                  precipitation_probability, wind_speed,
                                  location_name, latitude, longitude)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT {conflict_target} DO UPDATE
        SET temperature = EXCLUDED.temperature,
            humidity = EXCLUDED.humidity,
            precipitation_probability = EXCLUDED.precipitation_probability,
            wind_speed = EXCLUDED.wind_speed,
            location_name = EXCLUDED.location_name,
            latitude = EXCLUDED.latitude,
            longitude = EXCLUDED.longitude,
            updated_at = NOW()
        RETURNING (xmax = 0) AS inserted
        "#
    ))
    .bind(target.station_id)
    .bind(observation.timestamp)
    .bind(observation.temperature)
    .bind(observation.humidity)
    .bind(observation.precipitation_probability)
    .bind(observation.wind_speed)
    .bind(&target.name)
    .bind(target.latitude)
    .bind(target.longitude)
    .fetch_one(&mut **tx)
    .await?;

    Ok(inserted)
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_READINGS_LIMIT)
        .clamp(1, MAX_READINGS_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::{
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use crate::config::LocationConfig;
    use crate::services::stations::CreateStationInput;

    /// Stations at this latitude get a 500 from the stub upstream
    const FAILING_LATITUDE: &str = "8.15";

    async fn forecast_stub(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("latitude").map(String::as_str) == Some(FAILING_LATITUDE) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "upstream unavailable").into_response();
        }

        // June 1 00:00 .. June 2 23:00, current at June 2 10:00
        let times: Vec<String> = (0..48)
            .map(|h| format!("2024-06-{:02}T{:02}:00", 1 + h / 24, h % 24))
            .collect();
        let temperatures: Vec<f64> = (0..48).map(|h| 22.0 + h as f64 / 10.0).collect();

        Json(json!({
            "current": {
                "time": "2024-06-02T10:00",
                "temperature_2m": 31.5,
                "relative_humidity_2m": 64.0,
                "precipitation_probability": 20.0,
                "wind_speed_10m": 7.2
            },
            "hourly": { "time": times, "temperature_2m": temperatures }
        }))
        .into_response()
    }

    async fn stub_upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/forecast", get(forecast_stub));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn weather_service(pool: PgPool, standalone_fallback: bool) -> WeatherService {
        let config = WeatherConfig {
            api_endpoint: stub_upstream().await,
            request_timeout_secs: 5,
            forecast_days: 3,
            standalone_fallback,
            default_location: LocationConfig {
                name: "CMU Campus".to_string(),
                latitude: 7.85,
                longitude: 125.05,
            },
        };
        let client =
            WeatherClient::with_base_url(config.api_endpoint.clone(), Duration::from_secs(5)).unwrap();
        WeatherService::new(pool, client, config)
    }

    async fn add_station(pool: &PgPool, name: &str, latitude: f64) -> Uuid {
        StationService::new(pool.clone())
            .create_station(CreateStationInput {
                name: name.to_string(),
                latitude,
                longitude: 125.06,
                elevation: None,
                description: String::new(),
            })
            .await
            .unwrap()
            .station
            .id
    }

    async fn station_timestamps(pool: &PgPool, station_id: Option<Uuid>) -> Vec<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            "SELECT timestamp FROM weather_data \
             WHERE station_id IS NOT DISTINCT FROM $1 ORDER BY timestamp",
        )
        .bind(station_id)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_repeated_ingestion_updates_instead_of_duplicating(pool: PgPool) {
        let station_id = add_station(&pool, "Musuan", 7.88).await;
        let service = weather_service(pool.clone(), true).await;

        let first = service.ingest_all().await.unwrap();
        assert!(!first.has_failures());
        assert_eq!(first.stations[0].station_id, Some(station_id));
        assert_eq!((first.total_inserted(), first.total_updated()), (25, 0));

        let second = service.ingest_all().await.unwrap();
        assert_eq!((second.total_inserted(), second.total_updated()), (0, 25));

        let timestamps = station_timestamps(&pool, Some(station_id)).await;
        assert_eq!(timestamps.len(), 25);
        assert_eq!(
            timestamps.first().copied(),
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            timestamps.last().copied(),
            Some(Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap())
        );
        assert!(timestamps
            .windows(2)
            .all(|w| w[1] - w[0] == chrono::Duration::hours(1)));

        let current_temperature = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT temperature FROM weather_data WHERE station_id = $1 AND timestamp = $2",
        )
        .bind(station_id)
        .bind(Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(current_temperature, Some(31.5));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_failing_station_does_not_stop_the_run(pool: PgPool) {
        let healthy = add_station(&pool, "Musuan", 7.88).await;
        let failing = add_station(&pool, "Valencia", 8.15).await;
        let service = weather_service(pool.clone(), true).await;

        let summary = service.ingest_all().await.unwrap();

        assert!(summary.has_failures());
        assert_eq!(summary.message, "Weather fetch failed for 1 of 2 stations");
        let outcome = |id: Uuid| {
            summary
                .stations
                .iter()
                .find(|s| s.station_id == Some(id))
                .unwrap()
        };
        assert_eq!(outcome(healthy).status, IngestionStatus::Ok);
        assert_eq!(outcome(healthy).inserted, 25);
        assert_eq!(outcome(failing).status, IngestionStatus::Error);
        assert!(outcome(failing).error.is_some());

        assert_eq!(station_timestamps(&pool, Some(healthy)).await.len(), 25);
        assert!(station_timestamps(&pool, Some(failing)).await.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_default_location_is_ingested_without_stations(pool: PgPool) {
        let service = weather_service(pool.clone(), true).await;

        let first = service.ingest_all().await.unwrap();
        assert_eq!(first.stations.len(), 1);
        assert_eq!(first.stations[0].station_id, None);
        assert_eq!(first.stations[0].station_name, "CMU Campus");
        assert_eq!(first.total_inserted(), 25);

        let second = service.ingest_all().await.unwrap();
        assert_eq!((second.total_inserted(), second.total_updated()), (0, 25));
        assert_eq!(station_timestamps(&pool, None).await.len(), 25);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_no_stations_and_no_fallback_ingests_nothing(pool: PgPool) {
        let service = weather_service(pool.clone(), false).await;

        let summary = service.ingest_all().await.unwrap();

        assert!(summary.stations.is_empty());
        assert_eq!(summary.message, "No stations registered");
        assert!(station_timestamps(&pool, None).await.is_empty());
    }

    fn outcome(name: &str, status: IngestionStatus, inserted: usize) -> StationIngestion {
        StationIngestion {
            station_id: Some(Uuid::new_v4()),
            station_name: name.to_string(),
            status,
            inserted,
            updated: 1,
            error: (status == IngestionStatus::Error).then(|| "timeout".to_string()),
        }
    }

    #[test]
    fn test_summary_reports_failures() {
        let summary = IngestionSummary::from_results(
            Utc::now(),
            vec![
                outcome("Musuan", IngestionStatus::Ok, 25),
                outcome("Valencia", IngestionStatus::Error, 0),
            ],
        );

        assert!(summary.has_failures());
        assert_eq!(summary.total_inserted(), 25);
        assert_eq!(summary.message, "Weather fetch failed for 1 of 2 stations");
    }

    #[test]
    fn test_summary_all_ok() {
        let summary = IngestionSummary::from_results(
            Utc::now(),
            vec![outcome("Musuan", IngestionStatus::Ok, 3)],
        );
        assert!(!summary.has_failures());
        assert_eq!(summary.total_updated(), 1);
        assert_eq!(summary.message, "Weather data fetched successfully");
    }

    #[test]
    fn test_summary_serializes_lowercase_status() {
        let summary = IngestionSummary::from_results(
            Utc::now(),
            vec![outcome("Valencia", IngestionStatus::Error, 0)],
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stations"][0]["status"], "error");
        assert_eq!(json["stations"][0]["error"], "timeout");
    }

    #[test]
    fn test_readings_limit_is_clamped() {
        assert_eq!(clamp_limit(None), DEFAULT_READINGS_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_READINGS_LIMIT);
    }
}
