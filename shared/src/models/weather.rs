//! Weather data models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted weather reading
///
/// `station_id` is `None` for standalone readings taken at the configured
/// default location. At most one row exists per (station, timestamp).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WeatherReading {
    pub id: Uuid,
    pub station_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metrics observed at a single instant, before persistence
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// Per-day aggregate over persisted readings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub reading_count: usize,
    pub avg_temp: Option<f64>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub avg_humidity: Option<f64>,
    pub min_humidity: Option<f64>,
    pub max_humidity: Option<f64>,
    pub avg_wind: Option<f64>,
    pub min_wind: Option<f64>,
    pub max_wind: Option<f64>,
}

/// One day of a live forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub rain_chance: Option<f64>,
    pub wind_max: Option<f64>,
}

/// Live forecast for a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub message: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub data: Vec<DailyForecast>,
}

/// Current conditions at a location, fetched live
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveWeather {
    pub latitude: f64,
    pub longitude: f64,
    pub time: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub wind_speed: Option<f64>,
}
