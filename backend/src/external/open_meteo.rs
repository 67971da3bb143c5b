//! Open-Meteo forecast API client
//!
//! One endpoint (`/forecast`) serves the three shapes used here: current
//! conditions plus the trailing hourly series for ingestion, daily aggregates
//! for the forecast view and current conditions for the live view.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};

use shared::models::{DailyForecast, LiveWeather, Observation};

use crate::config::WeatherConfig;
use crate::error::{AppError, AppResult};

const CURRENT_VARIABLES: &str =
    "temperature_2m,relative_humidity_2m,precipitation_probability,wind_speed_10m";
const HOURLY_VARIABLES: &str = CURRENT_VARIABLES;
const DAILY_VARIABLES: &str =
    "temperature_2m_max,temperature_2m_min,precipitation_probability_mean,wind_speed_10m_max";

/// Hours of hourly history kept per ingestion run
pub const OBSERVATION_WINDOW_HOURS: i64 = 24;

/// Open-Meteo API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoPayload {
    current: Option<OpenMeteoCurrent>,
    hourly: Option<OpenMeteoHourly>,
    daily: Option<OpenMeteoDaily>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    time: String,
    #[serde(default)]
    temperature_2m: Option<f64>,
    #[serde(default)]
    relative_humidity_2m: Option<f64>,
    #[serde(default)]
    precipitation_probability: Option<f64>,
    #[serde(default)]
    wind_speed_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoHourly {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoDaily {
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_mean: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m_max: Vec<Option<f64>>,
}

impl WeatherClient {
    /// Create a client with the configured endpoint and request timeout
    pub fn new(config: &WeatherConfig) -> AppResult<Self> {
        Self::with_base_url(
            config.api_endpoint.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Create a client against a custom base URL (for testing)
    pub fn with_base_url(base_url: String, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Current conditions plus every hourly value in the trailing 24h,
    /// sorted by timestamp
    pub async fn fetch_observations(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Vec<Observation>> {
        let payload: OpenMeteoPayload = self
            .get_forecast(
                latitude,
                longitude,
                &[
                    ("current", CURRENT_VARIABLES.to_string()),
                    ("hourly", HOURLY_VARIABLES.to_string()),
                    ("past_days", "1".to_string()),
                    ("forecast_days", "1".to_string()),
                ],
            )
            .await?;

        collect_observations(payload)
    }

    /// Current conditions only
    pub async fn fetch_current(&self, latitude: f64, longitude: f64) -> AppResult<LiveWeather> {
        let payload: OpenMeteoPayload = self
            .get_forecast(
                latitude,
                longitude,
                &[("current", CURRENT_VARIABLES.to_string())],
            )
            .await?;

        let current = payload
            .current
            .ok_or_else(|| AppError::ExternalService("No current weather data available".into()))?;
        let observation = current.into_observation()?;

        Ok(LiveWeather {
            latitude,
            longitude,
            time: observation.timestamp,
            temperature: observation.temperature,
            humidity: observation.humidity,
            precipitation_probability: observation.precipitation_probability,
            wind_speed: observation.wind_speed,
        })
    }

    /// Daily forecast for the next `days` days
    pub async fn fetch_daily_forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: u8,
    ) -> AppResult<Vec<DailyForecast>> {
        let payload: OpenMeteoPayload = self
            .get_forecast(
                latitude,
                longitude,
                &[
                    ("daily", DAILY_VARIABLES.to_string()),
                    ("forecast_days", days.to_string()),
                ],
            )
            .await?;

        collect_daily(payload)
    }

    async fn get_forecast<T: DeserializeOwned>(
        &self,
        latitude: f64,
        longitude: f64,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/forecast", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Weather API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Weather API error: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse weather response: {}", e)))
    }
}

impl OpenMeteoCurrent {
    fn into_observation(self) -> AppResult<Observation> {
        Ok(Observation {
            timestamp: parse_open_meteo_time(&self.time)?,
            temperature: self.temperature_2m,
            humidity: self.relative_humidity_2m,
            precipitation_probability: self.precipitation_probability,
            wind_speed: self.wind_speed_10m,
        })
    }
}

fn collect_observations(payload: OpenMeteoPayload) -> AppResult<Vec<Observation>> {
    let current = payload
        .current
        .ok_or_else(|| AppError::ExternalService("No current weather data available".into()))?
        .into_observation()?;
    let window_start = current.timestamp - chrono::Duration::hours(OBSERVATION_WINDOW_HOURS);

    let mut observations = Vec::new();
    if let Some(hourly) = payload.hourly {
        for (i, raw) in hourly.time.iter().enumerate() {
            let timestamp = parse_open_meteo_time(raw)?;
            // The current block replaces an hourly value at the same instant
            if timestamp < window_start || timestamp >= current.timestamp {
                continue;
            }
            observations.push(Observation {
                timestamp,
                temperature: value_at(&hourly.temperature_2m, i),
                humidity: value_at(&hourly.relative_humidity_2m, i),
                precipitation_probability: value_at(&hourly.precipitation_probability, i),
                wind_speed: value_at(&hourly.wind_speed_10m, i),
            });
        }
    }
    observations.push(current);
    observations.sort_by_key(|o| o.timestamp);

    Ok(observations)
}

fn collect_daily(payload: OpenMeteoPayload) -> AppResult<Vec<DailyForecast>> {
    let daily = payload
        .daily
        .ok_or_else(|| AppError::ExternalService("No forecast data available".into()))?;

    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
                AppError::ExternalService(format!("Invalid forecast date '{}': {}", raw, e))
            })?;
            Ok(DailyForecast {
                date,
                min_temp: value_at(&daily.temperature_2m_min, i),
                max_temp: value_at(&daily.temperature_2m_max, i),
                rain_chance: value_at(&daily.precipitation_probability_mean, i),
                wind_max: value_at(&daily.wind_speed_10m_max, i),
            })
        })
        .collect()
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten()
}

/// Parse an Open-Meteo local time string; requests always ask for UTC
fn parse_open_meteo_time(raw: &str) -> AppResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| AppError::ExternalService(format!("Invalid timestamp '{}': {}", raw, e)))
}
