//! Configuration management for the Municipal Weather Monitoring service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with WXMON__ prefix

use std::ops::RangeInclusive;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Accepted per-request timeout for outbound weather calls, in seconds
pub const REQUEST_TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 5..=15;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Weather API configuration
    pub weather: WeatherConfig,

    /// Background ingestion schedule
    pub scheduler: SchedulerConfig,

    /// Optional bootstrap administrator
    #[serde(default)]
    pub admin: AdminConfig,

    /// Log output configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    /// Forecast API endpoint (Open-Meteo compatible)
    pub api_endpoint: String,

    /// Per-request timeout for outbound weather calls
    pub request_timeout_secs: u64,

    /// Number of days returned by the forecast endpoint
    pub forecast_days: u8,

    /// Ingest the default location as standalone readings when no station exists
    pub standalone_fallback: bool,

    /// Location used by the forecast endpoint when no coordinates are given
    pub default_location: LocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    /// Run periodic ingestion at all
    pub enabled: bool,

    /// Seconds between ingestion runs
    pub interval_secs: u64,

    /// Fire the first run immediately instead of after one interval
    pub run_on_startup: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AdminConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("WXMON_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("weather.api_endpoint", "https://api.open-meteo.com/v1")?
            .set_default("weather.request_timeout_secs", 10)?
            .set_default("weather.forecast_days", 3)?
            .set_default("weather.standalone_fallback", true)?
            .set_default("weather.default_location.name", "CMU Campus")?
            .set_default("weather.default_location.latitude", 7.85)?
            .set_default("weather.default_location.longitude", 125.05)?
            .set_default("scheduler.enabled", true)?
            .set_default("scheduler.interval_secs", 3600)?
            .set_default("scheduler.run_on_startup", true)?
            .set_default("logging.json", false)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (WXMON__ prefix)
            .add_source(
                Environment::with_prefix("WXMON")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !REQUEST_TIMEOUT_RANGE_SECS.contains(&self.weather.request_timeout_secs) {
            return Err(ConfigError::Message(format!(
                "weather.request_timeout_secs must be between {} and {}, got {}",
                REQUEST_TIMEOUT_RANGE_SECS.start(),
                REQUEST_TIMEOUT_RANGE_SECS.end(),
                self.weather.request_timeout_secs
            )));
        }
        Ok(())
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}
