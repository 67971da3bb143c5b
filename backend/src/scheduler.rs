//! Periodic weather ingestion
//!
//! A single background task ticks at a fixed interval and runs one ingestion
//! pass per tick. Runs never overlap: a slow pass delays the next tick.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::error::{AppError, AppResult};
use crate::services::WeatherService;

/// Longest accepted interval between runs (one week)
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

pub struct WeatherScheduler {
    service: WeatherService,
    interval: Duration,
    run_on_startup: bool,
}

impl WeatherScheduler {
    /// Build a scheduler; an interval outside `1..=MAX_INTERVAL_SECS` is a
    /// configuration error
    pub fn new(service: WeatherService, config: &SchedulerConfig) -> AppResult<Self> {
        if !(1..=MAX_INTERVAL_SECS).contains(&config.interval_secs) {
            return Err(AppError::Configuration(format!(
                "scheduler.interval_secs must be between 1 and {MAX_INTERVAL_SECS}, got {}",
                config.interval_secs
            )));
        }

        Ok(Self {
            service,
            interval: Duration::from_secs(config.interval_secs),
            run_on_startup: config.run_on_startup,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the ticker; it stops when `cancel` fires
    pub fn start(self, cancel: CancellationToken) -> JoinHandle<()> {
        let first_tick = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };

        tokio::spawn(async move {
            let mut ticker = interval_at(first_tick, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("Weather scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        tracing::debug!("Running scheduled weather ingestion");
                        match self.service.ingest_all().await {
                            Ok(summary) if summary.has_failures() => {
                                tracing::warn!(message = %summary.message, "Scheduled ingestion finished with errors");
                            }
                            Ok(_) => {}
                            Err(err) => tracing::error!("Scheduled ingestion failed: {err}"),
                        }
                    }
                }
            }
        })
    }
}
