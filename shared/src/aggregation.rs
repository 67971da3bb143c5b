//! Daily aggregation of persisted weather readings

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::models::{DailyAggregate, WeatherReading};

/// Number of trailing days covered by the history endpoint
pub const HISTORY_WINDOW_DAYS: i64 = 7;

/// First calendar date included in the history window ending on `today`
pub fn history_window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(HISTORY_WINDOW_DAYS)
}

/// Running min/max/mean over the present values of one metric
#[derive(Debug, Clone, Copy, Default)]
struct MetricStats {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl MetricStats {
    fn push(&mut self, value: Option<f64>) {
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return;
        };
        self.count += 1;
        self.sum += v;
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Debug, Default)]
struct DayBucket {
    readings: usize,
    temperature: MetricStats,
    humidity: MetricStats,
    wind: MetricStats,
}

/// Group readings by UTC calendar date (ascending) and compute avg/min/max of
/// temperature, humidity and wind speed.
///
/// Readings dated before `since` are skipped. Missing metric values are
/// ignored; a metric with no values on a day is reported as `None`.
pub fn aggregate_daily<'a, I>(readings: I, since: NaiveDate) -> Vec<DailyAggregate>
where
    I: IntoIterator<Item = &'a WeatherReading>,
{
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

    for reading in readings {
        let date = reading.timestamp.date_naive();
        if date < since {
            continue;
        }
        let bucket = days.entry(date).or_default();
        bucket.readings += 1;
        bucket.temperature.push(reading.temperature);
        bucket.humidity.push(reading.humidity);
        bucket.wind.push(reading.wind_speed);
    }

    days.into_iter()
        .map(|(date, b)| DailyAggregate {
            date,
            reading_count: b.readings,
            avg_temp: b.temperature.avg(),
            min_temp: b.temperature.min,
            max_temp: b.temperature.max,
            avg_humidity: b.humidity.avg(),
            min_humidity: b.humidity.min,
            max_humidity: b.humidity.max,
            avg_wind: b.wind.avg(),
            min_wind: b.wind.min,
            max_wind: b.wind.max,
        })
        .collect()
}
