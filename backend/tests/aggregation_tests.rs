//! Weather history aggregation tests
//!
//! Daily grouping of persisted readings over the trailing week:
//! - empty windows stay empty
//! - readings before the window never leak into the result
//! - per-day statistics stay ordered (min <= avg <= max)

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use shared::{aggregate_daily, history_window_start, WeatherReading};
use uuid::Uuid;

fn reading_at(base_day: NaiveDate, day_offset: i64, hour: u32, temp: Option<f64>, wind: Option<f64>) -> WeatherReading {
    let date = base_day + Duration::days(day_offset);
    let ts = Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap());
    WeatherReading {
        id: Uuid::new_v4(),
        station_id: Some(Uuid::nil()),
        timestamp: ts,
        temperature: temp,
        humidity: Some(75.0),
        precipitation_probability: Some(10.0),
        wind_speed: wind,
        location_name: "Musuan".to_string(),
        latitude: 7.88,
        longitude: 125.06,
        created_at: ts,
        updated_at: ts,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 16).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_empty_window_returns_empty_list() {
        let readings: Vec<WeatherReading> = Vec::new();
        assert!(aggregate_daily(&readings, history_window_start(today())).is_empty());
    }

    #[test]
    fn test_readings_older_than_a_week_are_ignored() {
        let since = history_window_start(today());
        let readings = vec![
            reading_at(today(), -8, 12, Some(40.0), None),
            reading_at(today(), -7, 0, Some(22.0), None),
        ];

        let days = aggregate_daily(&readings, since);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, since);
        assert_eq!(days[0].max_temp, Some(22.0));
    }

    #[test]
    fn test_days_are_ascending_with_statistics() {
        let readings = vec![
            reading_at(today(), 0, 9, Some(30.0), Some(4.0)),
            reading_at(today(), -1, 6, Some(21.0), Some(2.0)),
            reading_at(today(), -1, 14, Some(29.0), Some(6.0)),
        ];

        let days = aggregate_daily(&readings, history_window_start(today()));

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, today() - Duration::days(1));
        assert_eq!(days[0].reading_count, 2);
        assert_eq!(days[0].avg_temp, Some(25.0));
        assert_eq!(days[0].min_wind, Some(2.0));
        assert_eq!(days[0].max_wind, Some(6.0));
        assert_eq!(days[1].date, today());
    }

    #[test]
    fn test_metric_without_values_is_null() {
        let readings = vec![
            reading_at(today(), 0, 1, None, None),
            reading_at(today(), 0, 2, None, None),
        ];

        let days = aggregate_daily(&readings, history_window_start(today()));

        assert_eq!(days[0].reading_count, 2);
        assert_eq!(days[0].avg_temp, None);
        assert_eq!(days[0].max_wind, None);
        assert_eq!(days[0].avg_humidity, Some(75.0));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

fn arb_reading() -> impl Strategy<Value = WeatherReading> {
    (
        -10i64..=0,
        0u32..24,
        proptest::option::of(-10.0f64..45.0),
        proptest::option::of(0.0f64..60.0),
    )
        .prop_map(|(offset, hour, temp, wind)| reading_at(today(), offset, hour, temp, wind))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No aggregate is dated before the window start and dates are strictly ascending
    #[test]
    fn prop_dates_in_window_and_ascending(readings in prop::collection::vec(arb_reading(), 0..60)) {
        let since = history_window_start(today());
        let days = aggregate_daily(&readings, since);

        prop_assert!(days.iter().all(|d| d.date >= since));
        prop_assert!(days.windows(2).all(|w| w[0].date < w[1].date));
    }

    /// Every reading inside the window is counted exactly once
    #[test]
    fn prop_reading_counts_add_up(readings in prop::collection::vec(arb_reading(), 0..60)) {
        let since = history_window_start(today());
        let days = aggregate_daily(&readings, since);

        let expected = readings.iter().filter(|r| r.timestamp.date_naive() >= since).count();
        let counted: usize = days.iter().map(|d| d.reading_count).sum();
        prop_assert_eq!(counted, expected);
    }

    /// min <= avg <= max whenever a metric has values
    #[test]
    fn prop_statistics_are_ordered(readings in prop::collection::vec(arb_reading(), 1..60)) {
        let days = aggregate_daily(&readings, history_window_start(today()));

        for day in days {
            if let (Some(min), Some(avg), Some(max)) = (day.min_temp, day.avg_temp, day.max_temp) {
                prop_assert!(min <= avg + 1e-9 && avg <= max + 1e-9);
            }
            if let (Some(min), Some(avg), Some(max)) = (day.min_wind, day.avg_wind, day.max_wind) {
                prop_assert!(min <= avg + 1e-9 && avg <= max + 1e-9);
            }
        }
    }
}
