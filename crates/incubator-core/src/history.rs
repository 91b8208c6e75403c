//! Rollups over stored aggregates for the dashboard views.

use crate::model::SensorAggregate;
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyAverage {
    pub hour: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peaks {
    pub max_temperature: f64,
    pub max_humidity: f64,
}

fn truncate_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

/// Mean temperature and humidity per UTC hour, oldest first.
pub fn hourly_averages(aggregates: &[SensorAggregate]) -> Vec<HourlyAverage> {
    let mut buckets: BTreeMap<DateTime<Utc>, (f64, f64, usize)> = BTreeMap::new();
    for agg in aggregates {
        let entry = buckets
            .entry(truncate_to_hour(agg.observed_at))
            .or_insert((0.0, 0.0, 0));
        entry.0 += agg.average_temperature;
        entry.1 += agg.average_humidity;
        entry.2 += 1;
    }
    buckets
        .into_iter()
        .map(|(hour, (t, h, n))| HourlyAverage {
            hour,
            temperature: t / n as f64,
            humidity: h / n as f64,
            samples: n,
        })
        .collect()
}

/// Highest sensor readings across `aggregates`. Records without per-sensor
/// detail contribute their averages.
pub fn peaks(aggregates: &[SensorAggregate]) -> Option<Peaks> {
    let mut readings = aggregates.iter().flat_map(|agg| {
        let points: Vec<(f64, f64)> = if agg.sensors.is_empty() {
            vec![(agg.average_temperature, agg.average_humidity)]
        } else {
            agg.sensors
                .values()
                .map(|r| (r.temperature, r.humidity))
                .collect()
        };
        points
    });
    let (t0, h0) = readings.next()?;
    let (max_temperature, max_humidity) =
        readings.fold((t0, h0), |(mt, mh), (t, h)| (mt.max(t), mh.max(h)));
    Some(Peaks {
        max_temperature,
        max_humidity,
    })
}
