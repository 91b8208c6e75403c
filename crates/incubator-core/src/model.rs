use crate::error::{IncubatorError, Result};
use crate::types::Species;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an operator-supplied `YYYY-MM-DD` date. Never coerces.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| IncubatorError::MalformedDate(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
}

/// Rolling average reported for the whole incubator. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorAggregate {
    pub average_temperature: f64,
    pub average_humidity: f64,
    #[serde(default)]
    pub failed_sensor_count: u32,
    pub observed_at: DateTime<Utc>,
    /// Per-sensor readings of the batch that produced this aggregate.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sensors: BTreeMap<String, SensorReading>,
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// The active setpoint record. The most recently saved one wins; older
/// records stay in storage as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    pub target_temperature: f64,
    pub target_humidity: f64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub stepper_enabled: bool,
    /// Number of turning units sharing the hourly duty cycle.
    pub stepper_count: i32,
    pub species: Species,
    pub cycle_length_days: u32,
}

impl Parameters {
    /// Whole days elapsed between `start_date` and `today` (negative when the
    /// start date lies in the future).
    pub fn elapsed_days(&self, today: NaiveDate) -> i64 {
        (today - self.start_date).num_days()
    }
}

// ---------------------------------------------------------------------------
// StepperState
// ---------------------------------------------------------------------------

pub fn default_run_at() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Egg-turning schedule bookkeeping. `next_run_at` is a wall-clock time of
/// day, never a full timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepperState {
    #[serde(default = "default_run_at")]
    pub next_run_at: NaiveTime,
    #[serde(default)]
    pub is_on: bool,
}

impl Default for StepperState {
    fn default() -> Self {
        Self {
            next_run_at: default_run_at(),
            is_on: false,
        }
    }
}

// ---------------------------------------------------------------------------
// CurrentConfig
// ---------------------------------------------------------------------------

/// Snapshot of the active records, loaded once per evaluation and handed to
/// the pure decision functions.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConfig {
    pub parameters: Parameters,
    pub stepper: StepperState,
}
