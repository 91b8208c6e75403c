//! Validation of device sensor batches.
//!
//! A batch carries the device-computed averages plus an open-ended set of
//! per-sensor objects whose keys start with `sensor` (`sensor1`, `sensor2`,
//! ...). The set of sensors differs from one batch to the next.

use crate::config::Limits;
use crate::error::{IncubatorError, Result};
use crate::model::{SensorAggregate, SensorReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SENSOR_KEY_PREFIX: &str = "sensor";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorBatch {
    pub average_temperature: f64,
    pub average_humidity: f64,
    #[serde(rename = "numFailedSensors", alias = "failed_sensor_count", default)]
    pub failed_sensor_count: u32,
    /// Sensor objects and anything else the device sends (e.g. its own view
    /// of the fan state), kept verbatim until validation.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl SensorBatch {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| IncubatorError::InvalidSensorBatch(e.to_string()))
    }

    /// Validate the batch and turn it into the aggregate row to persist.
    pub fn into_aggregate(
        self,
        limits: &Limits,
        observed_at: DateTime<Utc>,
    ) -> Result<SensorAggregate> {
        limits.check_temperature(self.average_temperature)?;
        limits.check_humidity(self.average_humidity)?;

        let mut sensors = BTreeMap::new();
        for (name, value) in self.fields {
            if !name.starts_with(SENSOR_KEY_PREFIX) {
                continue;
            }
            let reading = parse_reading(&name, &value)?;
            check_reading(&name, &reading, limits)?;
            sensors.insert(name, reading);
        }

        if sensors.is_empty() {
            return Err(IncubatorError::InvalidSensorBatch(format!(
                "no sensor data found (no field starting with '{SENSOR_KEY_PREFIX}')"
            )));
        }

        Ok(SensorAggregate {
            average_temperature: self.average_temperature,
            average_humidity: self.average_humidity,
            failed_sensor_count: self.failed_sensor_count,
            observed_at,
            sensors,
        })
    }
}

fn parse_reading(name: &str, value: &Value) -> Result<SensorReading> {
    let Some(obj) = value.as_object() else {
        return Err(IncubatorError::InvalidSensorBatch(format!(
            "{name}: sensor data must be an object"
        )));
    };
    let field = |key: &str| -> Result<f64> {
        match obj.get(key) {
            None => Err(IncubatorError::InvalidSensorBatch(format!(
                "{name}: incomplete reading (missing {key})"
            ))),
            Some(v) => v.as_f64().ok_or_else(|| {
                IncubatorError::InvalidSensorBatch(format!("{name}: {key} is not a number"))
            }),
        }
    };
    Ok(SensorReading {
        temperature: field("temperature")?,
        humidity: field("humidity")?,
    })
}

fn check_reading(name: &str, reading: &SensorReading, limits: &Limits) -> Result<()> {
    if !limits.humidity.contains(reading.humidity) {
        return Err(IncubatorError::InvalidSensorBatch(format!(
            "{name}: humidity must be within {}..={}, got {}",
            limits.humidity.min, limits.humidity.max, reading.humidity
        )));
    }
    if !limits.sensor_temperature.contains(reading.temperature) {
        return Err(IncubatorError::InvalidSensorBatch(format!(
            "{name}: temperature must be within {}..={}, got {}",
            limits.sensor_temperature.min, limits.sensor_temperature.max, reading.temperature
        )));
    }
    Ok(())
}
