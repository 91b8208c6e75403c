//! Fan and humidifier decisions from the latest aggregate and the active
//! setpoints.
//!
//! Pure functions: no storage access, no clock reads. The late-stage rule
//! raises only the humidity setpoint; the temperature setpoint is never
//! adjusted with age.

use crate::config::ActuatorPolicy;
use crate::model::{Parameters, SensorAggregate};
use crate::types::{ActuatorStatus, Switch};
use chrono::{NaiveDate, NaiveDateTime};

impl ActuatorPolicy {
    /// Humidity setpoint after the late-incubation adjustment for `today`.
    pub fn effective_humidity_setpoint(&self, parameters: &Parameters, today: NaiveDate) -> f64 {
        if parameters.elapsed_days(today) >= self.late_stage_after_days {
            parameters.target_humidity + self.late_stage_humidity_offset
        } else {
            parameters.target_humidity
        }
    }

    /// Fan runs while the incubator is below its temperature target (heat
    /// assist); humidifier runs while below the effective humidity setpoint.
    pub fn decide(
        &self,
        aggregate: &SensorAggregate,
        parameters: &Parameters,
        now: NaiveDateTime,
    ) -> ActuatorStatus {
        let humidity_setpoint = self.effective_humidity_setpoint(parameters, now.date());
        let status = ActuatorStatus {
            fan: Switch::from_bool(aggregate.average_temperature < parameters.target_temperature),
            humidifier: Switch::from_bool(aggregate.average_humidity < humidity_setpoint),
        };
        tracing::debug!(
            average_temperature = aggregate.average_temperature,
            target_temperature = parameters.target_temperature,
            average_humidity = aggregate.average_humidity,
            humidity_setpoint,
            fan = %status.fan,
            humidifier = %status.humidifier,
            "actuator decision"
        );
        status
    }
}

/// [`ActuatorPolicy::decide`] with the stock 20-day / +10 policy.
pub fn decide(
    aggregate: &SensorAggregate,
    parameters: &Parameters,
    now: NaiveDateTime,
) -> ActuatorStatus {
    ActuatorPolicy::default().decide(aggregate, parameters, now)
}
