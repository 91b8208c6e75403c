//! Operations exposed to the request layer.
//!
//! The engine reads the active records through an [`IncubatorStore`] at the
//! start of every call and hands them to the pure decision functions. The
//! caller supplies `now` as local wall-clock time.

use crate::clock;
use crate::config::EngineConfig;
use crate::error::{IncubatorError, Result};
use crate::ingest::SensorBatch;
use crate::model::{parse_date, CurrentConfig, Parameters, SensorAggregate, StepperState};
use crate::species;
use crate::stepper;
use crate::store::IncubatorStore;
use crate::types::{ActuatorStatus, Species, Switch};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ParameterRequest
// ---------------------------------------------------------------------------

/// Operator-submitted incubation settings, as received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRequest {
    pub target_temperature: f64,
    pub target_humidity: f64,
    pub start_date: String,
    pub stepper_enabled: bool,
    pub stepper_count: i32,
    pub species: String,
    /// Cycle length for species outside the catalog (`timetoclose`).
    #[serde(default)]
    pub cycle_override: Option<i64>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: IncubatorStore> Engine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Active parameters with garbled setpoints replaced by the configured
    /// defaults.
    fn active_parameters(&self) -> Result<Option<Parameters>> {
        let Some(mut p) = self.store.active_parameters()? else {
            return Ok(None);
        };
        let limits = &self.config.limits;
        let defaults = &self.config.defaults;
        if !limits.temperature.contains(p.target_temperature) {
            tracing::warn!(
                stored = p.target_temperature,
                fallback = defaults.target_temperature,
                "stored temperature setpoint unusable; using default"
            );
            p.target_temperature = defaults.target_temperature;
        }
        if !limits.humidity.contains(p.target_humidity) {
            tracing::warn!(
                stored = p.target_humidity,
                fallback = defaults.target_humidity,
                "stored humidity setpoint unusable; using default"
            );
            p.target_humidity = defaults.target_humidity;
        }
        if p.cycle_length_days == 0 {
            p.cycle_length_days = species::resolve_cycle_length(
                p.species,
                Some(i64::from(defaults.cycle_length_days)),
            );
        }
        Ok(Some(p))
    }

    /// Active parameters plus the stored (or initial) stepper schedule.
    pub fn current_config(&self) -> Result<Option<CurrentConfig>> {
        let Some(parameters) = self.active_parameters()? else {
            return Ok(None);
        };
        let stepper = self
            .store
            .active_stepper_state()?
            .unwrap_or_else(|| self.config.stepper.initial_state());
        Ok(Some(CurrentConfig {
            parameters,
            stepper,
        }))
    }

    /// Fan and humidifier commands; both OFF until a sensor aggregate and a
    /// parameter record exist.
    pub fn compute_actuator_status(&self, now: NaiveDateTime) -> Result<ActuatorStatus> {
        let Some(aggregate) = self.store.latest_sensor_aggregate()? else {
            tracing::debug!("no sensor aggregate yet; actuators off");
            return Ok(ActuatorStatus::all_off());
        };
        let Some(parameters) = self.active_parameters()? else {
            tracing::debug!("no parameters yet; actuators off");
            return Ok(ActuatorStatus::all_off());
        };
        Ok(self.config.actuator.decide(&aggregate, &parameters, now))
    }

    /// Evaluate the turning schedule and persist it when it moved.
    ///
    /// Every evaluation advances `next_run_at` by one slot and stores it, so a
    /// second call at the same `now` is measured against the next boundary.
    /// Only the pure `StepperPolicy::evaluate` is idempotent for identical
    /// inputs.
    pub fn compute_stepper_status(&self, now: NaiveDateTime) -> Result<Switch> {
        let Some(parameters) = self.active_parameters()? else {
            tracing::debug!("no parameters yet; stepper off");
            return Ok(Switch::Off);
        };
        let stored = self.store.active_stepper_state()?;
        let current = CurrentConfig {
            parameters,
            stepper: stored.unwrap_or_else(|| self.config.stepper.initial_state()),
        };
        let (next, command) =
            self.config
                .stepper
                .evaluate(&current.stepper, &current.parameters, now);
        if stored != Some(next) {
            self.store.save_stepper_state(next)?;
        }
        Ok(command)
    }

    /// Whether a new cycle may start on `requested_date` (`YYYY-MM-DD`).
    pub fn is_cycle_startable(&self, requested_date: &str, now: NaiveDateTime) -> Result<bool> {
        let requested = parse_date(requested_date)?;
        let previous = self.active_parameters()?;
        Ok(clock::can_start(requested, previous.as_ref(), now.date()))
    }

    pub fn resolve_cycle_length(&self, species: &str, override_days: Option<i64>) -> u32 {
        species::resolve_cycle_length(Species::parse(species), override_days)
    }

    /// Validate and store a new parameter record, then re-arm the stepper.
    ///
    /// Editing setpoints while keeping the running cycle's start date is
    /// always allowed; moving the start date must pass the cycle clock.
    pub fn apply_parameters(
        &self,
        request: &ParameterRequest,
        now: NaiveDateTime,
    ) -> Result<Parameters> {
        let limits = &self.config.limits;
        let target_temperature = limits.check_temperature(request.target_temperature)?;
        let target_humidity = limits.check_humidity(request.target_humidity)?;
        if request.stepper_count <= 0 {
            return Err(IncubatorError::InvalidSetpoint(format!(
                "stepper count must be positive, got {}",
                request.stepper_count
            )));
        }
        if let Some(days) = request.cycle_override {
            if days <= 0 {
                return Err(IncubatorError::InvalidSetpoint(format!(
                    "cycle length must be positive, got {days}"
                )));
            }
        }
        let start_date = parse_date(&request.start_date)?;

        if let Some(previous) = self.active_parameters()? {
            if previous.start_date != start_date
                && !clock::can_start(start_date, Some(&previous), now.date())
            {
                return Err(IncubatorError::CycleInProgress {
                    start_date: previous.start_date,
                    requested: start_date,
                });
            }
        }

        let species = Species::parse(&request.species);
        let parameters = Parameters {
            target_temperature,
            target_humidity,
            start_date,
            stepper_enabled: request.stepper_enabled,
            stepper_count: request.stepper_count,
            species,
            cycle_length_days: species::resolve_cycle_length(species, request.cycle_override),
        };
        let saved = self.store.save_parameters(parameters)?;
        let armed = self.store.save_stepper_state(stepper::arm(now))?;
        tracing::info!(
            species = %saved.species,
            start_date = %saved.start_date,
            cycle_length_days = saved.cycle_length_days,
            next_run_at = %armed.next_run_at,
            "parameters applied"
        );
        Ok(saved)
    }

    /// Validate a device batch and persist its aggregate.
    pub fn record_batch(
        &self,
        batch: SensorBatch,
        observed_at: DateTime<Utc>,
    ) -> Result<SensorAggregate> {
        let aggregate = batch.into_aggregate(&self.config.limits, observed_at)?;
        let saved = self.store.save_sensor_aggregate(aggregate)?;
        tracing::info!(
            sensors = saved.sensors.len(),
            failed = saved.failed_sensor_count,
            "sensor batch recorded"
        );
        Ok(saved)
    }

    /// Current stepper schedule, for display.
    pub fn stepper_state(&self) -> Result<StepperState> {
        Ok(self
            .store
            .active_stepper_state()?
            .unwrap_or_else(|| self.config.stepper.initial_state()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn engine() -> Engine<MemoryStore> {
        Engine::new(MemoryStore::new(), EngineConfig::default())
    }

    fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn request(start: &str) -> ParameterRequest {
        ParameterRequest {
            target_temperature: 37.5,
            target_humidity: 45.0,
            start_date: start.to_string(),
            stepper_enabled: true,
            stepper_count: 3,
            species: "poule".to_string(),
            cycle_override: None,
        }
    }

    fn batch(temp: f64, humidity: f64) -> SensorBatch {
        SensorBatch::from_json(&format!(
            r#"{{"average_temperature": {temp}, "average_humidity": {humidity},
                "sensor1": {{"temperature": {temp}, "humidity": {humidity}}}}}"#
        ))
        .unwrap()
    }

    fn observed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 25, 9, 0, 0).unwrap()
    }

    #[test]
    fn missing_baseline_is_conservative() {
        let e = engine();
        let now = at(1, 5, 6, 1);
        assert_eq!(e.compute_actuator_status(now).unwrap(), ActuatorStatus::all_off());
        assert_eq!(e.compute_stepper_status(now).unwrap(), Switch::Off);
        assert!(e.is_cycle_startable("2024-01-05", now).unwrap());
        assert!(e.store().active_stepper_state().unwrap().is_none());
    }

    #[test]
    fn parameters_without_aggregate_keep_actuators_off() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 8, 0)).unwrap();
        assert_eq!(
            e.compute_actuator_status(at(1, 2, 8, 0)).unwrap(),
            ActuatorStatus::all_off()
        );
    }

    #[test]
    fn actuator_status_uses_latest_aggregate() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 8, 0)).unwrap();
        e.record_batch(batch(36.0, 40.0), observed()).unwrap();
        e.record_batch(batch(38.0, 50.0), observed()).unwrap();
        let status = e.compute_actuator_status(at(1, 25, 9, 0)).unwrap();
        assert_eq!(status.fan, Switch::Off);
        assert_eq!(status.humidifier, Switch::On);
    }

    #[test]
    fn garbled_stored_setpoint_falls_back_to_default() {
        let e = engine();
        e.store()
            .save_parameters(Parameters {
                target_temperature: f64::NAN,
                target_humidity: 45.0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                stepper_enabled: false,
                stepper_count: 3,
                species: Species::Poule,
                cycle_length_days: 21,
            })
            .unwrap();
        e.record_batch(batch(37.0, 50.0), observed()).unwrap();
        // 37.0 < default 37.5
        let status = e.compute_actuator_status(at(1, 3, 9, 0)).unwrap();
        assert_eq!(status.fan, Switch::On);
    }

    #[test]
    fn zero_cycle_length_uses_configured_default() {
        let mut config = EngineConfig::default();
        config.defaults.cycle_length_days = 21;
        let e = Engine::new(MemoryStore::new(), config);
        e.store()
            .save_parameters(Parameters {
                target_temperature: 37.5,
                target_humidity: 45.0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                stepper_enabled: true,
                stepper_count: 3,
                species: Species::Other,
                cycle_length_days: 0,
            })
            .unwrap();
        let current = e.current_config().unwrap().unwrap();
        assert_eq!(current.parameters.cycle_length_days, 21);
        // Day 23 lies past a 21-day cycle but inside the 28-day fallback.
        assert!(e.is_cycle_startable("2024-01-20", at(1, 24, 8, 0)).unwrap());
    }

    #[test]
    fn catalog_species_ignores_configured_default() {
        let mut config = EngineConfig::default();
        config.defaults.cycle_length_days = 40;
        let e = Engine::new(MemoryStore::new(), config);
        e.store()
            .save_parameters(Parameters {
                target_temperature: 37.5,
                target_humidity: 45.0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                stepper_enabled: true,
                stepper_count: 3,
                species: Species::Caille,
                cycle_length_days: 0,
            })
            .unwrap();
        let current = e.current_config().unwrap().unwrap();
        assert_eq!(current.parameters.cycle_length_days, 18);
    }

    #[test]
    fn apply_parameters_arms_stepper() {
        let e = engine();
        let saved = e.apply_parameters(&request("2024-01-01"), at(1, 1, 9, 30)).unwrap();
        assert_eq!(saved.cycle_length_days, 21);
        let state = e.stepper_state().unwrap();
        assert_eq!(state.next_run_at, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert!(!state.is_on);
    }

    #[test]
    fn stepper_status_persists_advanced_schedule() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 5, 0)).unwrap();
        assert_eq!(e.compute_stepper_status(at(1, 2, 6, 1)).unwrap(), Switch::On);
        let state = e.stepper_state().unwrap();
        assert_eq!(state.next_run_at, NaiveTime::from_hms_opt(6, 20, 0).unwrap());
        assert!(state.is_on);
    }

    #[test]
    fn repeated_stepper_status_at_same_instant_moves_on() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 5, 0)).unwrap();
        let now = at(1, 2, 6, 1);
        assert_eq!(e.compute_stepper_status(now).unwrap(), Switch::On);
        // The stored boundary is now 06:20, so 06:01 falls outside its pulse.
        assert_eq!(e.compute_stepper_status(now).unwrap(), Switch::Off);
        let state = e.stepper_state().unwrap();
        assert_eq!(state.next_run_at, NaiveTime::from_hms_opt(6, 40, 0).unwrap());
        assert!(!state.is_on);
    }

    #[test]
    fn stepper_uses_default_schedule_when_none_stored() {
        let e = engine();
        e.store()
            .save_parameters(Parameters {
                target_temperature: 37.5,
                target_humidity: 45.0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                stepper_enabled: true,
                stepper_count: 2,
                species: Species::Poule,
                cycle_length_days: 21,
            })
            .unwrap();
        assert_eq!(e.compute_stepper_status(at(1, 2, 6, 2)).unwrap(), Switch::On);
        assert_eq!(
            e.stepper_state().unwrap().next_run_at,
            NaiveTime::from_hms_opt(6, 30, 0).unwrap()
        );
    }

    #[test]
    fn halted_stepper_is_not_rewritten() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 5, 0)).unwrap();
        let before = e.stepper_state().unwrap();
        assert_eq!(e.compute_stepper_status(at(2, 1, 6, 1)).unwrap(), Switch::Off);
        assert_eq!(e.stepper_state().unwrap(), before);
    }

    #[test]
    fn invalid_setpoints_rejected() {
        let e = engine();
        let mut req = request("2024-01-01");
        req.target_temperature = 80.0;
        assert!(matches!(
            e.apply_parameters(&req, at(1, 1, 8, 0)),
            Err(IncubatorError::InvalidSetpoint(_))
        ));
        let mut req = request("2024-01-01");
        req.stepper_count = 0;
        assert!(matches!(
            e.apply_parameters(&req, at(1, 1, 8, 0)),
            Err(IncubatorError::InvalidSetpoint(_))
        ));
        assert!(e.store().active_parameters().unwrap().is_none());
    }

    #[test]
    fn malformed_dates_surface() {
        let e = engine();
        assert!(matches!(
            e.apply_parameters(&request("01/01/2024"), at(1, 1, 8, 0)),
            Err(IncubatorError::MalformedDate(_))
        ));
        assert!(matches!(
            e.is_cycle_startable("soon", at(1, 1, 8, 0)),
            Err(IncubatorError::MalformedDate(_))
        ));
    }

    #[test]
    fn moving_start_inside_running_cycle_refused() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 8, 0)).unwrap();
        match e.apply_parameters(&request("2024-01-10"), at(1, 10, 8, 0)) {
            Err(IncubatorError::CycleInProgress {
                start_date,
                requested,
            }) => {
                assert_eq!(start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
                assert_eq!(requested, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
            }
            other => panic!("expected CycleInProgress, got {other:?}"),
        }
        assert!(!e.is_cycle_startable("2024-01-10", at(1, 10, 8, 0)).unwrap());
    }

    #[test]
    fn editing_setpoints_keeps_cycle() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 8, 0)).unwrap();
        let mut req = request("2024-01-01");
        req.target_humidity = 50.0;
        let saved = e.apply_parameters(&req, at(1, 10, 8, 0)).unwrap();
        assert_eq!(saved.target_humidity, 50.0);
        assert_eq!(e.store().parameter_history().len(), 2);
    }

    #[test]
    fn new_cycle_after_previous_ends() {
        let e = engine();
        e.apply_parameters(&request("2024-01-01"), at(1, 1, 8, 0)).unwrap();
        assert!(e.is_cycle_startable("2024-01-25", at(1, 25, 8, 0)).unwrap());
        let mut req = request("2024-01-25");
        req.species = "caille".to_string();
        let saved = e.apply_parameters(&req, at(1, 25, 8, 0)).unwrap();
        assert_eq!(saved.species, Species::Caille);
        assert_eq!(saved.cycle_length_days, 18);
    }

    #[test]
    fn unknown_species_uses_override() {
        let e = engine();
        let mut req = request("2024-01-01");
        req.species = "pintade".to_string();
        req.cycle_override = Some(26);
        let saved = e.apply_parameters(&req, at(1, 1, 8, 0)).unwrap();
        assert_eq!(saved.species, Species::Other);
        assert_eq!(saved.cycle_length_days, 26);
        assert_eq!(e.resolve_cycle_length("caille", None), 18);
        assert_eq!(e.resolve_cycle_length("pintade", None), 28);
    }

    #[test]
    fn record_batch_rejects_invalid_payload() {
        let e = engine();
        let bad = SensorBatch::from_json(
            r#"{"average_temperature": 37, "average_humidity": 45}"#,
        )
        .unwrap();
        assert!(matches!(
            e.record_batch(bad, observed()),
            Err(IncubatorError::InvalidSensorBatch(_))
        ));
        assert!(e.store().latest_sensor_aggregate().unwrap().is_none());
    }
}
