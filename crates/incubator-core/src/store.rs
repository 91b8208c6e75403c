//! Persistence port consumed by the engine.
//!
//! Every record kind is append-only history where the most recent row is the
//! active one. Stepper state is the exception: saving it rewrites the active
//! row (last writer wins).

use crate::error::Result;
use crate::model::{Parameters, SensorAggregate, StepperState};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

pub trait IncubatorStore {
    fn latest_sensor_aggregate(&self) -> Result<Option<SensorAggregate>>;
    fn active_parameters(&self) -> Result<Option<Parameters>>;
    fn active_stepper_state(&self) -> Result<Option<StepperState>>;

    /// Append a new parameter record; it becomes the active one.
    fn save_parameters(&self, parameters: Parameters) -> Result<Parameters>;
    /// Create the stepper record, or overwrite the active one.
    fn save_stepper_state(&self, state: StepperState) -> Result<StepperState>;

    fn save_sensor_aggregate(&self, aggregate: SensorAggregate) -> Result<SensorAggregate>;
    /// Aggregates observed at or after `since`, oldest first.
    fn sensor_aggregates_since(&self, since: DateTime<Utc>) -> Result<Vec<SensorAggregate>>;
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tables {
    aggregates: Vec<SensorAggregate>,
    parameters: Vec<Parameters>,
    stepper: Vec<StepperState>,
}

/// In-process store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-written row.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every parameter record ever saved, oldest first.
    pub fn parameter_history(&self) -> Vec<Parameters> {
        self.tables().parameters.clone()
    }
}

impl IncubatorStore for MemoryStore {
    fn latest_sensor_aggregate(&self) -> Result<Option<SensorAggregate>> {
        Ok(self.tables().aggregates.last().cloned())
    }

    fn active_parameters(&self) -> Result<Option<Parameters>> {
        Ok(self.tables().parameters.last().cloned())
    }

    fn active_stepper_state(&self) -> Result<Option<StepperState>> {
        Ok(self.tables().stepper.last().copied())
    }

    fn save_parameters(&self, parameters: Parameters) -> Result<Parameters> {
        self.tables().parameters.push(parameters.clone());
        Ok(parameters)
    }

    fn save_stepper_state(&self, state: StepperState) -> Result<StepperState> {
        let mut tables = self.tables();
        match tables.stepper.last_mut() {
            Some(active) => *active = state,
            None => tables.stepper.push(state),
        }
        Ok(state)
    }

    fn save_sensor_aggregate(&self, aggregate: SensorAggregate) -> Result<SensorAggregate> {
        self.tables().aggregates.push(aggregate.clone());
        Ok(aggregate)
    }

    fn sensor_aggregates_since(&self, since: DateTime<Utc>) -> Result<Vec<SensorAggregate>> {
        let mut rows: Vec<SensorAggregate> = self
            .tables()
            .aggregates
            .iter()
            .filter(|a| a.observed_at >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.observed_at);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Species;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn params(temp: f64) -> Parameters {
        Parameters {
            target_temperature: temp,
            target_humidity: 45.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            stepper_enabled: true,
            stepper_count: 3,
            species: Species::Poule,
            cycle_length_days: 21,
        }
    }

    fn aggregate_at(h: u32) -> SensorAggregate {
        SensorAggregate {
            average_temperature: 37.0,
            average_humidity: 45.0,
            failed_sensor_count: 0,
            observed_at: Utc.with_ymd_and_hms(2024, 1, 5, h, 0, 0).unwrap(),
            sensors: Default::default(),
        }
    }

    #[test]
    fn empty_store_has_no_baseline() {
        let store = MemoryStore::new();
        assert!(store.latest_sensor_aggregate().unwrap().is_none());
        assert!(store.active_parameters().unwrap().is_none());
        assert!(store.active_stepper_state().unwrap().is_none());
    }

    #[test]
    fn newest_parameters_supersede_and_history_kept() {
        let store = MemoryStore::new();
        store.save_parameters(params(37.5)).unwrap();
        store.save_parameters(params(38.0)).unwrap();
        assert_eq!(
            store.active_parameters().unwrap().unwrap().target_temperature,
            38.0
        );
        assert_eq!(store.parameter_history().len(), 2);
    }

    #[test]
    fn stepper_state_is_overwritten_in_place() {
        let store = MemoryStore::new();
        let first = StepperState::default();
        store.save_stepper_state(first).unwrap();
        let second = StepperState {
            next_run_at: NaiveTime::from_hms_opt(6, 20, 0).unwrap(),
            is_on: true,
        };
        store.save_stepper_state(second).unwrap();
        assert_eq!(store.active_stepper_state().unwrap(), Some(second));
        assert_eq!(store.tables().stepper.len(), 1);
    }

    #[test]
    fn aggregates_since_filters_and_orders() {
        let store = MemoryStore::new();
        store.save_sensor_aggregate(aggregate_at(12)).unwrap();
        store.save_sensor_aggregate(aggregate_at(8)).unwrap();
        store.save_sensor_aggregate(aggregate_at(10)).unwrap();
        let since = Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap();
        let rows = store.sensor_aggregates_since(since).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].observed_at < rows[1].observed_at);
        // latest means last written, not latest timestamp
        assert_eq!(
            store.latest_sensor_aggregate().unwrap().unwrap().observed_at,
            aggregate_at(10).observed_at
        );
    }
}
