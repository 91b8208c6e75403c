//! Durable [`IncubatorStore`] on redb.
//!
//! # Table design
//!
//! One table per record kind, each keyed by a monotonically increasing `u64`
//! row id with a JSON-encoded value:
//!
//! ```text
//! sensor_aggregates : row_id -> SensorAggregate
//! parameters        : row_id -> Parameters
//! stepper           : row_id -> StepperState
//! ```
//!
//! The active record of a kind is the row with the highest id, so reading it
//! is a single `last()` lookup. Rows are never deleted.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IncubatorError, Result};
use crate::model::{Parameters, SensorAggregate, StepperState};
use crate::store::IncubatorStore;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

type Rows = TableDefinition<'static, u64, &'static [u8]>;

const AGGREGATES: Rows = TableDefinition::new("sensor_aggregates");
const PARAMETERS: Rows = TableDefinition::new("parameters");
const STEPPER: Rows = TableDefinition::new("stepper");

fn db_err(e: impl std::fmt::Display) -> IncubatorError {
    IncubatorError::Db(e.to_string())
}

// ---------------------------------------------------------------------------
// IncubatorDb
// ---------------------------------------------------------------------------

pub struct IncubatorDb {
    db: Database,
}

impl IncubatorDb {
    /// Open or create the redb database at `path`, creating every table so
    /// reads never see a missing one.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::io::ensure_dir(parent)?;
        }
        let db = Database::create(path).map_err(db_err)?;
        let wt = db.begin_write().map_err(db_err)?;
        for table in [AGGREGATES, PARAMETERS, STEPPER] {
            wt.open_table(table).map_err(db_err)?;
        }
        wt.commit().map_err(db_err)?;
        Ok(Self { db })
    }

    fn append<T: Serialize>(&self, table: Rows, row: &T) -> Result<u64> {
        let value = serde_json::to_vec(row)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let id = {
            let mut t = wt.open_table(table).map_err(db_err)?;
            let id = t
                .last()
                .map_err(db_err)?
                .map(|(k, _)| k.value() + 1)
                .unwrap_or(1);
            t.insert(id, value.as_slice()).map_err(db_err)?;
            id
        };
        wt.commit().map_err(db_err)?;
        Ok(id)
    }

    /// Replace the highest row, or insert row 1 into an empty table.
    fn overwrite_last<T: Serialize>(&self, table: Rows, row: &T) -> Result<u64> {
        let value = serde_json::to_vec(row)?;
        let wt = self.db.begin_write().map_err(db_err)?;
        let id = {
            let mut t = wt.open_table(table).map_err(db_err)?;
            let id = t
                .last()
                .map_err(db_err)?
                .map(|(k, _)| k.value())
                .unwrap_or(1);
            t.insert(id, value.as_slice()).map_err(db_err)?;
            id
        };
        wt.commit().map_err(db_err)?;
        Ok(id)
    }

    fn last<T: DeserializeOwned>(&self, table: Rows) -> Result<Option<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let t = rt.open_table(table).map_err(db_err)?;
        let Some((_, v)) = t.last().map_err(db_err)? else {
            return Ok(None);
        };
        let row: T = serde_json::from_slice(v.value())?;
        Ok(Some(row))
    }

    fn all<T: DeserializeOwned>(&self, table: Rows) -> Result<Vec<T>> {
        let rt = self.db.begin_read().map_err(db_err)?;
        let t = rt.open_table(table).map_err(db_err)?;
        let mut rows = Vec::new();
        for entry in t.iter().map_err(db_err)? {
            let (_, v) = entry.map_err(db_err)?;
            rows.push(serde_json::from_slice(v.value())?);
        }
        Ok(rows)
    }

    /// Every parameter record ever saved, oldest first.
    pub fn parameter_history(&self) -> Result<Vec<Parameters>> {
        self.all(PARAMETERS)
    }
}

impl IncubatorStore for IncubatorDb {
    fn latest_sensor_aggregate(&self) -> Result<Option<SensorAggregate>> {
        self.last(AGGREGATES)
    }

    fn active_parameters(&self) -> Result<Option<Parameters>> {
        self.last(PARAMETERS)
    }

    fn active_stepper_state(&self) -> Result<Option<StepperState>> {
        self.last(STEPPER)
    }

    fn save_parameters(&self, parameters: Parameters) -> Result<Parameters> {
        let id = self.append(PARAMETERS, &parameters)?;
        tracing::debug!(row = id, "parameters saved");
        Ok(parameters)
    }

    fn save_stepper_state(&self, state: StepperState) -> Result<StepperState> {
        let id = self.overwrite_last(STEPPER, &state)?;
        tracing::debug!(row = id, "stepper state saved");
        Ok(state)
    }

    fn save_sensor_aggregate(&self, aggregate: SensorAggregate) -> Result<SensorAggregate> {
        self.append(AGGREGATES, &aggregate)?;
        Ok(aggregate)
    }

    fn sensor_aggregates_since(&self, since: DateTime<Utc>) -> Result<Vec<SensorAggregate>> {
        let mut rows: Vec<SensorAggregate> = self
            .all::<SensorAggregate>(AGGREGATES)?
            .into_iter()
            .filter(|a| a.observed_at >= since)
            .collect();
        rows.sort_by_key(|a| a.observed_at);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
