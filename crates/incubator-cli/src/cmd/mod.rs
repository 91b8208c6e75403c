pub mod config;
pub mod cycle;
pub mod history;
pub mod ingest;
pub mod init;
pub mod params;
pub mod species;
pub mod status;

use anyhow::Context;
use chrono::NaiveDateTime;
use incubator_core::{config::EngineConfig, db::IncubatorDb, paths, Engine};
use std::path::Path;

const AT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parse a `--at` value as local wall-clock time.
pub fn parse_at(raw: &str) -> Result<NaiveDateTime, String> {
    AT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM[:SS], got '{raw}'"))
}

/// Open the engine against the database and config under `root`.
pub fn open_engine(root: &Path) -> anyhow::Result<Engine<IncubatorDb>> {
    let config = EngineConfig::load(root).context("failed to load config")?;
    let db_path = paths::db_path(root);
    let db = IncubatorDb::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    Ok(Engine::new(db, config))
}
