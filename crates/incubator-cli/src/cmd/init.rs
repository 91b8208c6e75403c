use anyhow::Context;
use incubator_core::{config::EngineConfig, db::IncubatorDb, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing incubator in: {}", root.display());

    let dir = paths::incubator_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config_yaml = serde_yaml::to_string(&EngineConfig::default())?;
    let created = io::write_if_missing(&paths::config_path(root), config_yaml.as_bytes())
        .context("failed to write config.yaml")?;
    report(created, paths::CONFIG_FILE);

    let db_path = paths::db_path(root);
    let existed = db_path.exists();
    IncubatorDb::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    report(!existed, paths::DB_FILE);

    println!("\nNext: incubator params set --start-date YYYY-MM-DD --species poule");
    Ok(())
}

fn report(created: bool, rel: &str) {
    if created {
        println!("  created: {rel}");
    } else {
        println!("  exists:  {rel}");
    }
}
