use crate::cmd::open_engine;
use crate::output::print_json;
use anyhow::Context;
use chrono::Utc;
use incubator_core::ingest::SensorBatch;
use std::io::Read;
use std::path::Path;

pub fn run(root: &Path, file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?
    };

    let batch = SensorBatch::from_json(&raw)?;
    let engine = open_engine(root)?;
    let aggregate = engine
        .record_batch(batch, Utc::now())
        .context("sensor batch rejected")?;

    if json {
        print_json(&aggregate)?;
    } else {
        println!(
            "Recorded {} sensors: {:.1} °C, {:.1} % ({} failed)",
            aggregate.sensors.len(),
            aggregate.average_temperature,
            aggregate.average_humidity,
            aggregate.failed_sensor_count
        );
    }
    Ok(())
}
