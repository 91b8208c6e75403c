use crate::cmd::open_engine;
use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::{TimeDelta, Utc};
use incubator_core::{history, store::IncubatorStore};
use std::path::Path;

pub fn run(root: &Path, days: i64, json: bool) -> anyhow::Result<()> {
    if days <= 0 {
        anyhow::bail!("--days must be positive, got {days}");
    }
    let since = TimeDelta::try_days(days)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .with_context(|| format!("--days {days} reaches past the supported date range"))?;
    let engine = open_engine(root)?;
    let aggregates = engine.store().sensor_aggregates_since(since)?;

    let hourly = history::hourly_averages(&aggregates);
    let peaks = history::peaks(&aggregates);

    if json {
        print_json(&serde_json::json!({
            "hourly": hourly,
            "peaks": peaks,
        }))?;
        return Ok(());
    }

    if hourly.is_empty() {
        println!("No readings in the last {days} days.");
        return Ok(());
    }

    let rows = hourly
        .iter()
        .map(|h| {
            vec![
                h.hour.format("%Y-%m-%d %H:00").to_string(),
                format!("{:.1}", h.temperature),
                format!("{:.1}", h.humidity),
                h.samples.to_string(),
            ]
        })
        .collect();
    print_table(&["HOUR (UTC)", "TEMP", "HUMIDITY", "SAMPLES"], rows);

    if let Some(p) = peaks {
        println!(
            "\nPeaks: {:.1} °C, {:.1} %",
            p.max_temperature, p.max_humidity
        );
    }
    Ok(())
}
