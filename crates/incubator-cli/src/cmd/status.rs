use crate::cmd::open_engine;
use crate::output::print_json;
use anyhow::Context;
use chrono::NaiveDateTime;
use std::path::Path;

pub fn run(root: &Path, now: NaiveDateTime, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let actuators = engine
        .compute_actuator_status(now)
        .context("failed to compute actuator status")?;
    let stepper = engine
        .compute_stepper_status(now)
        .context("failed to evaluate stepper")?;
    let schedule = engine.stepper_state()?;

    if json {
        print_json(&serde_json::json!({
            "fan": actuators.fan,
            "humidifier": actuators.humidifier,
            "stepper": stepper,
            "next_run_at": schedule.next_run_at.format("%H:%M").to_string(),
            "evaluated_at": now.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }))?;
        return Ok(());
    }

    println!("Fan:        {}", actuators.fan);
    println!("Humidifier: {}", actuators.humidifier);
    println!("Stepper:    {}", stepper);
    println!("Next turn:  {}", schedule.next_run_at.format("%H:%M"));
    Ok(())
}
