use crate::cmd::open_engine;
use crate::output::print_json;
use anyhow::Context;
use chrono::NaiveDateTime;
use clap::Subcommand;
use incubator_core::{model::DATE_FORMAT, ParameterRequest};
use std::path::Path;

#[derive(Subcommand)]
pub enum ParamsSubcommand {
    /// Show the active parameters and stepper schedule
    Show,

    /// Store a new parameter record and re-arm the stepper
    Set {
        /// Target temperature in °C (default: config)
        #[arg(long)]
        temperature: Option<f64>,
        /// Target relative humidity in % (default: config)
        #[arg(long)]
        humidity: Option<f64>,
        /// Cycle start date, YYYY-MM-DD (default: today)
        #[arg(long)]
        start_date: Option<String>,
        /// Species: poule, canne, oie, caille, or other (default: config)
        #[arg(long)]
        species: Option<String>,
        /// Cycle length in days for species outside the catalog
        #[arg(long)]
        cycle_days: Option<i64>,
        /// Turns per hour (default: config)
        #[arg(long)]
        stepper_count: Option<i32>,
        /// Leave the egg-turning motor off
        #[arg(long)]
        no_stepper: bool,
    },
}

pub fn run(
    root: &Path,
    subcmd: ParamsSubcommand,
    now: NaiveDateTime,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ParamsSubcommand::Show => show(root, now, json),
        ParamsSubcommand::Set {
            temperature,
            humidity,
            start_date,
            species,
            cycle_days,
            stepper_count,
            no_stepper,
        } => {
            let engine = open_engine(root)?;
            let defaults = &engine.config().defaults;
            let request = ParameterRequest {
                target_temperature: temperature.unwrap_or(defaults.target_temperature),
                target_humidity: humidity.unwrap_or(defaults.target_humidity),
                start_date: start_date
                    .unwrap_or_else(|| now.date().format(DATE_FORMAT).to_string()),
                stepper_enabled: !no_stepper,
                stepper_count: stepper_count.unwrap_or(defaults.stepper_count),
                species: species.unwrap_or_else(|| defaults.species.to_string()),
                cycle_override: cycle_days,
            };
            let saved = engine
                .apply_parameters(&request, now)
                .context("failed to apply parameters")?;

            if json {
                print_json(&saved)?;
            } else {
                println!(
                    "Parameters saved: {} from {} ({} days)",
                    saved.species, saved.start_date, saved.cycle_length_days
                );
            }
            Ok(())
        }
    }
}

fn show(root: &Path, now: NaiveDateTime, json: bool) -> anyhow::Result<()> {
    let engine = open_engine(root)?;
    let current = engine.current_config()?;

    let Some(current) = current else {
        if json {
            print_json(&serde_json::json!({ "parameters": null, "stepper": null }))?;
        } else {
            println!("No parameters yet. Run: incubator params set");
        }
        return Ok(());
    };

    let params = &current.parameters;
    if json {
        print_json(&serde_json::json!({
            "parameters": params,
            "stepper": current.stepper,
            "elapsed_days": params.elapsed_days(now.date()),
        }))?;
        return Ok(());
    }

    println!("Species:      {}", params.species);
    println!(
        "Start date:   {} (day {} of {})",
        params.start_date,
        params.elapsed_days(now.date()),
        params.cycle_length_days
    );
    println!("Temperature:  {:.1} °C", params.target_temperature);
    println!("Humidity:     {:.1} %", params.target_humidity);
    if params.stepper_enabled {
        println!(
            "Stepper:      {} turns/hour, next at {}",
            params.stepper_count,
            current.stepper.next_run_at.format("%H:%M")
        );
    } else {
        println!("Stepper:      disabled");
    }
    Ok(())
}
