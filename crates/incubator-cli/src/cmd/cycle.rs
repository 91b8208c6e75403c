use crate::cmd::open_engine;
use crate::output::print_json;
use chrono::NaiveDateTime;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum CycleSubcommand {
    /// Report whether a new cycle may start on DATE (YYYY-MM-DD)
    Check { date: String },
}

pub fn run(
    root: &Path,
    subcmd: CycleSubcommand,
    now: NaiveDateTime,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        CycleSubcommand::Check { date } => {
            let engine = open_engine(root)?;
            let startable = engine.is_cycle_startable(&date, now)?;
            if json {
                print_json(&serde_json::json!({ "date": date, "startable": startable }))?;
            } else if startable {
                println!("{date}: a new cycle can start");
            } else {
                println!("{date}: blocked by the running cycle");
            }
            Ok(())
        }
    }
}
