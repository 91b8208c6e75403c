use crate::output::print_json;
use incubator_core::{species, types::Species};

pub fn run(name: &str, override_days: Option<i64>, json: bool) -> anyhow::Result<()> {
    let parsed = Species::parse(name);
    let days = species::resolve_cycle_length(parsed, override_days);

    if json {
        print_json(&serde_json::json!({
            "species": parsed,
            "cycle_length_days": days,
        }))?;
    } else {
        println!("{parsed}: {days} days");
    }
    Ok(())
}
