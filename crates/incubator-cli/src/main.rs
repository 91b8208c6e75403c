mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, cycle::CycleSubcommand, params::ParamsSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "incubator",
    about = "Incubator control engine: actuator status, egg turning and cycle checks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Incubator root (default: auto-detect from .incubator/)
    #[arg(long, global = true, env = "INCUBATOR_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Evaluate as of this local time, YYYY-MM-DDTHH:MM[:SS] (default: now)
    #[arg(long, global = true, value_parser = cmd::parse_at)]
    at: Option<chrono::NaiveDateTime>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .incubator/ with a default config and an empty database
    Init,

    /// Show fan, humidifier and stepper commands
    Status,

    /// Show or change the incubation parameters
    Params {
        #[command(subcommand)]
        subcommand: ParamsSubcommand,
    },

    /// Incubation cycle checks
    Cycle {
        #[command(subcommand)]
        subcommand: CycleSubcommand,
    },

    /// Resolve the cycle length for a species
    Species {
        /// poule, canne, oie, caille, or anything else
        name: String,
        /// Cycle length in days for species outside the catalog
        #[arg(long = "override")]
        override_days: Option<i64>,
    },

    /// Record a sensor batch (JSON file, or - for stdin)
    Ingest { file: PathBuf },

    /// Hourly averages and peak readings
    History {
        /// Look-back window in days
        #[arg(long, default_value = "7")]
        days: i64,
    },

    /// Inspect and validate the engine config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let now = cli
        .at
        .unwrap_or_else(|| chrono::Local::now().naive_local());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Status => cmd::status::run(&root, now, cli.json),
        Commands::Params { subcommand } => cmd::params::run(&root, subcommand, now, cli.json),
        Commands::Cycle { subcommand } => cmd::cycle::run(&root, subcommand, now, cli.json),
        Commands::Species {
            name,
            override_days,
        } => cmd::species::run(&name, override_days, cli.json),
        Commands::Ingest { file } => cmd::ingest::run(&root, &file, cli.json),
        Commands::History { days } => cmd::history::run(&root, days, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
