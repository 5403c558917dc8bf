#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use stirpes_core::config;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "stirpes: exact-fraction property succession through a family",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output (shorthand for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format. Defaults to pretty on a terminal and text when piped.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// The explicit format flag, if any. `--format` wins over `--json`.
    fn format_flag(&self) -> Option<&'static str> {
        match (self.format, self.json) {
            (Some(mode), _) => Some(mode.as_str()),
            (None, true) => Some(OutputMode::Json.as_str()),
            (None, false) => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Process",
        about = "Process a scenario and summarize it",
        long_about = "Process every event in a scenario, verify each ownership snapshot sums to \
                      exactly 1, and summarize final ownership and data-completeness warnings. \
                      Exits non-zero naming the failing event if any event is rejected.",
        after_help = "EXAMPLES:\n    # Check the bundled demo\n    stirpes check demos/smith-family.toml\n\n    # Emit machine-readable output\n    stirpes check demos/smith-family.toml --json"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        next_help_heading = "Query",
        about = "Show ownership at a date",
        long_about = "Show who holds what after every event dated on or before a date, or after \
                      the last event when no date is given.",
        after_help = "EXAMPLES:\n    # Ownership after the last event\n    stirpes ownership demos/smith-family.toml\n\n    # Ownership on a given day\n    stirpes ownership demos/smith-family.toml --at 2020-09-21\n\n    # Emit machine-readable output\n    stirpes ownership demos/smith-family.toml --json"
    )]
    Ownership(cmd::ownership::OwnershipArgs),

    #[command(
        next_help_heading = "Query",
        about = "List events in a date range",
        long_about = "List processed events dated within an inclusive range, optionally filtered \
                      by kind, with who received shares.",
        after_help = "EXAMPLES:\n    # Every event\n    stirpes timeline demos/smith-family.toml\n\n    # Deaths from 2018 through 2020\n    stirpes timeline demos/smith-family.toml --kind death --from 2018-01-01 --to 2020-12-31"
    )]
    Timeline(cmd::timeline::TimelineArgs),

    #[command(
        next_help_heading = "Query",
        about = "Explain one event's transfer",
        long_about = "Show the rule, legal basis, recipients with their derivations, per stirpes \
                      passthroughs, and warnings for one event.",
        after_help = "EXAMPLES:\n    # Explain a death\n    stirpes explain demos/smith-family.toml death_john_2020\n\n    # Emit machine-readable output\n    stirpes explain demos/smith-family.toml death_john_2020 --json"
    )]
    Explain(cmd::explain::ExplainArgs),

    #[command(
        next_help_heading = "Query",
        about = "Show every ownership snapshot",
        long_about = "Show the initial ownership and the snapshot after each event, in order.",
        after_help = "EXAMPLES:\n    # Print the full ledger\n    stirpes ledger demos/smith-family.toml\n\n    # Emit machine-readable output\n    stirpes ledger demos/smith-family.toml --json"
    )]
    Ledger(cmd::ledger::LedgerArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("STIRPES_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "stirpes=debug,info"
        } else {
            "stirpes=info,warn"
        })
    });

    let format = env::var("STIRPES_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    stirpes_core::init();

    let cli = Cli::parse();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = env::current_dir()?;
    let config = config::resolve_config(&project_root, cli.format_flag())?;
    let output = OutputMode::from_resolved(&config.resolved_output);
    debug!(output = output.as_str(), jurisdiction = %config.rules.name, "configuration resolved");

    match cli.command {
        Commands::Check(ref args) => cmd::check::run_check(args, &config.rules, output),
        Commands::Ownership(ref args) => cmd::ownership::run_ownership(args, &config.rules, output),
        Commands::Timeline(ref args) => cmd::timeline::run_timeline(args, &config.rules, output),
        Commands::Explain(ref args) => cmd::explain::run_explain(args, &config.rules, output),
        Commands::Ledger(ref args) => cmd::ledger::run_ledger(args, &config.rules, output),
    }
}
