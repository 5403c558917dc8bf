//! `stirpes ownership`: who holds what at a point in time.

use super::{SnapshotView, load_engine};
use crate::output::{OutputMode, pretty_section, render_mode};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use stirpes_core::rules::RuleSet;

#[derive(Args, Debug)]
pub struct OwnershipArgs {
    /// Scenario file (TOML, or JSON with a `.json` extension).
    pub scenario: PathBuf,

    /// Show ownership as of this date (YYYY-MM-DD). Events dated on this day
    /// are included. Defaults to after the last event.
    #[arg(long, value_name = "DATE")]
    pub at: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct OwnershipReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    at: Option<NaiveDate>,
    /// The last event applied at `at`, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    after_event: Option<String>,
    #[serde(flatten)]
    snapshot: SnapshotView,
}

/// Execute `stirpes ownership <SCENARIO>`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be loaded or processed.
pub fn run_ownership(
    args: &OwnershipArgs,
    defaults: &RuleSet,
    output: OutputMode,
) -> anyhow::Result<()> {
    let engine = load_engine(&args.scenario, defaults, output)?;

    let (snapshot, after_event) = match args.at {
        Some(date) => {
            let last = engine.events_between(NaiveDate::MIN, date).last().map(|e| e.id.to_string());
            (engine.ownership_at(date), last)
        }
        None => (engine.current(), engine.events().last().map(|e| e.id.to_string())),
    };

    let report = OwnershipReport {
        at: args.at,
        after_event,
        snapshot: SnapshotView::new(engine.graph(), snapshot),
    };

    render_mode(
        output,
        &report,
        |r, w| r.snapshot.write_text(w, ""),
        |r, w| {
            let heading = match (r.at, &r.after_event) {
                (Some(date), _) => format!("Ownership as of {date}"),
                (None, Some(event)) => format!("Ownership after {event}"),
                (None, None) => "Initial ownership".to_string(),
            };
            pretty_section(w, &heading)?;
            r.snapshot.write_pretty(w)?;
            if let Some(ref event) = r.after_event
                && r.at.is_some()
            {
                writeln!(w)?;
                writeln!(w, "Last event applied: {event}")?;
            }
            Ok(())
        },
    )
}
