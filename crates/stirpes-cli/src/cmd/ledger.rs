//! `stirpes ledger`: every ownership snapshot, in event order.

use super::{SnapshotView, load_engine};
use crate::output::{OutputMode, pretty_rule, render_mode};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use stirpes_core::rules::RuleSet;

#[derive(Args, Debug)]
pub struct LedgerArgs {
    /// Scenario file (TOML, or JSON with a `.json` extension).
    pub scenario: PathBuf,
}

#[derive(Debug, Serialize)]
struct LedgerRow {
    /// `None` for the initial snapshot.
    event_id: Option<String>,
    date: Option<NaiveDate>,
    label: String,
    #[serde(flatten)]
    snapshot: SnapshotView,
}

/// Execute `stirpes ledger <SCENARIO>`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be loaded or processed.
pub fn run_ledger(args: &LedgerArgs, defaults: &RuleSet, output: OutputMode) -> anyhow::Result<()> {
    let engine = load_engine(&args.scenario, defaults, output)?;
    let graph = engine.graph();
    let ledger = engine.ledger();

    let mut rows = vec![LedgerRow {
        event_id: None,
        date: None,
        label: "Initial ownership".to_string(),
        snapshot: SnapshotView::new(graph, ledger.initial()),
    }];
    rows.extend(ledger.entries().iter().map(|entry| LedgerRow {
        event_id: Some(entry.event_id.to_string()),
        date: Some(entry.date),
        label: entry.trail.label.clone(),
        snapshot: SnapshotView::new(graph, &entry.snapshot),
    }));

    render_mode(
        output,
        &rows,
        |rows, w| {
            for row in rows {
                let prefix = match (&row.event_id, row.date) {
                    (Some(id), Some(date)) => format!("{date}\t{id}\t"),
                    _ => "initial\t-\t".to_string(),
                };
                row.snapshot.write_text(w, &prefix)?;
            }
            Ok(())
        },
        |rows, w| {
            for row in rows {
                match (&row.event_id, row.date) {
                    (Some(id), Some(date)) => writeln!(w, "{date}  {}  [{id}]", row.label)?,
                    _ => writeln!(w, "{}", row.label)?,
                }
                pretty_rule(w)?;
                row.snapshot.write_pretty(w)?;
                writeln!(w)?;
            }
            Ok(())
        },
    )
}
