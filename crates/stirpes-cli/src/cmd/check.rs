//! `stirpes check`: process a scenario end to end and summarize the result.
//!
//! A failing event stops the run. The summary then covers every event
//! applied before it, and the error names the failing event and its code.

use super::{SnapshotView, load_scenario};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_section, render_error, render_mode};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use stirpes_core::engine::SuccessionEngine;
use stirpes_core::rules::RuleSet;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Scenario file (TOML, or JSON with a `.json` extension).
    pub scenario: PathBuf,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    ok: bool,
    jurisdiction: String,
    people: usize,
    events: usize,
    applied: usize,
    transfers: usize,
    ownership: SnapshotView,
    warnings: Vec<WarningRow>,
}

#[derive(Debug, Serialize)]
struct WarningRow {
    event_id: String,
    #[serde(rename = "type")]
    kind: String,
    person: String,
    message: String,
}

impl CheckReport {
    fn new(title: Option<String>, events: usize, engine: &SuccessionEngine, ok: bool) -> Self {
        let entries = engine.ledger().entries();
        Self {
            title,
            ok,
            jurisdiction: engine.rules().name.clone(),
            people: engine.graph().people().count(),
            events,
            applied: entries.len(),
            transfers: entries.iter().filter(|e| e.trail.transfer).count(),
            ownership: SnapshotView::new(engine.graph(), engine.current()),
            warnings: engine
                .warnings()
                .into_iter()
                .map(|(event_id, warning)| WarningRow {
                    event_id: event_id.to_string(),
                    kind: warning.kind.to_string(),
                    person: warning.person.to_string(),
                    message: warning.message.clone(),
                })
                .collect(),
        }
    }
}

/// Execute `stirpes check <SCENARIO>`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be loaded, or if any event fails.
pub fn run_check(args: &CheckArgs, defaults: &RuleSet, output: OutputMode) -> anyhow::Result<()> {
    let scenario = load_scenario(&args.scenario, output)?;
    let events = scenario.events.len();

    let failure = match scenario.run(defaults) {
        Ok(engine) => {
            let report = CheckReport::new(scenario.title.clone(), events, &engine, true);
            return render_report(output, &report);
        }
        Err(failure) => failure,
    };

    if let Some(partial) = failure.partial() {
        let report = CheckReport::new(scenario.title.clone(), events, partial, false);
        render_report(output, &report)?;
    }
    render_error(output, &CliError::from(&failure))?;
    anyhow::bail!("{}", failure.error)
}

fn render_report(output: OutputMode, report: &CheckReport) -> anyhow::Result<()> {
    render_mode(
        output,
        report,
        |r, w| {
            writeln!(w, "ok\t{}", r.ok)?;
            writeln!(w, "applied\t{}/{}", r.applied, r.events)?;
            writeln!(w, "transfers\t{}", r.transfers)?;
            writeln!(w, "warnings\t{}", r.warnings.len())?;
            r.ownership.write_text(w, "holding\t")
        },
        |r, w| {
            pretty_section(w, r.title.as_deref().unwrap_or("Scenario"))?;
            pretty_kv(w, "Jurisdiction", &r.jurisdiction)?;
            pretty_kv(w, "People", r.people.to_string())?;
            pretty_kv(w, "Events", format!("{} of {} applied", r.applied, r.events))?;
            pretty_kv(w, "Transfers", r.transfers.to_string())?;
            pretty_kv(w, "Warnings", r.warnings.len().to_string())?;
            writeln!(w)?;
            let heading = if r.ok {
                "Final ownership"
            } else {
                "Ownership before the failing event"
            };
            pretty_section(w, heading)?;
            r.ownership.write_pretty(w)?;
            if !r.warnings.is_empty() {
                writeln!(w)?;
                pretty_section(w, "Warnings")?;
                for warning in &r.warnings {
                    writeln!(w, "  {} [{}] {}", warning.event_id, warning.kind, warning.message)?;
                }
            }
            if r.ok {
                writeln!(w)?;
                writeln!(w, "✓ every snapshot accounts for exactly 1")?;
            }
            Ok(())
        },
    )
}
