//! `stirpes timeline`: processed events within a date range.

use super::load_engine;
use crate::output::{CliError, OutputMode, Renderable, pretty_section, render_error, render_list};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use stirpes_core::event::EventType;
use stirpes_core::rules::RuleSet;

#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Scenario file (TOML, or JSON with a `.json` extension).
    pub scenario: PathBuf,

    /// Only events on or after this date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Only events on or before this date (YYYY-MM-DD).
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Only events of this kind (deed or death).
    #[arg(long)]
    pub kind: Option<EventType>,
}

#[derive(Debug, Serialize)]
pub struct TimelineRow {
    pub id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source: String,
    pub label: String,
    /// Whether the event moved any ownership.
    pub transfer: bool,
    pub recipients: Vec<String>,
    pub warnings: usize,
}

impl Renderable for TimelineRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let marker = if self.transfer { ' ' } else { '·' };
        writeln!(w, "{} {marker} {:<6} {:<24} {}", self.date, self.kind.as_str(), self.id, self.label)?;
        if !self.recipients.is_empty() {
            writeln!(w, "{:13}-> {}", "", self.recipients.join(", "))?;
        }
        if self.warnings > 0 {
            writeln!(w, "{:13}!  {} warning(s)", "", self.warnings)?;
        }
        Ok(())
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer(&mut *w, self).map_err(io::Error::other)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.date, self.kind, self.id, self.source, self.recipients.len(), self.warnings
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["DATE", "TYPE", "ID", "SOURCE", "RECIPIENTS", "WARNINGS"]
    }
}

/// Execute `stirpes timeline <SCENARIO>`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be loaded or processed, or if
/// `--from` is after `--to`.
pub fn run_timeline(args: &TimelineArgs, defaults: &RuleSet, output: OutputMode) -> anyhow::Result<()> {
    let from = args.from.unwrap_or(NaiveDate::MIN);
    let to = args.to.unwrap_or(NaiveDate::MAX);
    if from > to {
        let message = format!("--from {from} is after --to {to}");
        let error = CliError {
            suggestion: Some("swap the dates, or drop one bound".to_string()),
            ..CliError::new(message.clone())
        };
        render_error(output, &error)?;
        anyhow::bail!(message);
    }

    let engine = load_engine(&args.scenario, defaults, output)?;
    let ledger = engine.ledger();

    let rows: Vec<TimelineRow> = engine
        .events_between(from, to)
        .into_iter()
        .filter(|event| args.kind.is_none_or(|kind| event.event_type() == kind))
        .filter_map(|event| {
            let trail = &ledger.entry(&event.id)?.trail;
            Some(TimelineRow {
                id: event.id.to_string(),
                date: event.date,
                kind: event.event_type(),
                source: event.source.to_string(),
                label: event.display_label(),
                transfer: trail.transfer,
                recipients: trail
                    .recipients
                    .iter()
                    .flat_map(|a| a.holders())
                    .map(|a| format!("{} {}", a.person, a.fraction))
                    .collect(),
                warnings: trail.warnings.len(),
            })
        })
        .collect();

    if output == OutputMode::Pretty {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        pretty_section(&mut out, &format!("Timeline ({} events)", rows.len()))?;
    }
    render_list(&rows, output)?;
    Ok(())
}
