//! `stirpes explain`: the reasoning behind one event's transfer.

use super::{display_name, load_engine};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, pretty_section, render_error, render_mode};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;
use stirpes_core::event::EventId;
use stirpes_core::graph::FamilyGraph;
use stirpes_core::rules::{Allocation, RuleSet};
use stirpes_core::transfer::ExplanationTrail;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Scenario file (TOML, or JSON with a `.json` extension).
    pub scenario: PathBuf,

    /// Id of the event to explain (see `stirpes timeline`).
    pub event_id: String,
}

/// Execute `stirpes explain <SCENARIO> <EVENT_ID>`.
///
/// # Errors
///
/// Returns an error if the scenario fails to process or the event id is not
/// in its timeline.
pub fn run_explain(args: &ExplainArgs, defaults: &RuleSet, output: OutputMode) -> anyhow::Result<()> {
    let engine = load_engine(&args.scenario, defaults, output)?;
    let trail = match engine.explain(&EventId::new(args.event_id.as_str())) {
        Ok(trail) => trail,
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    };
    let graph = engine.graph();

    render_mode(output, trail, write_text, |t, w| write_pretty(graph, t, w))
}

fn write_text(trail: &ExplanationTrail, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "event\t{}", trail.event_id)?;
    writeln!(w, "type\t{}", trail.event_type)?;
    writeln!(w, "date\t{}", trail.date)?;
    writeln!(w, "source\t{}", trail.source)?;
    writeln!(w, "share_before\t{}", trail.source_share_before)?;
    if let Some(rule) = trail.rule {
        writeln!(w, "rule\t{rule}")?;
    }
    if let Some(ref basis) = trail.legal_basis {
        writeln!(w, "legal_basis\t{}", basis.statute)?;
    }
    for allocation in &trail.recipients {
        write_allocation_text(allocation, 0, w)?;
    }
    if !trail.unallocated.is_zero() {
        writeln!(w, "unallocated\t{}", trail.unallocated)?;
    }
    for warning in &trail.warnings {
        writeln!(w, "warning\t{}\t{}\t{}", warning.kind, warning.person, warning.message)?;
    }
    Ok(())
}

fn write_allocation_text(allocation: &Allocation, depth: usize, w: &mut dyn Write) -> io::Result<()> {
    let status = if allocation.deceased { "deceased" } else { "holds" };
    writeln!(
        w,
        "recipient\t{depth}\t{}\t{}\t{}\t{status}",
        allocation.person, allocation.channel, allocation.fraction
    )?;
    for substitute in &allocation.passthrough {
        write_allocation_text(substitute, depth + 1, w)?;
    }
    Ok(())
}

fn write_pretty(graph: &FamilyGraph, trail: &ExplanationTrail, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("{} ({})", trail.label, trail.event_id))?;
    pretty_kv(w, "Date", trail.date.to_string())?;
    pretty_kv(w, "Type", trail.event_type.as_str())?;
    pretty_kv(w, "Source", display_name(graph, &trail.source))?;
    pretty_kv(w, "Share before", trail.source_share_before.to_string())?;
    if let Some(rule) = trail.rule {
        pretty_kv(w, "Rule", rule.as_str())?;
    }
    if let Some(ref basis) = trail.legal_basis {
        let cited = if basis.title.is_empty() {
            basis.statute.clone()
        } else {
            format!("{} ({})", basis.statute, basis.title)
        };
        pretty_kv(w, "Legal basis", cited)?;
        if let Some(ref url) = basis.url {
            pretty_kv(w, "", url)?;
        }
    }

    if !trail.transfer {
        writeln!(w)?;
        writeln!(w, "{} held no share; nothing was transferred.", graph.name_of(&trail.source))?;
        return Ok(());
    }

    if !trail.preamble.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", trail.preamble)?;
    }

    if let Some(ref document) = trail.document {
        writeln!(w)?;
        pretty_section(w, &document.title)?;
        for (key, value) in [
            ("Recorded", document.record_date.as_deref()),
            ("Grantor", Some(document.grantor.as_str())),
            ("Grantee", Some(document.grantee.as_str())),
            ("Property", document.property.as_deref()),
            ("Consideration", document.consideration.as_deref()),
            ("Description", document.description.as_deref()),
        ] {
            if let Some(value) = value {
                pretty_kv(w, key, value)?;
            }
        }
    }

    writeln!(w)?;
    pretty_section(w, "Recipients")?;
    for allocation in &trail.recipients {
        write_allocation_pretty(graph, allocation, 0, w)?;
    }
    if !trail.unallocated.is_zero() {
        writeln!(w, "  (unallocated) {}", trail.unallocated)?;
    }

    if !trail.warnings.is_empty() {
        writeln!(w)?;
        pretty_section(w, "Warnings")?;
        for warning in &trail.warnings {
            writeln!(w, "  [{}] {}", warning.kind, warning.message)?;
        }
    }
    pretty_rule(w)
}

fn write_allocation_pretty(
    graph: &FamilyGraph,
    allocation: &Allocation,
    depth: usize,
    w: &mut dyn Write,
) -> io::Result<()> {
    let indent = "  ".repeat(depth + 1);
    let status = if allocation.deceased { ", deceased" } else { "" };
    writeln!(
        w,
        "{indent}{} [{}{status}] {}",
        display_name(graph, &allocation.person),
        allocation.channel,
        allocation.fraction
    )?;
    writeln!(w, "{indent}  {}", allocation.explanation)?;
    for substitute in &allocation.passthrough {
        write_allocation_pretty(graph, substitute, depth + 1, w)?;
    }
    Ok(())
}
