pub mod check;
pub mod explain;
pub mod ledger;
pub mod ownership;
pub mod timeline;

use crate::output::{CliError, OutputMode, render_error};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use stirpes_core::ErrorCode;
use stirpes_core::engine::SuccessionEngine;
use stirpes_core::graph::FamilyGraph;
use stirpes_core::ledger::OwnershipSnapshot;
use stirpes_core::model::PersonId;
use stirpes_core::rules::RuleSet;
use stirpes_core::scenario::Scenario;

/// Load a scenario file, rendering a structured error on failure.
pub fn load_scenario(path: &Path, output: OutputMode) -> anyhow::Result<Scenario> {
    match Scenario::load(path) {
        Ok(scenario) => Ok(scenario),
        Err(err) => {
            render_error(
                output,
                &CliError::with_details(
                    format!("{err:#}"),
                    "check the path and the TOML/JSON syntax of the scenario",
                    ErrorCode::InvalidScenario.code(),
                ),
            )?;
            anyhow::bail!("failed to load {}", path.display());
        }
    }
}

/// Load and process a scenario. Any failure, including a failure partway
/// through the timeline, is rendered and returned as an error.
pub fn load_engine(
    path: &Path,
    defaults: &RuleSet,
    output: OutputMode,
) -> anyhow::Result<SuccessionEngine> {
    let scenario = load_scenario(path, output)?;
    match scenario.run(defaults) {
        Ok(engine) => Ok(engine),
        Err(failure) => {
            render_error(output, &CliError::from(&failure))?;
            anyhow::bail!("{}", failure.error);
        }
    }
}

/// One holder in a rendered snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingRow {
    pub person: String,
    pub name: String,
    pub fraction: String,
}

/// A snapshot with display names resolved, in id order.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotView {
    pub holdings: Vec<HoldingRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unallocated: Option<String>,
}

impl SnapshotView {
    pub fn new(graph: &FamilyGraph, snapshot: &OwnershipSnapshot) -> Self {
        let holdings = snapshot
            .holdings()
            .map(|(person, fraction)| HoldingRow {
                person: person.as_str().to_string(),
                name: graph.name_of(person),
                fraction: fraction.to_string(),
            })
            .collect();
        let unallocated = snapshot.unallocated();
        Self {
            holdings,
            unallocated: (!unallocated.is_zero()).then(|| unallocated.to_string()),
        }
    }

    /// One `prefix person fraction` row per holder, tab-separated.
    pub fn write_text(&self, w: &mut dyn Write, prefix: &str) -> io::Result<()> {
        for row in &self.holdings {
            writeln!(w, "{prefix}{}\t{}", row.person, row.fraction)?;
        }
        if let Some(ref rest) = self.unallocated {
            writeln!(w, "{prefix}(unallocated)\t{rest}")?;
        }
        Ok(())
    }

    pub fn write_pretty(&self, w: &mut dyn Write) -> io::Result<()> {
        if self.holdings.is_empty() {
            writeln!(w, "  (no holders)")?;
        }
        for row in &self.holdings {
            writeln!(w, "  {:<28} {:>8}", format!("{} ({})", row.name, row.person), row.fraction)?;
        }
        if let Some(ref rest) = self.unallocated {
            writeln!(w, "  {:<28} {:>8}", "(unallocated)", rest)?;
        }
        Ok(())
    }
}

/// `Name (id)`, or just the id when no name is recorded.
pub fn display_name(graph: &FamilyGraph, person: &PersonId) -> String {
    let name = graph.name_of(person);
    if name == person.as_str() {
        name
    } else {
        format!("{name} ({person})")
    }
}
