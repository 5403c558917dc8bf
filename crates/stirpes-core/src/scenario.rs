//! Scenario files: a family record, initial ownership, and a timeline.
//!
//! Scenarios are TOML (or JSON, chosen by file extension):
//!
//! ```toml
//! [[people]]
//! id = "john"
//! name = "John Smith"
//! birth = 1940
//! death = 2020
//!
//! [[marriages]]
//! partners = ["john", "susan"]
//! start = 2007
//!
//! [[parentage]]
//! parent = "john"
//! children = ["alice", "bob"]
//!
//! [initial_ownership]
//! john = "1"
//!
//! [[events]]
//! id = "deed_2015"
//! type = "deed"
//! date = "2015-06-01"
//! source = "john"
//! recipients = [{ person = "alice", fraction = "1/4" }]
//! ```
//!
//! Dates are quoted `YYYY-MM-DD` strings and fractions are quoted `"n/d"`
//! strings (bare integers are accepted for whole numbers).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::config::JurisdictionConfig;
use crate::engine::{ProcessFailure, SuccessionEngine};
use crate::error::SuccessionError;
use crate::event::Event;
use crate::fraction::Fraction;
use crate::graph::FamilyGraph;
use crate::ledger::OwnershipSnapshot;
use crate::model::{Marriage, Person, PersonId};
use crate::rules::RuleSet;

/// One parent and their children, in birth order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parentage {
    pub parent: PersonId,
    pub children: Vec<PersonId>,
}

/// A complete input for one computation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Overrides layered on the caller's rule set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<JurisdictionConfig>,
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub marriages: Vec<Marriage>,
    #[serde(default)]
    pub parentage: Vec<Parentage>,
    pub initial_ownership: BTreeMap<PersonId, Fraction>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Scenario {
    /// Read a scenario file. `.json` files are parsed as JSON, anything else
    /// as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let scenario = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
        .with_context(|| format!("Failed to parse {}", path.display()))?;

        debug!(
            path = %path.display(),
            people = scenario.people.len(),
            events = scenario.events.len(),
            "loaded scenario"
        );
        Ok(scenario)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Build the family graph from people, marriages and parentage.
    ///
    /// # Errors
    ///
    /// Propagates the graph's insertion errors (duplicate people, unknown
    /// partners, cycles and the like).
    pub fn family_graph(&self) -> Result<FamilyGraph, SuccessionError> {
        let mut graph = FamilyGraph::new();
        for person in &self.people {
            graph.add_person(person.clone())?;
        }
        for marriage in &self.marriages {
            graph.add_marriage(marriage.clone())?;
        }
        for family in &self.parentage {
            for child in &family.children {
                graph.add_parentage(&family.parent, child)?;
            }
        }
        Ok(graph)
    }

    /// The ownership before the first event.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::InvalidScenario`] when an owner is not a
    /// recorded person, and [`SuccessionError::Fraction`] on overflow.
    pub fn initial_snapshot(&self, graph: &FamilyGraph) -> Result<OwnershipSnapshot, SuccessionError> {
        if let Some(stranger) = self.initial_ownership.keys().find(|id| !graph.contains(id)) {
            return Err(SuccessionError::InvalidScenario(format!(
                "initial owner '{stranger}' is not a recorded person"
            )));
        }
        OwnershipSnapshot::from_holdings(
            self.initial_ownership
                .iter()
                .map(|(id, fraction)| (id.clone(), *fraction)),
        )
    }

    /// The rule set for this scenario: its own jurisdiction table layered
    /// over `defaults`.
    #[must_use]
    pub fn rules(&self, defaults: &RuleSet) -> RuleSet {
        self.jurisdiction
            .as_ref()
            .map_or_else(|| defaults.clone(), |j| j.apply_to(defaults.clone()))
    }

    /// Build everything and process the timeline.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessFailure`]; setup problems carry no partial engine.
    pub fn run(&self, defaults: &RuleSet) -> Result<SuccessionEngine, ProcessFailure> {
        let graph = self.family_graph()?;
        let initial = self.initial_snapshot(&graph)?;
        SuccessionEngine::process(graph, self.rules(defaults), initial, self.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventPayload, ShareBasis};
    use crate::graph::SiblingScope;
    use tempfile::TempDir;

    const SMALL: &str = r#"
title = "Small"

[jurisdiction]
sibling_scope = "full_blood"

[[people]]
id = "john"
name = "John Smith"
birth = 1940

[[people]]
id = "alice"
name = "Alice Smith"
birth = 1968

[[parentage]]
parent = "john"
children = ["alice"]

[initial_ownership]
john = 1

[[events]]
id = "deed_2015"
type = "deed"
date = "2015-06-01"
source = "john"
label = "Deed to Alice"
basis = "of_whole"
recipients = [{ person = "alice", fraction = "1/4" }]

[events.document]
title = "Warranty Deed"
grantor = "John Smith"
grantee = "Alice Smith"
"#;

    #[test]
    fn parses_toml_scenarios() {
        let scenario = Scenario::from_toml(SMALL).expect("parse");
        assert_eq!(scenario.title.as_deref(), Some("Small"));
        assert_eq!(scenario.people.len(), 2);
        assert_eq!(scenario.events.len(), 1);

        let EventPayload::Deed(deed) = &scenario.events[0].payload else {
            panic!("expected a deed");
        };
        assert_eq!(deed.basis, ShareBasis::OfWhole);
        assert_eq!(
            deed.document.as_ref().map(|d| d.title.as_str()),
            Some("Warranty Deed")
        );

        let rules = scenario.rules(&RuleSet::default());
        assert_eq!(rules.sibling_scope, SiblingScope::FullBlood);
    }

    #[test]
    fn runs_end_to_end() {
        let scenario = Scenario::from_toml(SMALL).expect("parse");
        let engine = scenario.run(&RuleSet::default()).expect("run");
        assert_eq!(
            engine.current().share_of(&"alice".into()),
            Fraction::new(1, 4).expect("valid")
        );
    }

    #[test]
    fn unknown_initial_owner_is_rejected() {
        let mut scenario = Scenario::from_toml(SMALL).expect("parse");
        scenario.initial_ownership = BTreeMap::from([("ghost".into(), Fraction::ONE)]);
        let failure = scenario.run(&RuleSet::default()).unwrap_err();
        assert!(matches!(failure.error, SuccessionError::InvalidScenario(_)));
        assert!(failure.partial().is_none());
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = TempDir::new().expect("temp dir");
        let toml_path = dir.path().join("small.toml");
        std::fs::write(&toml_path, SMALL).expect("write");
        let from_toml = Scenario::load(&toml_path).expect("load toml");

        let json_path = dir.path().join("small.json");
        std::fs::write(
            &json_path,
            serde_json::to_string(&from_toml).expect("serialize"),
        )
        .expect("write");
        let from_json = Scenario::load(&json_path).expect("load json");
        assert_eq!(from_json, from_toml);
    }

    #[test]
    fn load_reports_the_file_on_parse_errors() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "people = 3").expect("write");
        let err = Scenario::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }
}
