//! Data-completeness warnings.
//!
//! A partial family record cannot prove a negative: no recorded children is
//! not the same as childlessness. Whenever rule selection relied on a class
//! of heirs being absent and the record does not positively confirm it, a
//! [`Warning`] is attached to the event. Warnings never block computation.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Circumstances, Rule};
use crate::error::SuccessionError;
use crate::fraction::Fraction;
use crate::graph::FamilyGraph;
use crate::model::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    UnknownChildren,
    UnknownSpouse,
    UnknownParent,
    NoKnownHeirs,
}

impl WarningKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownChildren => "UNKNOWN_CHILDREN",
            Self::UnknownSpouse => "UNKNOWN_SPOUSE",
            Self::UnknownParent => "UNKNOWN_PARENT",
            Self::NoKnownHeirs => "NO_KNOWN_HEIRS",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An assumption a succession computation had to make.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub person: PersonId,
    pub message: String,
}

impl Warning {
    #[must_use]
    pub fn new(kind: WarningKind, person: PersonId, message: impl Into<String>) -> Self {
        Self {
            kind,
            person,
            message: message.into(),
        }
    }
}

/// Warnings for every absent heir class `rule` relied on that the record
/// cannot confirm.
pub(crate) fn completeness_warnings(
    graph: &FamilyGraph,
    decedent: &PersonId,
    rule: Rule,
    circumstances: &Circumstances,
    share: Fraction,
    parents_preempt_siblings: bool,
) -> Result<Vec<Warning>, SuccessionError> {
    let person = graph.person(decedent)?;
    let name = &person.name;
    let mut warnings = Vec::new();

    if circumstances.children.is_empty()
        && graph.children_of(decedent)?.is_empty()
        && !person.facts.confirmed_childless
    {
        warnings.push(Warning::new(
            WarningKind::UnknownChildren,
            decedent.clone(),
            format!("Unknown if {name} had children at time of death"),
        ));
    }

    if circumstances.spouse.is_none()
        && graph.marriages_of(decedent).is_empty()
        && !person.facts.confirmed_unmarried
    {
        warnings.push(Warning::new(
            WarningKind::UnknownSpouse,
            decedent.clone(),
            format!("Unknown if {name} had a surviving spouse at time of death"),
        ));
    }

    let relied_on_no_parents = match rule {
        Rule::SpouseOnly | Rule::Unresolved => true,
        Rule::Siblings => parents_preempt_siblings,
        _ => false,
    };
    if relied_on_no_parents && !person.facts.parents_complete {
        let recorded = graph.parents_of(decedent)?;
        if recorded.len() < 2 {
            let message = match recorded.first() {
                Some(known) => format!(
                    "Unknown if {name} had a living parent at death ({}'s co-parent)",
                    graph.name_of(known)
                ),
                None => format!("Unknown if {name} had a living parent at death"),
            };
            warnings.push(Warning::new(
                WarningKind::UnknownParent,
                decedent.clone(),
                message,
            ));
        }
    }

    if rule == Rule::Unresolved {
        warnings.push(Warning::new(
            WarningKind::NoKnownHeirs,
            decedent.clone(),
            format!("No eligible heir of {name} is known; {share} of the whole is left unallocated"),
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_serialize_screaming_snake() {
        let w = Warning::new(WarningKind::UnknownParent, "frank".into(), "m");
        let json = serde_json::to_value(&w).expect("serialize");
        assert_eq!(json["type"], "UNKNOWN_PARENT");
        assert_eq!(json["person"], "frank");
        assert_eq!(WarningKind::NoKnownHeirs.to_string(), "NO_KNOWN_HEIRS");
    }
}
