use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a person, e.g. `"john"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonId(String);

impl PersonId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Facts that were positively established about a person, as opposed to
/// merely absent from the record.
///
/// An empty children list is not proof of childlessness; succession rules
/// consult these flags to decide whether to attach a data-completeness
/// warning when they rely on a class of heirs being absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFacts {
    /// The person is known to have had no children beyond those recorded.
    #[serde(default)]
    pub confirmed_childless: bool,
    /// The person's marital history is complete as recorded.
    #[serde(default)]
    pub confirmed_unmarried: bool,
    /// Both parents are recorded (or known to be unknowable).
    #[serde(default)]
    pub parents_complete: bool,
}

/// A person in the family record. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub birth: i32,
    /// Year of death; `None` means alive or death not recorded.
    #[serde(default)]
    pub death: Option<i32>,
    #[serde(default)]
    pub facts: KnownFacts,
}

impl Person {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, birth: i32) -> Self {
        Self {
            id: PersonId::new(id),
            name: name.into(),
            birth,
            death: None,
            facts: KnownFacts::default(),
        }
    }

    #[must_use]
    pub const fn died(mut self, year: i32) -> Self {
        self.death = Some(year);
        self
    }

    #[must_use]
    pub const fn with_facts(mut self, facts: KnownFacts) -> Self {
        self.facts = facts;
        self
    }
}
