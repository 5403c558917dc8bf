//! Event data model for a succession timeline.
//!
//! An [`Event`] is one dated, immutable legal fact about the property: a
//! deed conveying part of a living owner's share, or a death whose share is
//! distributed by the succession rules. Events are consumed strictly in
//! ascending date order; a later-discovered fact is a new event, never an
//! edit of an old one.

pub mod data;
pub mod types;
pub mod validate;

pub use data::{DeathData, DeedData, DeedDocument, Grant, LegalBasis, ShareBasis};
pub use types::{EventType, UnknownEventType};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::PersonId;

/// Stable identifier of an event, e.g. `"deed_2015"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Type-specific event payload, tagged by `type` in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventPayload {
    Deed(DeedData),
    Death(DeathData),
}

/// A single event in the timeline.
///
/// `source` is the grantor of a deed or the decedent of a death.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub date: NaiveDate,
    pub source: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    #[must_use]
    pub fn deed(
        id: impl Into<String>,
        date: NaiveDate,
        source: impl Into<String>,
        recipients: Vec<Grant>,
    ) -> Self {
        Self {
            id: EventId::new(id),
            date,
            source: PersonId::new(source),
            label: None,
            payload: EventPayload::Deed(DeedData {
                recipients,
                basis: ShareBasis::OfSource,
                document: None,
            }),
        }
    }

    #[must_use]
    pub fn death(id: impl Into<String>, date: NaiveDate, source: impl Into<String>) -> Self {
        Self {
            id: EventId::new(id),
            date,
            source: PersonId::new(source),
            label: None,
            payload: EventPayload::Death(DeathData::default()),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self.payload {
            EventPayload::Deed(_) => EventType::Deed,
            EventPayload::Death(_) => EventType::Death,
        }
    }

    /// The label if one was given, otherwise a generated one.
    #[must_use]
    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| match &self.payload {
            EventPayload::Deed(_) => format!("Deed from {}", self.source),
            EventPayload::Death(_) => format!("{} dies", self.source),
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.date,
            self.event_type(),
            self.id,
            self.display_label()
        )
    }
}
