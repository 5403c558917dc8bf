use std::fmt;

use chrono::NaiveDate;

use crate::event::EventId;
use crate::fraction::{Fraction, FractionError};
use crate::model::PersonId;

/// Machine-readable error codes for tooling-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidFraction,
    FractionOverflow,
    UnknownPerson,
    AmbiguousSpouse,
    MalformedGraph,
    InsufficientOwnership,
    LedgerInvariantViolation,
    EventOutOfOrder,
    DuplicateEvent,
    UnknownEvent,
    InvalidEvent,
    InvalidScenario,
    ConfigParseError,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidFraction => "E1001",
            Self::FractionOverflow => "E1002",
            Self::UnknownPerson => "E2001",
            Self::AmbiguousSpouse => "E2002",
            Self::MalformedGraph => "E2003",
            Self::InsufficientOwnership => "E3001",
            Self::LedgerInvariantViolation => "E3002",
            Self::EventOutOfOrder => "E4001",
            Self::DuplicateEvent => "E4002",
            Self::UnknownEvent => "E4003",
            Self::InvalidEvent => "E4004",
            Self::InvalidScenario => "E5001",
            Self::ConfigParseError => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidFraction => "Invalid fraction",
            Self::FractionOverflow => "Fraction arithmetic overflow",
            Self::UnknownPerson => "Person not found",
            Self::AmbiguousSpouse => "More than one active marriage",
            Self::MalformedGraph => "Malformed family graph",
            Self::InsufficientOwnership => "Deed exceeds grantor's share",
            Self::LedgerInvariantViolation => "Ownership ledger invariant violated",
            Self::EventOutOfOrder => "Event out of chronological order",
            Self::DuplicateEvent => "Duplicate event ID",
            Self::UnknownEvent => "Event not found",
            Self::InvalidEvent => "Invalid event",
            Self::InvalidScenario => "Invalid scenario",
            Self::ConfigParseError => "Config file parse error",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidFraction => Some("Fractions are written 'n/d' with a non-zero denominator."),
            Self::FractionOverflow => None,
            Self::UnknownPerson => Some("Add the person to the scenario's people list."),
            Self::AmbiguousSpouse => {
                Some("Record an end year on the earlier marriage so the intervals do not overlap.")
            }
            Self::MalformedGraph => Some("Check parentage for cycles, self-links, and duplicates."),
            Self::InsufficientOwnership => {
                Some("A grantor cannot convey more than the share they currently hold.")
            }
            Self::LedgerInvariantViolation => {
                Some("Shares no longer sum to 1. Report a bug with the scenario attached.")
            }
            Self::EventOutOfOrder => Some("List events in ascending date order."),
            Self::DuplicateEvent => Some("Give every event a unique id."),
            Self::UnknownEvent => Some("Use `stirpes timeline` to list event ids."),
            Self::InvalidEvent => None,
            Self::InvalidScenario => Some("Fix the scenario file and retry."),
            Self::ConfigParseError => Some("Fix syntax in .stirpes/config.toml and retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Every failure the succession engine can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SuccessionError {
    #[error(transparent)]
    Fraction(#[from] FractionError),

    #[error("unknown person '{0}'")]
    UnknownPerson(PersonId),

    #[error(
        "'{person}' has {} active marriages in {year} ({}); expected at most one",
        .candidates.len(),
        join_ids(.candidates)
    )]
    AmbiguousSpouse {
        person: PersonId,
        year: i32,
        candidates: Vec<PersonId>,
    },

    #[error("malformed family graph: {0}")]
    MalformedGraph(String),

    #[error(
        "event '{event_id}': '{grantor}' holds {held} but the deed conveys {requested}"
    )]
    InsufficientOwnership {
        event_id: EventId,
        grantor: PersonId,
        held: Fraction,
        requested: Fraction,
    },

    #[error("event '{event_id}': ledger invariant violated: {reason}")]
    LedgerInvariantViolation { event_id: EventId, reason: String },

    #[error("event '{event_id}' dated {date} follows an event dated {previous}")]
    EventOutOfOrder {
        event_id: EventId,
        date: NaiveDate,
        previous: NaiveDate,
    },

    #[error("duplicate event id '{0}'")]
    DuplicateEvent(EventId),

    #[error("unknown event '{0}'")]
    UnknownEvent(EventId),

    #[error("event '{event_id}' is invalid: {reason}")]
    InvalidEvent { event_id: EventId, reason: String },

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("event '{event_id}' failed: {source}")]
    EventFailed {
        event_id: EventId,
        source: Box<SuccessionError>,
    },
}

impl SuccessionError {
    /// Attach the id of the event being processed, unless the error already
    /// names one.
    #[must_use]
    pub fn during(self, event_id: &EventId) -> Self {
        if self.event_id().is_some() {
            self
        } else {
            Self::EventFailed {
                event_id: event_id.clone(),
                source: Box::new(self),
            }
        }
    }

    /// The event this error is attributed to, if any.
    #[must_use]
    pub fn event_id(&self) -> Option<&EventId> {
        match self {
            Self::InsufficientOwnership { event_id, .. }
            | Self::LedgerInvariantViolation { event_id, .. }
            | Self::EventOutOfOrder { event_id, .. }
            | Self::InvalidEvent { event_id, .. }
            | Self::EventFailed { event_id, .. }
            | Self::DuplicateEvent(event_id) => Some(event_id),
            _ => None,
        }
    }

    /// The stable error code for this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Fraction(FractionError::Overflow) => ErrorCode::FractionOverflow,
            Self::Fraction(_) => ErrorCode::InvalidFraction,
            Self::UnknownPerson(_) => ErrorCode::UnknownPerson,
            Self::AmbiguousSpouse { .. } => ErrorCode::AmbiguousSpouse,
            Self::MalformedGraph(_) => ErrorCode::MalformedGraph,
            Self::InsufficientOwnership { .. } => ErrorCode::InsufficientOwnership,
            Self::LedgerInvariantViolation { .. } => ErrorCode::LedgerInvariantViolation,
            Self::EventOutOfOrder { .. } => ErrorCode::EventOutOfOrder,
            Self::DuplicateEvent(_) => ErrorCode::DuplicateEvent,
            Self::UnknownEvent(_) => ErrorCode::UnknownEvent,
            Self::InvalidEvent { .. } => ErrorCode::InvalidEvent,
            Self::InvalidScenario(_) => ErrorCode::InvalidScenario,
            Self::EventFailed { source, .. } => source.code(),
        }
    }
}

fn join_ids(ids: &[PersonId]) -> String {
    ids.iter()
        .map(PersonId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
