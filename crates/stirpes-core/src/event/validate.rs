//! Per-event validation.
//!
//! Checks run against the family graph before an event is applied:
//!
//! - **Ordering**: ids are unique and dates never decrease (equal dates are
//!   allowed and keep input order).
//! - **References**: the source and every deed recipient are recorded
//!   people.
//! - **Deeds**: at least one recipient, no self-grants, strictly positive
//!   fractions, and grantor and recipients alive on the deed date.
//! - **Deaths**: the decedent was born by the date and dies only once.
//!
//! Ownership checks (a deed conveying more than the grantor holds) need the
//! prior snapshot and live in [`crate::transfer`].

use chrono::NaiveDate;
use std::collections::HashSet;

use super::{Event, EventId, EventPayload};
use crate::error::SuccessionError;
use crate::graph::FamilyGraph;
use crate::model::PersonId;

/// Stateful validator for an event sequence.
///
/// Feed events in input order through [`EventValidator::check`]; the
/// validator remembers ids, the last date, and who has already died.
#[derive(Debug, Default, Clone)]
pub struct EventValidator {
    seen: HashSet<EventId>,
    last_date: Option<NaiveDate>,
    deceased: HashSet<PersonId>,
}

impl EventValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the next event and record it as seen.
    ///
    /// # Errors
    ///
    /// - [`SuccessionError::DuplicateEvent`] for a repeated id.
    /// - [`SuccessionError::EventOutOfOrder`] for a date before the previous
    ///   event's.
    /// - [`SuccessionError::EventFailed`] wrapping
    ///   [`SuccessionError::UnknownPerson`] for dangling ids.
    /// - [`SuccessionError::InvalidEvent`] for any other rejected payload.
    pub fn check(&mut self, graph: &FamilyGraph, event: &Event) -> Result<(), SuccessionError> {
        if self.seen.contains(&event.id) {
            return Err(SuccessionError::DuplicateEvent(event.id.clone()));
        }
        if let Some(previous) = self.last_date
            && event.date < previous
        {
            return Err(SuccessionError::EventOutOfOrder {
                event_id: event.id.clone(),
                date: event.date,
                previous,
            });
        }

        graph.person(&event.source).map_err(|e| e.during(&event.id))?;

        match &event.payload {
            EventPayload::Deed(deed) => self.check_deed(graph, event, deed)?,
            EventPayload::Death(_) => self.check_death(graph, event)?,
        }

        self.seen.insert(event.id.clone());
        self.last_date = Some(event.date);
        Ok(())
    }

    fn check_deed(
        &self,
        graph: &FamilyGraph,
        event: &Event,
        deed: &super::DeedData,
    ) -> Result<(), SuccessionError> {
        let invalid = |reason: String| SuccessionError::InvalidEvent {
            event_id: event.id.clone(),
            reason,
        };

        if deed.recipients.is_empty() {
            return Err(invalid("deed has no recipients".to_string()));
        }
        if self.deceased.contains(&event.source)
            || !graph.is_alive(&event.source, event.date).map_err(|e| e.during(&event.id))?
        {
            return Err(invalid(format!(
                "grantor '{}' is not alive on {}",
                event.source, event.date
            )));
        }

        let mut recipients = HashSet::new();
        for grant in &deed.recipients {
            graph.person(&grant.person).map_err(|e| e.during(&event.id))?;
            if grant.person == event.source {
                return Err(invalid(format!("'{}' cannot grant to themselves", grant.person)));
            }
            if !recipients.insert(&grant.person) {
                return Err(invalid(format!("'{}' is listed more than once", grant.person)));
            }
            if !grant.fraction.is_positive() {
                return Err(invalid(format!(
                    "grant of {} to '{}' must be positive",
                    grant.fraction, grant.person
                )));
            }
            if self.deceased.contains(&grant.person)
                || !graph.is_alive(&grant.person, event.date).map_err(|e| e.during(&event.id))?
            {
                return Err(invalid(format!(
                    "recipient '{}' is not alive on {}",
                    grant.person, event.date
                )));
            }
        }
        Ok(())
    }

    fn check_death(&mut self, graph: &FamilyGraph, event: &Event) -> Result<(), SuccessionError> {
        if !self.deceased.insert(event.source.clone()) {
            return Err(SuccessionError::InvalidEvent {
                event_id: event.id.clone(),
                reason: format!("'{}' already died in an earlier event", event.source),
            });
        }
        if !graph.is_born_by(&event.source, event.date).map_err(|e| e.during(&event.id))? {
            return Err(SuccessionError::InvalidEvent {
                event_id: event.id.clone(),
                reason: format!("'{}' was not born by {}", event.source, event.date),
            });
        }
        Ok(())
    }
}

/// Validate a whole sequence, stopping at the first failure.
///
/// Returns the index of the failing event alongside the error.
///
/// # Errors
///
/// See [`EventValidator::check`].
pub fn validate_events(
    graph: &FamilyGraph,
    events: &[Event],
) -> Result<(), (usize, SuccessionError)> {
    let mut validator = EventValidator::new();
    for (index, event) in events.iter().enumerate() {
        validator.check(graph, event).map_err(|e| (index, e))?;
    }
    Ok(())
}
