//! Succession engine facade.
//!
//! [`SuccessionEngine::process`] folds the transfer processor over a
//! chronological event list and builds the ownership ledger. Processing is
//! fail-fast: the first rejected event stops the run, and the failure keeps
//! an engine holding every snapshot up to the last good event so callers can
//! still query it.
//!
//! ```
//! use chrono::NaiveDate;
//! use stirpes_core::engine::SuccessionEngine;
//! use stirpes_core::event::{Event, Grant};
//! use stirpes_core::fraction::Fraction;
//! use stirpes_core::graph::FamilyGraph;
//! use stirpes_core::ledger::OwnershipSnapshot;
//! use stirpes_core::model::Person;
//! use stirpes_core::rules::RuleSet;
//!
//! let mut graph = FamilyGraph::new();
//! graph.add_person(Person::new("john", "John Smith", 1940)).unwrap();
//! graph.add_person(Person::new("alice", "Alice Smith", 1968)).unwrap();
//!
//! let date = NaiveDate::from_ymd_opt(2015, 6, 1).unwrap();
//! let deed = Event::deed("deed_2015", date, "john", vec![
//!     Grant::new("alice", Fraction::new(1, 4).unwrap()),
//! ]);
//!
//! let engine = SuccessionEngine::process(
//!     graph,
//!     RuleSet::default(),
//!     OwnershipSnapshot::whole("john"),
//!     vec![deed],
//! )
//! .unwrap();
//! assert_eq!(engine.ownership_at(date).share_of(&"alice".into()), Fraction::new(1, 4).unwrap());
//! ```

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::SuccessionError;
use crate::event::validate::EventValidator;
use crate::event::{Event, EventId, EventPayload};
use crate::graph::FamilyGraph;
use crate::ledger::{Ledger, LedgerEntry, OwnershipSnapshot};
use crate::rules::{RuleSet, Warning};
use crate::transfer::{ExplanationTrail, TransferProcessor};

/// A processed timeline and its ownership ledger.
///
/// Each engine owns its family graph and ledger outright; what-if runs clone
/// or rebuild an engine rather than share one.
#[derive(Debug, Clone)]
pub struct SuccessionEngine {
    graph: FamilyGraph,
    rules: RuleSet,
    events: Vec<Event>,
    ledger: Ledger,
}

/// Why a run stopped, and what it had built by then.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ProcessFailure {
    pub error: SuccessionError,
    /// The failing event, when the failure is attributable to one.
    pub event_id: Option<EventId>,
    pub event_index: Option<usize>,
    /// The engine with every event before the failing one applied. Absent
    /// when the run could not start (invalid rules or initial ownership).
    pub engine: Option<Box<SuccessionEngine>>,
}

impl From<SuccessionError> for ProcessFailure {
    fn from(error: SuccessionError) -> Self {
        Self {
            event_id: error.event_id().cloned(),
            error,
            event_index: None,
            engine: None,
        }
    }
}

impl ProcessFailure {
    /// The engine holding the ledger up to the last good event.
    #[must_use]
    pub fn partial(&self) -> Option<&SuccessionEngine> {
        self.engine.as_deref()
    }
}

impl SuccessionEngine {
    /// An engine with no events applied.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::InvalidScenario`] for an invalid rule set
    /// or an initial snapshot that does not sum to exactly 1.
    pub fn new(
        graph: FamilyGraph,
        rules: RuleSet,
        initial: OwnershipSnapshot,
    ) -> Result<Self, SuccessionError> {
        rules.validate()?;
        let ledger = Ledger::new(initial)?;
        Ok(Self {
            graph,
            rules,
            events: Vec::new(),
            ledger,
        })
    }

    /// Process `events` in order and build the full ledger.
    ///
    /// Death events first fix the exact death dates in the family graph so
    /// earlier events see who was alive on their own dates.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessFailure`] naming the first event that failed
    /// validation, transfer, or the ledger invariant.
    pub fn process(
        mut graph: FamilyGraph,
        rules: RuleSet,
        initial: OwnershipSnapshot,
        events: Vec<Event>,
    ) -> Result<Self, ProcessFailure> {
        let mut deferred: Option<(usize, SuccessionError)> = None;
        for (index, event) in events.iter().enumerate() {
            if let EventPayload::Death(_) = event.payload
                && let Err(e) = graph.record_death_date(&event.source, event.date)
            {
                deferred = Some((index, e.during(&event.id)));
                break;
            }
        }

        let mut engine = Self::new(graph, rules, initial).map_err(ProcessFailure::from)?;
        let total = events.len();
        let mut validator = EventValidator::new();

        for (index, event) in events.into_iter().enumerate() {
            let failed = match deferred.take() {
                Some((at, error)) if at == index => Some(error),
                other => {
                    deferred = other;
                    engine.step(&mut validator, index, &event).err()
                }
            };
            if let Some(error) = failed {
                debug!(event = %event.id, index, %error, "stopping run");
                return Err(ProcessFailure {
                    error,
                    event_id: Some(event.id),
                    event_index: Some(index),
                    engine: Some(Box::new(engine)),
                });
            }
            engine.events.push(event);
        }

        info!(
            events = total,
            owners = engine.ledger.current().len(),
            "succession run complete"
        );
        Ok(engine)
    }

    fn step(
        &mut self,
        validator: &mut EventValidator,
        index: usize,
        event: &Event,
    ) -> Result<(), SuccessionError> {
        validator.check(&self.graph, event)?;
        let transition =
            TransferProcessor::new(&self.graph, &self.rules).apply(self.ledger.current(), event)?;
        debug!(
            event = %event.id,
            index,
            owners = transition.snapshot.len(),
            warnings = transition.warnings.len(),
            "processed event"
        );
        self.ledger.append(LedgerEntry {
            event_index: index,
            event_id: event.id.clone(),
            date: event.date,
            snapshot: transition.snapshot,
            trail: transition.trail,
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Ownership after every event dated on or before `date`.
    #[must_use]
    pub fn ownership_at(&self, date: NaiveDate) -> &OwnershipSnapshot {
        self.ledger.as_of(date)
    }

    /// Ownership after the last processed event.
    #[must_use]
    pub fn current(&self) -> &OwnershipSnapshot {
        self.ledger.current()
    }

    /// Processed events dated within `start..=end`, in order.
    #[must_use]
    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .collect()
    }

    /// The explanation trail for a processed event.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::UnknownEvent`] if no processed event has
    /// this id.
    pub fn explain(&self, event_id: &EventId) -> Result<&ExplanationTrail, SuccessionError> {
        self.ledger
            .entry(event_id)
            .map(|entry| &entry.trail)
            .ok_or_else(|| SuccessionError::UnknownEvent(event_id.clone()))
    }

    /// Every warning raised, paired with its event.
    #[must_use]
    pub fn warnings(&self) -> Vec<(&EventId, &Warning)> {
        self.ledger
            .entries()
            .iter()
            .flat_map(|entry| entry.trail.warnings.iter().map(move |w| (&entry.event_id, w)))
            .collect()
    }

    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    #[must_use]
    pub const fn graph(&self) -> &FamilyGraph {
        &self.graph
    }

    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }
}
