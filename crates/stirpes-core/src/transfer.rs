//! Transfer processor: applies one event to the prior snapshot.
//!
//! A deed moves part of the grantor's holding to the grantees. A death
//! zeroes the decedent's holding and distributes it through the succession
//! rules. Either way the result is the next snapshot together with an
//! [`ExplanationTrail`] describing every recipient and the arithmetic that
//! produced their share.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SuccessionError;
use crate::event::{
    DeathData, DeedData, DeedDocument, Event, EventId, EventPayload, EventType, LegalBasis,
    ShareBasis,
};
use crate::fraction::Fraction;
use crate::graph::FamilyGraph;
use crate::ledger::OwnershipSnapshot;
use crate::model::PersonId;
use crate::rules::allocation::derivation;
use crate::rules::{self, Allocation, Channel, Rule, RuleSet, Warning};

/// The human-readable account of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationTrail {
    pub event_id: EventId,
    pub event_type: EventType,
    pub date: NaiveDate,
    pub source: PersonId,
    pub label: String,
    pub preamble: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<LegalBasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DeedDocument>,
    /// The source's share immediately before the event.
    pub source_share_before: Fraction,
    pub recipients: Vec<Allocation>,
    #[serde(default)]
    pub unallocated: Fraction,
    pub warnings: Vec<Warning>,
    /// False for a death of someone who held nothing.
    pub transfer: bool,
}

impl ExplanationTrail {
    /// A trail for an event that moved nothing.
    #[must_use]
    pub fn unchanged(
        event_id: EventId,
        event_type: EventType,
        date: NaiveDate,
        source: PersonId,
        label: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            event_type,
            date,
            source,
            label: label.into(),
            preamble: String::new(),
            legal_basis: None,
            rule: None,
            document: None,
            source_share_before: Fraction::ZERO,
            recipients: Vec::new(),
            unallocated: Fraction::ZERO,
            warnings: Vec::new(),
            transfer: false,
        }
    }
}

/// The result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub snapshot: OwnershipSnapshot,
    pub trail: ExplanationTrail,
    pub warnings: Vec<Warning>,
}

/// Applies events against a fixed family graph and rule set.
#[derive(Debug, Clone, Copy)]
pub struct TransferProcessor<'a> {
    graph: &'a FamilyGraph,
    rules: &'a RuleSet,
}

impl<'a> TransferProcessor<'a> {
    #[must_use]
    pub const fn new(graph: &'a FamilyGraph, rules: &'a RuleSet) -> Self {
        Self { graph, rules }
    }

    /// Compute the snapshot that follows `event`.
    ///
    /// The prior snapshot is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::InsufficientOwnership`] when a deed
    /// conveys more than the grantor holds or the grantor holds nothing.
    /// Any other failure is wrapped in [`SuccessionError::EventFailed`]
    /// naming the event.
    pub fn apply(
        &self,
        prior: &OwnershipSnapshot,
        event: &Event,
    ) -> Result<Transition, SuccessionError> {
        let result = match &event.payload {
            EventPayload::Deed(deed) => self.apply_deed(prior, event, deed),
            EventPayload::Death(death) => self.apply_death(prior, event, death),
        };
        result.map_err(|e| e.during(&event.id))
    }

    fn base_trail(event: &Event, held: Fraction) -> ExplanationTrail {
        let mut trail = ExplanationTrail::unchanged(
            event.id.clone(),
            event.event_type(),
            event.date,
            event.source.clone(),
            event.display_label(),
        );
        trail.source_share_before = held;
        trail
    }

    fn apply_deed(
        &self,
        prior: &OwnershipSnapshot,
        event: &Event,
        deed: &DeedData,
    ) -> Result<Transition, SuccessionError> {
        let held = prior.share_of(&event.source);
        let conveyed = deed.conveyed(held)?;
        let requested = Fraction::checked_sum(conveyed.iter().map(|(_, f)| *f))?;
        if held.is_zero() || requested > held {
            return Err(SuccessionError::InsufficientOwnership {
                event_id: event.id.clone(),
                grantor: event.source.clone(),
                held,
                requested,
            });
        }

        let grantor = self.graph.name_of(&event.source);
        let mut snapshot = prior.clone();
        snapshot.debit(&event.source, requested)?;

        let mut recipients = Vec::with_capacity(conveyed.len());
        for ((person, amount), grant) in conveyed.into_iter().zip(&deed.recipients) {
            snapshot.credit(&person, amount)?;
            let name = self.graph.name_of(&person);
            let (portion, explanation) = match deed.basis {
                ShareBasis::OfSource => (
                    grant.fraction,
                    format!(
                        "As grantee, {name} receives {} of {grantor}'s share ({held} of the \
                         whole), yielding {}",
                        grant.fraction,
                        derivation(&[grant.fraction, held], amount)
                    ),
                ),
                ShareBasis::OfWhole => (
                    amount.checked_div(held)?,
                    format!(
                        "As grantee, {name} receives {amount} of the whole property out of \
                         {grantor}'s share ({held} of the whole)"
                    ),
                ),
            };
            recipients.push(Allocation {
                person,
                channel: Channel::Grantee,
                fraction: amount,
                portion,
                deceased: false,
                explanation,
                passthrough: Vec::new(),
            });
        }

        let names = recipients
            .iter()
            .map(|a| self.graph.name_of(&a.person))
            .collect::<Vec<_>>()
            .join(", ");
        let of_holding = requested.checked_div(held)?;
        let held_text = if held == Fraction::ONE {
            "the entire property".to_string()
        } else {
            format!("{held} of the whole")
        };
        let preamble = format!(
            "{grantor} transfers {of_holding} of their ownership ({held_text}) to {names}."
        );
        debug!(event = %event.id, grantor = %event.source, %requested, "applied deed");

        let mut trail = Self::base_trail(event, held);
        trail.preamble = preamble;
        trail.document.clone_from(&deed.document);
        trail.recipients = recipients;
        trail.transfer = true;

        Ok(Transition {
            snapshot,
            trail,
            warnings: Vec::new(),
        })
    }

    fn apply_death(
        &self,
        prior: &OwnershipSnapshot,
        event: &Event,
        death: &DeathData,
    ) -> Result<Transition, SuccessionError> {
        let held = prior.share_of(&event.source);
        let mut trail = Self::base_trail(event, held);

        if held.is_zero() {
            trail.preamble = format!(
                "{} held no share at death; ownership is unchanged.",
                self.graph.name_of(&event.source)
            );
            trail.legal_basis.clone_from(&death.legal_basis);
            debug!(event = %event.id, decedent = %event.source, "death without a share");
            return Ok(Transition {
                snapshot: prior.clone(),
                trail,
                warnings: Vec::new(),
            });
        }

        let distribution =
            rules::distribute(self.graph, self.rules, &event.source, held, event.date)?;

        let mut snapshot = prior.clone();
        snapshot.set(event.source.clone(), Fraction::ZERO);
        for (person, amount) in distribution.effective_shares()? {
            snapshot.credit(&person, amount)?;
        }
        snapshot.leave_unallocated(distribution.unallocated)?;
        debug!(
            event = %event.id,
            decedent = %event.source,
            rule = %distribution.rule,
            %held,
            "applied death"
        );

        trail.preamble = distribution.preamble;
        trail.legal_basis = death.legal_basis.clone().or(distribution.legal_basis);
        trail.rule = Some(distribution.rule);
        trail.recipients = distribution.allocations;
        trail.unallocated = distribution.unallocated;
        trail.warnings.clone_from(&distribution.warnings);
        trail.transfer = true;

        Ok(Transition {
            snapshot,
            trail,
            warnings: distribution.warnings,
        })
    }
}
