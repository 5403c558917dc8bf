//! Append-only ownership ledger.
//!
//! The ledger holds an initial [`OwnershipSnapshot`] and one entry per
//! processed event. Every snapshot accounts for the whole property: the
//! holdings plus the unallocated remainder sum to exactly 1, and no holding
//! is negative. [`Ledger::append`] refuses any snapshot that breaks this.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SuccessionError;
use crate::event::EventId;
use crate::fraction::Fraction;
use crate::model::PersonId;
use crate::transfer::ExplanationTrail;

// ---------------------------------------------------------------------------
// OwnershipSnapshot
// ---------------------------------------------------------------------------

/// Who holds what, immediately after one event.
///
/// People with a zero share are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipSnapshot {
    holdings: BTreeMap<PersonId, Fraction>,
    #[serde(default, skip_serializing_if = "is_zero")]
    unallocated: Fraction,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(f: &Fraction) -> bool {
    f.is_zero()
}

impl OwnershipSnapshot {
    /// An empty snapshot (sums to 0, not a valid ledger state on its own).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One person owns everything.
    #[must_use]
    pub fn whole(owner: impl Into<String>) -> Self {
        let mut snapshot = Self::new();
        snapshot.set(PersonId::new(owner), Fraction::ONE);
        snapshot
    }

    /// Build from explicit holdings, merging repeated ids.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn from_holdings<I>(holdings: I) -> Result<Self, SuccessionError>
    where
        I: IntoIterator<Item = (PersonId, Fraction)>,
    {
        let mut snapshot = Self::new();
        for (person, fraction) in holdings {
            snapshot.credit(&person, fraction)?;
        }
        Ok(snapshot)
    }

    /// The share `person` holds (zero if absent).
    #[must_use]
    pub fn share_of(&self, person: &PersonId) -> Fraction {
        self.holdings.get(person).copied().unwrap_or_default()
    }

    /// Holdings in id order, zero shares omitted.
    pub fn holdings(&self) -> impl Iterator<Item = (&PersonId, Fraction)> {
        self.holdings.iter().map(|(id, f)| (id, *f))
    }

    #[must_use]
    pub const fn unallocated(&self) -> Fraction {
        self.unallocated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Set a holding outright; zero removes the entry.
    pub fn set(&mut self, person: PersonId, fraction: Fraction) {
        if fraction.is_zero() {
            self.holdings.remove(&person);
        } else {
            self.holdings.insert(person, fraction);
        }
    }

    /// Add `amount` to `person`'s holding.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn credit(&mut self, person: &PersonId, amount: Fraction) -> Result<(), SuccessionError> {
        let next = self.share_of(person).checked_add(amount)?;
        self.set(person.clone(), next);
        Ok(())
    }

    /// Subtract `amount` from `person`'s holding. The result may go negative;
    /// [`OwnershipSnapshot::verify`] catches that.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn debit(&mut self, person: &PersonId, amount: Fraction) -> Result<(), SuccessionError> {
        let next = self.share_of(person).checked_sub(amount)?;
        self.set(person.clone(), next);
        Ok(())
    }

    /// Move `amount` into the unallocated remainder.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn leave_unallocated(&mut self, amount: Fraction) -> Result<(), SuccessionError> {
        self.unallocated = self.unallocated.checked_add(amount)?;
        Ok(())
    }

    /// Holdings plus the unallocated remainder.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::Fraction`] on overflow.
    pub fn total(&self) -> Result<Fraction, SuccessionError> {
        let held = Fraction::checked_sum(self.holdings.values().copied())?;
        Ok(held.checked_add(self.unallocated)?)
    }

    /// Why this snapshot is not a valid ledger state, if it is not.
    fn violation(&self) -> Result<Option<String>, SuccessionError> {
        if let Some((person, fraction)) = self.holdings().find(|(_, f)| f.is_negative()) {
            return Ok(Some(format!("'{person}' holds a negative share ({fraction})")));
        }
        if self.unallocated.is_negative() {
            return Ok(Some(format!(
                "unallocated remainder is negative ({})",
                self.unallocated
            )));
        }
        let total = self.total()?;
        if total != Fraction::ONE {
            return Ok(Some(format!("shares sum to {total}, not 1")));
        }
        Ok(None)
    }

    /// Check the snapshot accounts for exactly the whole property.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::LedgerInvariantViolation`] naming
    /// `event_id`.
    pub fn verify(&self, event_id: &EventId) -> Result<(), SuccessionError> {
        match self.violation()? {
            None => Ok(()),
            Some(reason) => Err(SuccessionError::LedgerInvariantViolation {
                event_id: event_id.clone(),
                reason,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The state after one processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub event_index: usize,
    pub event_id: EventId,
    pub date: NaiveDate,
    pub snapshot: OwnershipSnapshot,
    pub trail: ExplanationTrail,
}

/// Initial ownership plus one entry per successfully processed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ledger {
    initial: OwnershipSnapshot,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Start a ledger from the initial ownership.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::InvalidScenario`] if `initial` does not sum
    /// to exactly 1 or holds a negative share.
    pub fn new(initial: OwnershipSnapshot) -> Result<Self, SuccessionError> {
        if let Some(reason) = initial.violation()? {
            return Err(SuccessionError::InvalidScenario(format!(
                "initial ownership is invalid: {reason}"
            )));
        }
        Ok(Self {
            initial,
            entries: Vec::new(),
        })
    }

    /// Append the state after the next event.
    ///
    /// # Errors
    ///
    /// Returns [`SuccessionError::LedgerInvariantViolation`] if the snapshot
    /// does not sum to exactly 1, holds a negative share, or is dated before
    /// the previous entry.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), SuccessionError> {
        entry.snapshot.verify(&entry.event_id)?;
        if let Some(last) = self.entries.last()
            && entry.date < last.date
        {
            return Err(SuccessionError::LedgerInvariantViolation {
                event_id: entry.event_id,
                reason: format!("entry dated {} follows {}", entry.date, last.date),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    #[must_use]
    pub const fn initial(&self) -> &OwnershipSnapshot {
        &self.initial
    }

    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The latest snapshot.
    #[must_use]
    pub fn current(&self) -> &OwnershipSnapshot {
        self.entries.last().map_or(&self.initial, |e| &e.snapshot)
    }

    #[must_use]
    pub fn entry(&self, event_id: &EventId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| &e.event_id == event_id)
    }

    /// The snapshot in force just before event `index` was applied.
    #[must_use]
    pub fn snapshot_before(&self, index: usize) -> Option<&OwnershipSnapshot> {
        match index {
            0 => Some(&self.initial),
            i if i <= self.entries.len() => Some(&self.entries[i - 1].snapshot),
            _ => None,
        }
    }

    /// The snapshot produced by event `index`.
    #[must_use]
    pub fn snapshot_after(&self, index: usize) -> Option<&OwnershipSnapshot> {
        self.entries.get(index).map(|e| &e.snapshot)
    }

    /// The snapshot from the latest event dated on or before `date`, or the
    /// initial snapshot if there is none.
    #[must_use]
    pub fn as_of(&self, date: NaiveDate) -> &OwnershipSnapshot {
        let applied = self.entries.partition_point(|e| e.date <= date);
        if applied == 0 {
            &self.initial
        } else {
            &self.entries[applied - 1].snapshot
        }
    }
}
