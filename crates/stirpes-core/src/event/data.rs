//! Typed payload data for each event type.
//!
//! Deeds carry their grants as input. Deaths carry only an optional legal
//! citation: their recipients are computed by the succession rules, never
//! supplied by the caller.

use serde::{Deserialize, Serialize};

use crate::fraction::{Fraction, FractionError};
use crate::model::PersonId;

/// What a grant's fraction is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareBasis {
    /// A portion of the grantor's current holding.
    #[default]
    OfSource,
    /// A portion of the entire property (an "undivided 1/4 interest").
    OfWhole,
}

/// One recipient of a deed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub person: PersonId,
    pub fraction: Fraction,
}

impl Grant {
    #[must_use]
    pub fn new(person: impl Into<String>, fraction: Fraction) -> Self {
        Self {
            person: PersonId::new(person),
            fraction,
        }
    }
}

/// Display-only deed document metadata. Never used by the computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeedDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_date: Option<String>,
    #[serde(default)]
    pub grantor: String,
    #[serde(default)]
    pub grantee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consideration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload of a deed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeedData {
    pub recipients: Vec<Grant>,
    #[serde(default)]
    pub basis: ShareBasis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DeedDocument>,
}

impl DeedData {
    /// The share of the whole property each grant conveys, given the
    /// grantor's current holding.
    ///
    /// # Errors
    ///
    /// Returns [`FractionError::Overflow`] if a product does not fit.
    pub fn conveyed(&self, held: Fraction) -> Result<Vec<(PersonId, Fraction)>, FractionError> {
        self.recipients
            .iter()
            .map(|grant| {
                let amount = match self.basis {
                    ShareBasis::OfSource => grant.fraction.checked_mul(held)?,
                    ShareBasis::OfWhole => grant.fraction,
                };
                Ok((grant.person.clone(), amount))
            })
            .collect()
    }
}

/// The statute a distribution relies on. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalBasis {
    pub statute: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Payload of a death event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathData {
    /// Overrides the citation configured for the rule that applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_basis: Option<LegalBasis>,
}
