//! Recipient entries produced by deeds and succession rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::fraction::{Fraction, FractionError};
use crate::model::PersonId;

/// The legal channel through which a recipient takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Spouse,
    Progeny,
    Parent,
    Sibling,
    Grantee,
}

impl Channel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spouse => "SPOUSE",
            Self::Progeny => "PROGENY",
            Self::Parent => "PARENT",
            Self::Sibling => "SIBLING",
            Self::Grantee => "GRANTEE",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recipient of a transfer.
///
/// A deceased heir keeps an entry so the chain of reasoning is preserved,
/// but never holds anything: their share is carried by `passthrough`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub person: PersonId,
    pub channel: Channel,
    /// Share of the whole property.
    pub fraction: Fraction,
    /// Share of the share this entry was carved from: the source's share for
    /// top-level entries, the deceased heir's share for passthrough entries.
    pub portion: Fraction,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deceased: bool,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passthrough: Vec<Allocation>,
}

impl Allocation {
    /// The entries that actually end up holding property.
    #[must_use]
    pub fn holders(&self) -> Vec<&Self> {
        if self.deceased {
            self.passthrough.iter().flat_map(Self::holders).collect()
        } else {
            vec![self]
        }
    }
}

/// Sum of holdings per person across `allocations`, following passthroughs.
///
/// # Errors
///
/// Returns [`FractionError::Overflow`] if a sum does not fit.
pub fn effective_shares(
    allocations: &[Allocation],
) -> Result<BTreeMap<PersonId, Fraction>, FractionError> {
    let mut out: BTreeMap<PersonId, Fraction> = BTreeMap::new();
    for holder in allocations.iter().flat_map(Allocation::holders) {
        let entry = out.entry(holder.person.clone()).or_default();
        *entry = entry.checked_add(holder.fraction)?;
    }
    Ok(out)
}

/// Render `a × b × c = result`.
#[must_use]
pub fn derivation(factors: &[Fraction], result: Fraction) -> String {
    let product = factors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" × ");
    format!("{product} = {result}")
}

/// `"1 child"`, `"3 children"`.
#[must_use]
pub fn count_noun(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(s: &str) -> Fraction {
        s.parse().expect("valid fraction")
    }

    fn leaf(person: &str, fraction: &str) -> Allocation {
        Allocation {
            person: person.into(),
            channel: Channel::Progeny,
            fraction: frac(fraction),
            portion: frac("1/3"),
            deceased: false,
            explanation: String::new(),
            passthrough: vec![],
        }
    }

    #[test]
    fn holders_skip_deceased_intermediaries() {
        let bob = Allocation {
            person: "bob".into(),
            channel: Channel::Progeny,
            fraction: frac("1/8"),
            portion: frac("1/6"),
            deceased: true,
            explanation: String::new(),
            passthrough: vec![
                leaf("david", "1/16"),
                leaf("emma", "1/16"),
                leaf("frank", "1/16"),
            ],
        };
        let holders: Vec<&str> = bob.holders().iter().map(|a| a.person.as_str()).collect();
        assert_eq!(holders, ["david", "emma", "frank"]);
    }

    #[test]
    fn effective_shares_merge_repeat_recipients() {
        let shares = effective_shares(&[leaf("alice", "1/8"), leaf("alice", "1/8")])
            .expect("sum");
        assert_eq!(shares[&PersonId::from("alice")], frac("1/4"));
    }

    #[test]
    fn derivation_renders_product() {
        let text = derivation(&[frac("1/2"), frac("3/4"), frac("1/3")], frac("1/8"));
        assert_eq!(text, "1/2 × 3/4 × 1/3 = 1/8");
    }

    #[test]
    fn deceased_flag_is_omitted_when_false() {
        let json = serde_json::to_value(leaf("alice", "1/8")).expect("serialize");
        assert!(json.get("deceased").is_none());
        assert!(json.get("passthrough").is_none());
        assert_eq!(json["channel"], "PROGENY");
    }
}
