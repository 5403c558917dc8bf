use serde::{Deserialize, Serialize};
use std::fmt;

use super::person::PersonId;

/// Why a marriage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Death,
    Divorce,
}

impl EndReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Death => "death",
            Self::Divorce => "divorce",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A marriage between two people over a span of years.
///
/// The interval is inclusive on both ends: a marriage is active in year `y`
/// when `start <= y` and `end` is absent or `end >= y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marriage {
    pub partners: [PersonId; 2],
    pub start: i32,
    #[serde(default)]
    pub end: Option<i32>,
    #[serde(default)]
    pub end_reason: Option<EndReason>,
}

impl Marriage {
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>, start: i32) -> Self {
        Self {
            partners: [PersonId::new(a), PersonId::new(b)],
            start,
            end: None,
            end_reason: None,
        }
    }

    #[must_use]
    pub const fn ended(mut self, year: i32, reason: EndReason) -> Self {
        self.end = Some(year);
        self.end_reason = Some(reason);
        self
    }

    /// Whether the marriage interval covers `year`.
    #[must_use]
    pub fn is_active_in(&self, year: i32) -> bool {
        self.start <= year && self.end.is_none_or(|end| end >= year)
    }

    /// The partner of `id`, if `id` is one of the two partners.
    #[must_use]
    pub fn partner_of(&self, id: &PersonId) -> Option<&PersonId> {
        match &self.partners {
            [a, b] if a == id => Some(b),
            [a, b] if b == id => Some(a),
            _ => None,
        }
    }
}
