//! Event type enum covering the two transfer-relevant event kinds.
//!
//! The string form (`deed`, `death`) is what scenario files use in the
//! `type` field and what the CLI accepts for `--kind` filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kinds of event in a succession timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A voluntary conveyance from a living owner.
    Deed,
    /// A death, distributing the decedent's share by statute.
    Death,
}

/// Error returned when parsing an unknown event type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown event type '{}': expected one of deed, death",
            self.raw
        )
    }
}

impl std::error::Error for UnknownEventType {}

impl EventType {
    /// All known event types.
    pub const ALL: [Self; 2] = [Self::Deed, Self::Death];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deed => "deed",
            Self::Death => "death",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deed" => Ok(Self::Deed),
            "death" => Ok(Self::Death),
            _ => Err(UnknownEventType { raw: s.to_string() }),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
