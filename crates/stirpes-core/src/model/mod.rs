//! People and marriages: the static records a family graph is built from.

pub mod marriage;
pub mod person;

pub use marriage::{EndReason, Marriage};
pub use person::{KnownFacts, Person, PersonId};
