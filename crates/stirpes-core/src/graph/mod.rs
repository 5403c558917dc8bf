//! Family relations queried by the succession rules.

pub mod family;

pub use family::{FamilyGraph, SiblingScope};
