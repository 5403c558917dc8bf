//! stirpes-core library.
//!
//! Exact-fraction ownership succession: deeds and deaths fold over a family
//! graph into an append-only ledger whose every snapshot accounts for
//! exactly the whole property.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod fraction;
pub mod graph;
pub mod ledger;
pub mod model;
pub mod rules;
pub mod scenario;
pub mod transfer;

pub use engine::{ProcessFailure, SuccessionEngine};
pub use error::{ErrorCode, SuccessionError};
pub use fraction::Fraction;

/// # Conventions
///
/// - **Errors**: typed [`SuccessionError`] for engine operations; `anyhow::Result`
///   for file and config loading.
/// - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`); the library
///   never installs a subscriber.
pub fn init() {
    tracing::debug!("stirpes-core initialized");
}
