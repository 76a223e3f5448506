//! Domain layer for the Fritter screen-time lock service.
//!
//! Holds everything that does not touch HTTP or SQL: identifiers, the error
//! enum, the pure decay state transitions, legacy-value parsing, display
//! formatting, the [`store::LockStore`] seam and the [`engine::DecayEngine`]
//! that dispatches decay effects against it.

pub mod display;
pub mod engine;
pub mod error;
pub mod legacy;
pub mod lock;
pub mod store;
pub mod types;
