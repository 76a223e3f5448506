//! Request handlers.
//!
//! Each submodule provides async handler functions for one resource.
//! Handlers delegate to the repositories in `fritter_db` (or the decay engine)
//! and map errors via [`crate::error::AppError`].

pub mod locks;
pub mod owners;
pub mod users;
