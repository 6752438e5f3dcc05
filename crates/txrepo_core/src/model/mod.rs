//! Domain model for the user entity.
//!
//! # Invariants
//! - Every user is identified by a stable `UserId` minted at creation.
//! - No deletion lifecycle exists in core.

pub mod user;
