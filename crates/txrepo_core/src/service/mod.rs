//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate query-set calls into the user store facade.
//! - Own transaction boundaries; repositories never open transactions.

mod transaction;
pub mod user_store;
