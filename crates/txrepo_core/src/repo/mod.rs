//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the user query set as a storage-agnostic contract.
//! - Isolate SQLite query details from transactional orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `User::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Repositories never decide transaction boundaries.

pub mod user_repo;
