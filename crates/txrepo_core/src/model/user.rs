//! User domain model.
//!
//! # Responsibility
//! - Define the canonical user record shared by storage and callers.
//! - Mint identifiers at creation time only.
//!
//! # Invariants
//! - `id` is assigned exactly once, by `User::new`, and never by update paths.
//! - A persisted user always carries `id`, `name` and `email`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable 128-bit identifier of a user.
pub type UserId = Uuid;

/// Canonical user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Mutable part of a user, as supplied by update callers.
///
/// Carries no identifier so update paths cannot rewrite `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChanges {
    pub name: String,
    pub email: String,
}

/// Invariant violations detected before a user is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    NilId,
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "user id must not be nil"),
        }
    }
}

impl Error for UserValidationError {}

impl User {
    /// Creates a user with a freshly minted identifier.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name, email)
    }

    /// Rebuilds a user around an identifier that already exists.
    ///
    /// Used by read paths; callers creating new users go through `new`.
    pub fn with_id(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.id.is_nil() {
            return Err(UserValidationError::NilId);
        }
        Ok(())
    }
}

impl UserChanges {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}
