//! User domain model.
//!
//! # Responsibility
//! - Define the single persisted record managed by core.
//! - Offer field checks for input layers that want them.
//!
//! # Invariants
//! - `id` is `None` until storage assigns it, and never changes afterwards.
//! - `created_at` is set once at save time and never rewritten.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));

/// Storage-assigned identifier for a persisted user.
pub type UserId = i64;

/// Validation failures for user fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyName,
    InvalidEmail(String),
    NegativeAge(i32),
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "user name cannot be empty"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::NegativeAge(age) => write!(f, "age cannot be negative, got {age}"),
        }
    }
}

impl Error for UserValidationError {}

/// Persisted user record.
///
/// Plain data: callers own it, fill in fields and hand it to the repository
/// by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Assigned by storage on first save.
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub age: i32,
    /// Unix epoch milliseconds, set by the repository on save.
    pub created_at: Option<i64>,
}

impl User {
    /// Creates an unsaved user from its scalar fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            age,
            created_at: None,
        }
    }

    /// Checks that fields look like real user input.
    ///
    /// Storage accepts any values; the console driver calls this before
    /// handing user input to the service.
    ///
    /// # Errors
    /// - `EmptyName` when `name` is blank.
    /// - `InvalidEmail` when `email` is not shaped `local@domain`.
    /// - `NegativeAge` when `age < 0`.
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if self.name.trim().is_empty() {
            return Err(UserValidationError::EmptyName);
        }
        if !EMAIL_RE.is_match(self.email.trim()) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }
        if self.age < 0 {
            return Err(UserValidationError::NegativeAge(self.age));
        }
        Ok(())
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = self
            .id
            .map_or_else(|| "null".to_string(), |id| id.to_string());
        let created_at = self
            .created_at
            .map_or_else(|| "null".to_string(), |ts| ts.to_string());
        write!(
            f,
            "User{{id={id}, name='{}', email='{}', age={}, createdAt={created_at}}}",
            self.name, self.email, self.age
        )
    }
}
