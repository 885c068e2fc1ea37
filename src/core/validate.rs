//! Field-level validation support.
//!
//! Commands may plug validation rules in through
//! [`Command::validate`](crate::engine::Command::validate). The engine runs
//! them before the body and aggregates whatever they collect into a single
//! [`ValidationFailure`], which is always treated as an expected,
//! caller-correctable failure (never reported to the notifier).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One field-level problem: the offending field plus a human message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Ordered collector handed to a command's validation hook.
#[derive(Debug, Clone, Default)]
pub struct Validation {
    errors: Vec<FieldError>,
}

impl Validation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

/// The aggregate of every accumulated field error, attached to the context
/// as its one canonical error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed: {}", errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}
