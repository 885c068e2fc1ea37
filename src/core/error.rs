//! Error taxonomy for command invocation.
//!
//! Every failed [`Context`](crate::core::Context) carries exactly one
//! [`CommandError`]. Structural call-site problems are grouped under
//! [`CallError`]; accumulated field-level validation problems aggregate into
//! a single [`ValidationFailure`](crate::core::ValidationFailure).

use thiserror::Error;

use crate::core::contract::ExpectedKind;
use crate::core::validate::ValidationFailure;

pub type Result<T> = std::result::Result<T, CommandError>;

/// The canonical error attached to a failed invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Structural call error: bad calling convention, missing/unknown
    /// arguments, declared-type violation, or a bad contract declaration.
    #[error(transparent)]
    Call(#[from] CallError),

    /// Aggregated field-level validation failure. Always expected and
    /// caller-correctable, never reported to the notifier.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    /// Explicit stop-and-fail raised by a command body.
    #[error("{message}")]
    Halted { message: String },

    /// A chain body returned without ever running its steps.
    #[error(
        "`{command}` did not run its chain: the `call` implementation must \
         invoke `run_chain` for the steps to execute"
    )]
    Unchained { command: String },

    /// A chain finished every step but left declared returns unpopulated.
    #[error("`{command}` completed without populating declared return(s): {}", names.join(", "))]
    IncompleteReturns { command: String, names: Vec<String> },

    /// Anything else raised from a command body.
    #[error("{message}")]
    Runtime { message: String },
}

impl CommandError {
    pub fn halted(message: impl Into<String>) -> Self {
        CommandError::Halted {
            message: message.into(),
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        CommandError::Runtime {
            message: message.into(),
        }
    }

    /// True for errors produced before a command body runs.
    pub fn is_structural(&self) -> bool {
        matches!(self, CommandError::Call(_) | CommandError::Unchained { .. })
    }
}

/// Structural call errors. All of these are caller-fixable and are surfaced
/// immediately, without running the command body.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("`{command}` accepts named arguments only, positional values are not supported")]
    Positional { command: String },

    #[error("`{command}` missing required argument(s): {}", names.join(", "))]
    Missing { command: String, names: Vec<String> },

    #[error("`{command}` received unknown argument(s): {}", names.join(", "))]
    Unknown { command: String, names: Vec<String> },

    #[error("`{command}`: `{name}` is not a {expected}")]
    WrongType {
        command: String,
        name: String,
        expected: ExpectedKind,
    },

    #[error("`{command}` declares {} in both requires and allows", names.join(", "))]
    Duplicated { command: String, names: Vec<String> },

    #[error("`{command}` declares reserved name(s): {}", names.join(", "))]
    Reserved { command: String, names: Vec<String> },
}

impl CallError {
    pub fn positional(command: impl Into<String>) -> Self {
        CallError::Positional {
            command: command.into(),
        }
    }

    pub fn missing(command: impl Into<String>, names: Vec<String>) -> Self {
        CallError::Missing {
            command: command.into(),
            names,
        }
    }

    pub fn unknown(command: impl Into<String>, names: Vec<String>) -> Self {
        CallError::Unknown {
            command: command.into(),
            names,
        }
    }

    pub fn wrong_type(
        command: impl Into<String>,
        name: impl Into<String>,
        expected: ExpectedKind,
    ) -> Self {
        CallError::WrongType {
            command: command.into(),
            name: name.into(),
            expected,
        }
    }
}
