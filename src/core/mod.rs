//! # Core Types
//!
//! The building blocks every invocation runs on:
//!
//! - **Contract**: immutable per-command declaration of required inputs,
//!   optional inputs, and promised outputs
//! - **Context**: mutable single-owner carrier of one invocation's values
//!   and failure state
//! - **Errors**: the `CommandError` taxonomy with structural call errors,
//!   aggregated validation failures, explicit halts, and runtime failures
//! - **Validation**: field-error collection plugged in by commands
//! - **Notify**: the external fault-reporting boundary (breadcrumbs plus
//!   at-most-once failure reports)
//! - **Config**: process-wide engine configuration
//!
//! The invocation protocol itself lives in [`crate::engine`].

pub mod config;
pub mod context;
pub mod contract;
pub mod error;
pub mod inspect;
pub mod notify;
pub mod validate;

pub use config::{get_config, load_config, EngineConfig};
pub use context::Context;
pub use contract::{Argument, Contract, ContractBuilder, ExpectedKind, RESERVED_NAMES};
pub use error::{CallError, CommandError, Result};
pub use notify::{install_notifier, Breadcrumb, NoopNotifier, Notifier};
pub use validate::{FieldError, Validation, ValidationFailure};
