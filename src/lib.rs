//! # CmdChain - Composable Command Execution Framework
//!
//! CmdChain lets a caller define discrete units of business logic
//! ("commands") with declared named inputs, declared outputs, and a single
//! `call` operation, then compose many commands into ordered pipelines
//! ("chains") that share a progressively-built execution context.
//!
//! ## Features
//!
//! - **Argument Contracts**: per-command declarations of required inputs,
//!   optional inputs (with optional expected types), and promised outputs,
//!   enforced on every call
//! - **Execution Context**: a mutable, single-owner carrier of argument and
//!   return values that flows through a command and, transitively, through
//!   every step of a chain
//! - **Chains**: ordered composition with per-step context projection,
//!   result merging, and completed-step tracking
//! - **Compensating Rollback**: failures roll completed work back, children
//!   before parents, in reverse execution order
//! - **Failure Classification**: expected failures stay quiet; unexpected
//!   ones reach an external fault channel exactly once per invocation
//!
//! ## Quick Start
//!
//! ```
//! use cmdchain::core::{Contract, Context, ExpectedKind};
//! use cmdchain::engine::{invoke, Command, Outcome};
//! use once_cell::sync::Lazy;
//! use serde_json::json;
//!
//! struct SquareRoot;
//!
//! static CONTRACT: Lazy<Contract> = Lazy::new(|| {
//!     Contract::builder("SquareRoot")
//!         .requires_typed("number", ExpectedKind::Number)
//!         .returns("root")
//!         .build()
//!         .expect("well-formed contract")
//! });
//!
//! impl Command for SquareRoot {
//!     fn contract(&self) -> &Contract {
//!         &CONTRACT
//!     }
//!
//!     fn call(&self, ctx: &mut Context) -> Outcome {
//!         let number: f64 = ctx.get("number")?;
//!         if number < 0.0 {
//!             cmdchain::halt!("cannot take the root of {number}");
//!         }
//!         Ok(Some(json!(number.sqrt())))
//!     }
//!
//!     fn rollback(&self, ctx: &mut Context) {
//!         let number = ctx.argument("number").clone();
//!         let _ = ctx.set("root", number);
//!     }
//! }
//!
//! let result = invoke(&SquareRoot, json!({ "number": 4 }));
//! assert!(result.success());
//! assert_eq!(result.return_value("root"), &json!(2.0));
//!
//! let result = invoke(&SquareRoot, json!({ "number": -4 }));
//! assert!(result.failed());
//! assert_eq!(result.return_value("root"), &json!(-4));
//! ```
//!
//! ## Architecture
//!
//! - **core**: contracts, contexts, the error taxonomy, field validation,
//!   the notifier boundary, and configuration
//! - **engine**: the invocation protocol (validate → execute → roll back →
//!   settle) shared by leaf commands and chains
//!
//! Execution is synchronous and single-threaded: a command's `call`, any
//! nested chain iteration, and rollback all run on the invoking call stack.
//! A `Context` belongs exclusively to the invocation that created it.
//!
//! ## Failure Handling
//!
//! The default mode never raises: [`engine::invoke`] always hands back a
//! [`core::Context`] whose success state the caller checks. The "bang" mode,
//! [`engine::try_invoke`], returns the original error as an `Err` and keeps
//! its expected/unexpected classification intact, so an outer handler can
//! report it faithfully.

pub mod constants;
pub mod core;
pub mod engine;

/// Stop-and-fail short-circuit for command bodies.
///
/// Records the formatted message as the invocation's canonical error and
/// unwinds to the rollback phase. Use
/// [`Failure::halt_quiet`](engine::Failure::halt_quiet) instead when the
/// failure is expected and should stay off the fault channel.
///
/// ```
/// use cmdchain::core::{Contract, Context};
/// use cmdchain::engine::{invoke, Command, Outcome};
/// use once_cell::sync::Lazy;
/// use serde_json::json;
///
/// struct Guarded;
///
/// static CONTRACT: Lazy<Contract> = Lazy::new(|| {
///     Contract::builder("Guarded").allows("ok").build().expect("well-formed contract")
/// });
///
/// impl Command for Guarded {
///     fn contract(&self) -> &Contract {
///         &CONTRACT
///     }
///
///     fn call(&self, ctx: &mut Context) -> Outcome {
///         if !ctx.argument("ok").as_bool().unwrap_or(false) {
///             cmdchain::halt!("precondition not met");
///         }
///         Ok(None)
///     }
/// }
///
/// let result = invoke(&Guarded, json!({}));
/// assert!(result.failed());
/// assert_eq!(result.error().unwrap().to_string(), "precondition not met");
/// ```
#[macro_export]
macro_rules! halt {
    ($($arg:tt)*) => {
        return Err($crate::engine::Failure::halt(format!($($arg)*)))
    };
}
