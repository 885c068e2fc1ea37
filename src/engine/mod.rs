//! # Invocation Engine
//!
//! The engine drives every command through one protocol:
//!
//! 1. **Validate**: the payload must be a named-argument object; reserved
//!    control options are extracted; the contract checks missing/unknown
//!    names and declared types; pluggable field validation runs. Violations
//!    fail the invocation before the body ever runs (no rollback, since
//!    nothing ran).
//! 2. **Execute**: the body runs with full access to the [`Context`]. A
//!    returned value lands in a single declared, unwritten return
//!    automatically.
//! 3. **Roll back**: on any failure after the body started, the command's
//!    compensating `rollback` runs at most once (chains roll completed steps
//!    back first, in reverse order).
//! 4. **Settle**: expected failures (`no_notify`) and raising invocations
//!    skip the notifier; everything else is reported exactly once per
//!    top-level invocation.
//!
//! ## Example
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
//!         Ok(Some(json!(number.sqrt())))
//!     }
//! }
//!
//! let result = invoke(&SquareRoot, json!({ "number": 4 }));
//! assert!(result.success());
//! assert_eq!(result.return_value("root"), &json!(2.0));
//!
//! // failures come back on the context instead of raising
//! let result = invoke(&SquareRoot, json!({ "number": "four" }));
//! assert!(result.failed());
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::constants::DEFAULT_HALT_MESSAGE;
use crate::core::config::get_config;
use crate::core::context::Context;
use crate::core::contract::{is_blank, Contract};
use crate::core::error::{CallError, CommandError};
use crate::core::notify::{installed_notifier, Breadcrumb, Notifier};
use crate::core::validate::{Validation, ValidationFailure};

pub mod chain;

pub use chain::{Chain, ChainLayout};

/// What a command body hands back: an optional value for single-return
/// auto-assignment on success, or a [`Failure`].
pub type Outcome = std::result::Result<Option<Value>, Failure>;

/// The structured failure signal a body returns to stop execution.
///
/// `no_notify` classifies the failure as expected and caller-handled; it is
/// preserved across chain boundaries and the raising path so the external
/// fault channel is never consulted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub error: CommandError,
    pub no_notify: bool,
}

impl Failure {
    pub fn new(error: CommandError) -> Self {
        Self {
            error,
            no_notify: false,
        }
    }

    /// A failure that is expected and handled by the caller; suppressed from
    /// the notifier.
    pub fn quiet(error: CommandError) -> Self {
        Self {
            error,
            no_notify: true,
        }
    }

    /// Stop-and-fail without a payload.
    pub fn stop() -> Self {
        Self::new(CommandError::halted(DEFAULT_HALT_MESSAGE))
    }

    /// Stop-and-fail with a message payload.
    pub fn halt(message: impl Into<String>) -> Self {
        Self::new(CommandError::halted(message))
    }

    /// Stop-and-fail with a message payload, suppressed from the notifier.
    pub fn halt_quiet(message: impl Into<String>) -> Self {
        Self::quiet(CommandError::halted(message))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for Failure {}

impl From<CommandError> for Failure {
    fn from(error: CommandError) -> Self {
        Failure::new(error)
    }
}

impl From<CallError> for Failure {
    fn from(error: CallError) -> Self {
        Failure::new(error.into())
    }
}

impl From<ValidationFailure> for Failure {
    fn from(error: ValidationFailure) -> Self {
        // field-validation failures are expected, caller-correctable
        Failure::quiet(error.into())
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::new(CommandError::runtime(format!("{error:#}")))
    }
}

impl From<serde_json::Error> for Failure {
    fn from(error: serde_json::Error) -> Self {
        Failure::new(CommandError::runtime(error.to_string()))
    }
}

/// One unit of business logic with a declared named-argument contract.
///
/// Implementations supply the contract and the body; `rollback` and
/// `validate` are optional hooks. Chains implement [`Chain`] instead and get
/// this trait through a blanket impl.
pub trait Command: Send + Sync {
    fn contract(&self) -> &Contract;

    fn call(&self, ctx: &mut Context) -> Outcome;

    /// Compensating action undoing the observable effects of a successful
    /// or partially-successful `call`. Invoked at most once per invocation.
    fn rollback(&self, _ctx: &mut Context) {}

    /// Field-level validation, run before `call`. Any collected error fails
    /// the invocation without running the body.
    fn validate(&self, _ctx: &Context, _validation: &mut Validation) {}

    /// Implemented by the [`Chain`] blanket impl; `None` for leaf commands.
    #[doc(hidden)]
    fn chain_layout(&self) -> Option<ChainLayout> {
        None
    }
}

#[derive(Default)]
struct CallOpts {
    raise_on_failure: bool,
    allow_unknown: bool,
    in_chain: bool,
    notifier: Option<Arc<dyn Notifier>>,
}

#[derive(Debug)]
struct PayloadFlags {
    raise_on_failure: bool,
    allow_unknown: bool,
    in_chain: bool,
}

/// Invokes a command with a named-argument payload, returning the finished
/// [`Context`]. Never raises: callers check [`Context::success`].
pub fn invoke(command: &dyn Command, args: Value) -> Context {
    execute(command, args, CallOpts::default())
}

/// Like [`invoke`] but reports failures through the given notifier instead
/// of the process-wide one.
pub fn invoke_with(command: &dyn Command, args: Value, notifier: Arc<dyn Notifier>) -> Context {
    execute(
        command,
        args,
        CallOpts {
            notifier: Some(notifier),
            ..CallOpts::default()
        },
    )
}

/// "Bang" invocation: failures come back as `Err(Failure)` carrying the
/// original error, and the notifier is never consulted (reporting a raised
/// error is the caller's concern).
pub fn try_invoke(command: &dyn Command, args: Value) -> Result<Context, Failure> {
    raise_result(execute(
        command,
        args,
        CallOpts {
            raise_on_failure: true,
            ..CallOpts::default()
        },
    ))
}

/// [`try_invoke`] with an invocation-scoped notifier (breadcrumbs still flow
/// to it).
pub fn try_invoke_with(
    command: &dyn Command,
    args: Value,
    notifier: Arc<dyn Notifier>,
) -> Result<Context, Failure> {
    raise_result(execute(
        command,
        args,
        CallOpts {
            raise_on_failure: true,
            notifier: Some(notifier),
            ..CallOpts::default()
        },
    ))
}

fn raise_result(ctx: Context) -> Result<Context, Failure> {
    if ctx.success() {
        return Ok(ctx);
    }
    let error = ctx
        .error()
        .cloned()
        .unwrap_or_else(|| CommandError::runtime("command failed"));
    Err(Failure {
        error,
        no_notify: ctx.no_notify(),
    })
}

/// Runs a chain step through the full protocol, inheriting the chain's
/// raise mode and notifier.
pub(crate) fn execute_child(
    step: &dyn Command,
    values: Map<String, Value>,
    parent: &Context,
) -> Context {
    execute(
        step,
        Value::Object(values),
        CallOpts {
            raise_on_failure: parent.raise_on_failure(),
            allow_unknown: false,
            in_chain: true,
            notifier: Some(parent.notifier()),
        },
    )
}

fn parse_payload(
    command: &str,
    payload: Value,
) -> Result<(Map<String, Value>, PayloadFlags), CallError> {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(CallError::positional(command)),
    };
    let flags = PayloadFlags {
        raise_on_failure: take_flag(&mut map, "raise_on_failure"),
        allow_unknown: take_flag(&mut map, "allow_unknown_arguments"),
        in_chain: take_flag(&mut map, "in_chain"),
    };
    Ok((map, flags))
}

fn take_flag(map: &mut Map<String, Value>, key: &str) -> bool {
    map.remove(key)
        .and_then(|value| value.as_bool())
        .unwrap_or(false)
}

/// The invocation state machine.
fn execute(command: &dyn Command, payload: Value, opts: CallOpts) -> Context {
    let contract = command.contract().clone();
    let notifier = opts
        .notifier
        .clone()
        .unwrap_or_else(installed_notifier);
    let config = get_config();

    let mut ctx = Context::new(contract.clone(), Arc::clone(&notifier));
    if let Some(layout) = command.chain_layout() {
        ctx.enable_chain(layout.into_names());
    }

    let (values, flags) = match parse_payload(contract.name(), payload) {
        Ok(parsed) => parsed,
        Err(err) => {
            ctx.fail(Some(err.into()));
            return finalize_failure(command, ctx, false);
        }
    };
    ctx.set_options(
        opts.raise_on_failure || flags.raise_on_failure,
        opts.allow_unknown || flags.allow_unknown,
        opts.in_chain || flags.in_chain,
    );

    if config.trace_invocations {
        debug!(
            command = contract.name(),
            in_chain = ctx.in_chain(),
            "invoking command"
        );
    }

    if let Err(err) = contract.validate_call_args(&values, ctx.allow_unknown()) {
        ctx.fail(Some(err.into()));
        return finalize_failure(command, ctx, false);
    }
    if let Err(err) = ctx.assign_many(values, true) {
        ctx.fail(Some(err.into()));
        return finalize_failure(command, ctx, false);
    }

    if config.emit_breadcrumbs {
        notifier.breadcrumb(Breadcrumb::new(contract.name(), ctx.to_string()));
    }

    let mut validation = Validation::new();
    command.validate(&ctx, &mut validation);
    if !validation.is_empty() {
        let failure = ValidationFailure::new(validation.into_errors());
        ctx.record_field_errors(failure.errors.clone());
        ctx.set_no_notify(true);
        ctx.fail(Some(failure.into()));
        return finalize_failure(command, ctx, false);
    }

    match command.call(&mut ctx) {
        Ok(returned) => {
            auto_assign_return(&mut ctx, returned);

            if !ctx.field_errors().is_empty() {
                let failure = ValidationFailure::new(ctx.field_errors().to_vec());
                ctx.set_no_notify(true);
                ctx.fail(Some(failure.into()));
                return finalize_failure(command, ctx, true);
            }

            if ctx.is_chain() {
                if !ctx.chain_called() {
                    ctx.fail(Some(CommandError::Unchained {
                        command: contract.name().to_string(),
                    }));
                    return finalize_failure(command, ctx, true);
                }
                let unfilled: Vec<String> = contract
                    .returns()
                    .iter()
                    .filter(|name| is_blank(ctx.return_value(name.as_str())))
                    .cloned()
                    .collect();
                if !unfilled.is_empty() {
                    ctx.fail(Some(CommandError::IncompleteReturns {
                        command: contract.name().to_string(),
                        names: unfilled,
                    }));
                    return finalize_failure(command, ctx, true);
                }
            }

            if config.trace_invocations {
                debug!(command = contract.name(), "command succeeded");
            }
            ctx
        }
        Err(failure) => {
            if failure.no_notify {
                ctx.set_no_notify(true);
            }
            ctx.fail(Some(failure.error));
            finalize_failure(command, ctx, true)
        }
    }
}

/// A body's returned value lands in a single declared return, but only when
/// the body never wrote it.
fn auto_assign_return(ctx: &mut Context, returned: Option<Value>) {
    let Some(value) = returned else { return };
    if ctx.contract().returns().len() != 1 {
        return;
    }
    let name = ctx.contract().returns()[0].clone();
    if ctx.return_written(&name) {
        return;
    }
    let _ = ctx.set(&name, value);
}

fn finalize_failure(command: &dyn Command, mut ctx: Context, ran_body: bool) -> Context {
    if ran_body {
        run_rollbacks(command, &mut ctx);
    }
    if !ctx.notified && !ctx.raise_on_failure() && !ctx.no_notify() {
        let error = ctx
            .error()
            .cloned()
            .unwrap_or_else(|| CommandError::runtime("command failed"));
        debug!(command = ctx.command(), error = %error, "reporting failure to notifier");
        ctx.notifier().notify(&error);
        ctx.mark_notified();
    }
    ctx
}

fn run_rollbacks(command: &dyn Command, ctx: &mut Context) {
    if ctx.rolled_back {
        return;
    }
    ctx.rolled_back = true;
    warn!(command = ctx.command(), "rolling back after failure");
    command.rollback(ctx);
}
