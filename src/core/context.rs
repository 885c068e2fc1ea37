//! Per-invocation execution context.
//!
//! A [`Context`] is created from a command's [`Contract`] at invocation
//! start, carries every argument and return value while the command (and any
//! chain steps) run, and is handed back to the caller once the invocation is
//! finalized. It is exclusively owned by the invocation that created it and
//! is never reused.
//!
//! Once [`fail`](Context::fail) has latched, the context never reports
//! success again. Recording an equivalent error twice keeps a single
//! canonical error.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::core::contract::Contract;
use crate::core::error::{CallError, CommandError};
use crate::core::inspect;
use crate::core::notify::{Notifier, NoopNotifier};
use crate::core::validate::FieldError;

static NULL: Value = Value::Null;

#[derive(Debug, Default, Clone)]
struct ChainState {
    /// Union of every step's arguments and returns, tracked across the run.
    values: Map<String, Value>,
    called: bool,
    completed: Vec<String>,
}

/// Mutable single-owner carrier of one invocation's state.
pub struct Context {
    contract: Contract,
    arguments: Map<String, Value>,
    /// Only names actually written; declared-but-unwritten returns read as null.
    returns: Map<String, Value>,
    chain: Option<ChainState>,
    failure: bool,
    error: Option<CommandError>,
    field_errors: Vec<FieldError>,
    raise_on_failure: bool,
    allow_unknown: bool,
    in_chain: bool,
    no_notify: bool,
    pub(crate) notified: bool,
    pub(crate) rolled_back: bool,
    notifier: Arc<dyn Notifier>,
}

impl Context {
    pub(crate) fn new(contract: Contract, notifier: Arc<dyn Notifier>) -> Self {
        let arguments = contract
            .argument_names()
            .map(|name| (name.to_string(), Value::Null))
            .collect();
        Self {
            contract,
            arguments,
            returns: Map::new(),
            chain: None,
            failure: false,
            error: None,
            field_errors: Vec::new(),
            raise_on_failure: false,
            allow_unknown: false,
            in_chain: false,
            no_notify: false,
            notified: false,
            rolled_back: false,
            notifier,
        }
    }

    /// Builds a detached context pre-seeded with argument and return values.
    ///
    /// Useful for stubbing command results in tests; also used internally to
    /// reconstruct per-step views during a chain rollback. Unknown names are
    /// rejected.
    pub fn seeded(contract: &Contract, values: Map<String, Value>) -> Result<Self, CallError> {
        let mut ctx = Self::new(contract.clone(), Arc::new(NoopNotifier));
        ctx.assign_many(values, false)?;
        Ok(ctx)
    }

    pub(crate) fn set_options(&mut self, raise_on_failure: bool, allow_unknown: bool, in_chain: bool) {
        self.raise_on_failure = raise_on_failure;
        self.allow_unknown = allow_unknown;
        self.in_chain = in_chain;
    }

    pub(crate) fn enable_chain(&mut self, names: impl Iterator<Item = String>) {
        let values = names.map(|name| (name, Value::Null)).collect();
        self.chain = Some(ChainState {
            values,
            called: false,
            completed: Vec::new(),
        });
    }

    // ===============================
    // Identity and outcome
    // ===============================

    /// Name of the command this context belongs to.
    pub fn command(&self) -> &str {
        self.contract.name()
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn success(&self) -> bool {
        !self.failure
    }

    pub fn failed(&self) -> bool {
        self.failure
    }

    pub fn error(&self) -> Option<&CommandError> {
        self.error.as_ref()
    }

    pub fn raise_on_failure(&self) -> bool {
        self.raise_on_failure
    }

    pub fn no_notify(&self) -> bool {
        self.no_notify
    }

    pub fn in_chain(&self) -> bool {
        self.in_chain
    }

    pub(crate) fn allow_unknown(&self) -> bool {
        self.allow_unknown
    }

    pub fn is_chain(&self) -> bool {
        self.chain.is_some()
    }

    /// Marks the context failed. The first distinct error becomes the
    /// canonical one; recording an equivalent error again is a no-op.
    pub fn fail(&mut self, error: Option<CommandError>) {
        self.failure = true;
        if let Some(err) = error {
            if self.error.as_ref() != Some(&err) {
                self.error = Some(err);
            }
        }
    }

    pub(crate) fn set_no_notify(&mut self, no_notify: bool) {
        self.no_notify = no_notify;
    }

    pub(crate) fn mark_notified(&mut self) {
        self.notified = true;
    }

    pub(crate) fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    // ===============================
    // Field errors
    // ===============================

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    /// Accumulates a field error without interrupting execution. Accumulated
    /// errors surface as a validation failure once the body finishes.
    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors.push(FieldError::new(field, message));
    }

    pub(crate) fn record_field_errors(&mut self, errors: Vec<FieldError>) {
        self.field_errors.extend(errors);
    }

    // ===============================
    // Values
    // ===============================

    /// Current value of a declared argument (null when unsupplied).
    pub fn argument(&self, name: &str) -> &Value {
        self.arguments.get(name).unwrap_or(&NULL)
    }

    /// Current value of a declared return (null until written).
    pub fn return_value(&self, name: &str) -> &Value {
        self.returns.get(name).unwrap_or(&NULL)
    }

    /// Merged lookup: written returns win over arguments, which win over
    /// chain-tracked values.
    pub fn value(&self, name: &str) -> &Value {
        if let Some(value) = self.returns.get(name) {
            return value;
        }
        if let Some(value) = self.arguments.get(name) {
            return value;
        }
        if let Some(chain) = &self.chain {
            if let Some(value) = chain.values.get(name) {
                return value;
            }
        }
        &NULL
    }

    /// Deserializes the merged value of `name` into `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, CommandError> {
        serde_json::from_value(self.value(name).clone()).map_err(|err| {
            CommandError::runtime(format!(
                "`{}`: could not read `{name}`: {err}",
                self.command()
            ))
        })
    }

    /// Writes a value under a declared argument and/or return name.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), CommandError> {
        let lenient = self.allow_unknown;
        self.assign(name, value, lenient).map_err(Into::into)
    }

    pub(crate) fn assign(
        &mut self,
        name: &str,
        value: Value,
        lenient: bool,
    ) -> Result<(), CallError> {
        let is_argument = self.contract.is_argument(name);
        let is_return = self.contract.is_return(name);
        let is_chain_value = self
            .chain
            .as_ref()
            .is_some_and(|chain| chain.values.contains_key(name));

        if !(is_argument || is_return || is_chain_value) {
            if lenient {
                return Ok(());
            }
            return Err(CallError::unknown(
                self.contract.name(),
                vec![name.to_string()],
            ));
        }

        if is_argument {
            self.arguments.insert(name.to_string(), value.clone());
        }
        if is_return {
            self.returns.insert(name.to_string(), value.clone());
        }
        if is_chain_value {
            if let Some(chain) = self.chain.as_mut() {
                chain.values.insert(name.to_string(), value.clone());
            }
        }
        Ok(())
    }

    pub(crate) fn assign_many(
        &mut self,
        values: Map<String, Value>,
        lenient: bool,
    ) -> Result<(), CallError> {
        for (name, value) in values {
            self.assign(&name, value, lenient)?;
        }
        Ok(())
    }

    pub(crate) fn return_written(&self, name: &str) -> bool {
        self.returns.contains_key(name)
    }

    /// The merged view of every known value: chain-tracked values overlaid
    /// by arguments, overlaid by written returns.
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut view = self
            .chain
            .as_ref()
            .map(|chain| chain.values.clone())
            .unwrap_or_default();
        for (name, value) in &self.arguments {
            view.insert(name.clone(), value.clone());
        }
        for (name, value) in &self.returns {
            view.insert(name.clone(), value.clone());
        }
        view
    }

    /// Current values of this command's own declared arguments.
    pub fn own_arguments(&self) -> Map<String, Value> {
        self.arguments.clone()
    }

    /// Slices the merged view down to another contract's argument names,
    /// with null standing in for anything never seen.
    pub(crate) fn project(&self, contract: &Contract) -> Map<String, Value> {
        let view = self.snapshot();
        contract
            .argument_names()
            .map(|name| {
                (
                    name.to_string(),
                    view.get(name).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    pub(crate) fn scoped_values<'a>(
        &self,
        names: impl Iterator<Item = &'a str>,
    ) -> Map<String, Value> {
        let view = self.snapshot();
        names
            .map(|name| {
                (
                    name.to_string(),
                    view.get(name).cloned().unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    // ===============================
    // Chain state
    // ===============================

    /// Steps that finished successfully, in execution order.
    pub fn completed_steps(&self) -> &[String] {
        self.chain
            .as_ref()
            .map(|chain| chain.completed.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn chain_called(&self) -> bool {
        self.chain.as_ref().is_some_and(|chain| chain.called)
    }

    pub(crate) fn mark_chain_called(&mut self) {
        if let Some(chain) = self.chain.as_mut() {
            chain.called = true;
        }
    }

    pub(crate) fn push_completed(&mut self, name: &str) {
        if let Some(chain) = self.chain.as_mut() {
            chain.completed.push(name.to_string());
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arguments = inspect::render_pairs(
            self.contract
                .argument_names()
                .map(|name| (name, self.argument(name))),
        );
        let returns = inspect::render_pairs(
            self.contract
                .returns()
                .iter()
                .map(|name| (name.as_str(), self.return_value(name))),
        );
        let error = match &self.error {
            Some(err) => format!("\"{err}\""),
            None => "nil".to_string(),
        };
        write!(
            f,
            "<Context {} success={} error={} arguments={{{}}} returns={{{}}}",
            self.command(),
            self.success(),
            error,
            arguments,
            returns
        )?;
        if let Some(chain) = &self.chain {
            write!(f, " called=[{}]", chain.completed.join(", "))?;
        }
        write!(f, ">")
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
