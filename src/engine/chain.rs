//! Chains: commands composed of an ordered list of child commands sharing
//! one progressively-built context.
//!
//! A chain's body must run its steps exactly once through
//! [`run_chain`](Chain::run_chain); the default body does this with the
//! chain's own arguments. Each step sees the current merged view sliced to
//! its declared argument names; its returns merge back into the chain
//! context, overwriting same-named arguments. The first failing step stops
//! the run and, on rollback, every step that completed is compensated in
//! reverse order before the chain's own `rollback`.
//!
//! ```
//! use cmdchain::core::{Contract, Context};
//! use cmdchain::engine::{invoke, Chain, Command, Outcome};
//! use once_cell::sync::Lazy;
//! use serde_json::json;
//!
//! struct Double;
//!
//! static DOUBLE: Lazy<Contract> = Lazy::new(|| {
//!     Contract::builder("Double")
//!         .requires("n")
//!         .returns("n")
//!         .build()
//!         .expect("well-formed contract")
//! });
//!
//! impl Command for Double {
//!     fn contract(&self) -> &Contract {
//!         &DOUBLE
//!     }
//!
//!     fn call(&self, ctx: &mut Context) -> Outcome {
//!         let n: i64 = ctx.get("n")?;
//!         Ok(Some(json!(n * 2)))
//!     }
//! }
//!
//! struct Quadruple;
//!
//! static QUADRUPLE: Lazy<Contract> = Lazy::new(|| {
//!     Contract::builder("Quadruple")
//!         .requires("n")
//!         .returns("n")
//!         .build()
//!         .expect("well-formed contract")
//! });
//!
//! impl Chain for Quadruple {
//!     fn contract(&self) -> &Contract {
//!         &QUADRUPLE
//!     }
//!
//!     fn steps(&self) -> Vec<&dyn Command> {
//!         vec![&Double, &Double]
//!     }
//! }
//!
//! let result = invoke(&Quadruple, json!({ "n": 3 }));
//! assert!(result.success());
//! assert_eq!(result.value("n"), &json!(12));
//! assert_eq!(result.completed_steps(), ["Double", "Double"]);
//! ```

use serde_json::{Map, Value};
use tracing::debug;

use crate::core::context::Context;
use crate::core::contract::Contract;
use crate::core::error::CommandError;
use crate::core::validate::Validation;

use super::{execute_child, Command, Failure, Outcome};

/// Union of a chain's own contract with every step's contract; used to
/// track values across steps for projection and rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLayout {
    pub arguments: Vec<String>,
    pub returns: Vec<String>,
}

impl ChainLayout {
    pub(crate) fn into_names(self) -> impl Iterator<Item = String> {
        let mut names = self.arguments;
        for name in self.returns {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.into_iter()
    }
}

/// A command whose body delegates to an ordered list of child commands.
///
/// Implementations supply the contract and the steps; overriding
/// [`call`](Chain::call) allows custom code around the chain run, as long
/// as `run_chain` is invoked exactly once. `run_chain` and `chain_rollback`
/// are the protocol; do not override them.
pub trait Chain: Send + Sync {
    fn contract(&self) -> &Contract;

    /// Child commands, in execution order.
    fn steps(&self) -> Vec<&dyn Command>;

    /// Chain body. The default forwards the chain's own arguments to
    /// [`run_chain`](Chain::run_chain).
    fn call(&self, ctx: &mut Context) -> Outcome {
        let args = ctx.own_arguments();
        self.run_chain(ctx, args)?;
        Ok(None)
    }

    /// Compensating action for the chain's own work; runs after every
    /// completed step has rolled back.
    fn rollback(&self, _ctx: &mut Context) {}

    fn validate(&self, _ctx: &Context, _validation: &mut Validation) {}

    /// Threads the shared context through every step in order.
    ///
    /// Merges `args` into the context, then for each step: projects the
    /// current merged view onto the step's declared arguments, invokes it
    /// through the full protocol (inheriting raise mode and notifier), and
    /// merges its written returns back. Stops at the first failure; later
    /// steps never run.
    fn run_chain(&self, ctx: &mut Context, args: Map<String, Value>) -> Result<(), Failure> {
        ctx.mark_chain_called();
        if let Err(err) = ctx.assign_many(args, true) {
            return Err(err.into());
        }

        for step in self.steps() {
            let contract = step.contract().clone();
            debug!(
                chain = ctx.command(),
                step = contract.name(),
                "running chain step"
            );

            let values = ctx.project(&contract);
            let result = execute_child(step, values, ctx);

            // merge the step's written returns back, even when it failed:
            // a failed step's rollback writes stay visible on the chain
            let mut returned = Map::new();
            for name in result.contract().returns() {
                if result.return_written(name) {
                    returned.insert(name.clone(), result.return_value(name).clone());
                }
            }
            let _ = ctx.assign_many(returned, true);

            if result.success() {
                ctx.push_completed(contract.name());
            } else {
                ctx.record_field_errors(result.field_errors().to_vec());
                // the step already settled its own notification
                ctx.mark_notified();
                let error = result.error().cloned().unwrap_or_else(|| {
                    CommandError::runtime(format!("`{}` failed", contract.name()))
                });
                return Err(Failure {
                    error,
                    no_notify: result.no_notify(),
                });
            }
        }
        Ok(())
    }

    /// Compensates completed steps in reverse execution order.
    ///
    /// Each step gets a fresh context scoped to its argument and return
    /// names, populated from the chain's current values. Writes its
    /// `rollback` makes to the step's declared returns merge back into the
    /// chain context; argument mutations stay step-local.
    fn chain_rollback(&self, ctx: &mut Context) {
        let steps = self.steps();
        let done = ctx.completed_steps().len().min(steps.len());

        for step in steps[..done].iter().rev() {
            let contract = step.contract();
            debug!(
                chain = ctx.command(),
                step = contract.name(),
                "rolling back chain step"
            );

            let names = contract
                .argument_names()
                .chain(contract.returns().iter().map(String::as_str));
            let values = ctx.scoped_values(names);
            let Ok(mut step_ctx) = Context::seeded(contract, values) else {
                continue;
            };
            step.rollback(&mut step_ctx);

            let mut undone = Map::new();
            for name in contract.returns() {
                undone.insert(name.clone(), step_ctx.return_value(name).clone());
            }
            let _ = ctx.assign_many(undone, true);
        }
    }
}

impl<T: Chain> Command for T {
    fn contract(&self) -> &Contract {
        Chain::contract(self)
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        Chain::call(self, ctx)
    }

    /// Children are compensated before the chain that orchestrated them.
    fn rollback(&self, ctx: &mut Context) {
        self.chain_rollback(ctx);
        Chain::rollback(self, ctx);
    }

    fn validate(&self, ctx: &Context, validation: &mut Validation) {
        Chain::validate(self, ctx, validation)
    }

    fn chain_layout(&self) -> Option<ChainLayout> {
        let contract = Chain::contract(self);
        let mut arguments: Vec<String> = contract.argument_names().map(str::to_string).collect();
        let mut returns: Vec<String> = contract.returns().to_vec();
        for step in self.steps() {
            for name in step.contract().argument_names() {
                if !arguments.iter().any(|known| known == name) {
                    arguments.push(name.to_string());
                }
            }
            for name in step.contract().returns() {
                if !returns.iter().any(|known| known == name) {
                    returns.push(name.clone());
                }
            }
        }
        Some(ChainLayout { arguments, returns })
    }
}
