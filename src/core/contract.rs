//! Argument contracts.
//!
//! A [`Contract`] is the immutable declaration of a command's required
//! inputs, optional inputs, and promised outputs. It is built once per
//! command type through [`ContractBuilder`] and consulted on every call to
//! enforce the named-argument calling convention.
//!
//! ```
//! use cmdchain::core::{Contract, ExpectedKind};
//!
//! let contract = Contract::builder("SquareRoot")
//!     .requires_typed("number", ExpectedKind::Number)
//!     .returns("root")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(contract.name(), "SquareRoot");
//! assert!(contract.is_argument("number"));
//! assert!(contract.is_return("root"));
//! ```

use std::fmt;

use serde_json::{Map, Value};

use crate::core::error::CallError;

/// Names that are claimed by the invocation machinery and the context's own
/// surface. Declaring one as an argument or return is a definition error.
pub const RESERVED_NAMES: &[&str] = &[
    "raise_on_failure",
    "allow_unknown_arguments",
    "in_chain",
    "error",
    "failed",
    "success",
    "called",
];

/// Runtime kind an argument value must satisfy when declared with a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    String,
    Number,
    Integer,
    Bool,
    Array,
    Object,
}

impl ExpectedKind {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ExpectedKind::String => value.is_string(),
            ExpectedKind::Number => value.is_number(),
            ExpectedKind::Integer => value.is_i64() || value.is_u64(),
            ExpectedKind::Bool => value.is_boolean(),
            ExpectedKind::Array => value.is_array(),
            ExpectedKind::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExpectedKind::String => "String",
            ExpectedKind::Number => "Number",
            ExpectedKind::Integer => "Integer",
            ExpectedKind::Bool => "Bool",
            ExpectedKind::Array => "Array",
            ExpectedKind::Object => "Object",
        };
        f.write_str(name)
    }
}

/// One declared argument: a name plus an optional expected kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    kind: Option<ExpectedKind>,
}

impl Argument {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Option<ExpectedKind> {
        self.kind
    }
}

/// Immutable per-command declaration of required/optional inputs and
/// declared outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    name: String,
    requires: Vec<Argument>,
    allows: Vec<Argument>,
    returns: Vec<String>,
}

impl Contract {
    pub fn builder(name: impl Into<String>) -> ContractBuilder {
        ContractBuilder {
            name: name.into(),
            requires: Vec::new(),
            allows: Vec::new(),
            returns: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires(&self) -> &[Argument] {
        &self.requires
    }

    pub fn allows(&self) -> &[Argument] {
        &self.allows
    }

    pub fn returns(&self) -> &[String] {
        &self.returns
    }

    /// Every declared argument, required first, then allowed.
    pub fn arguments(&self) -> impl Iterator<Item = &Argument> {
        self.requires.iter().chain(self.allows.iter())
    }

    pub fn argument_names(&self) -> impl Iterator<Item = &str> {
        self.arguments().map(Argument::name)
    }

    pub fn is_argument(&self, name: &str) -> bool {
        self.arguments().any(|arg| arg.name == name)
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allows.iter().any(|arg| arg.name == name)
    }

    pub fn is_return(&self, name: &str) -> bool {
        self.returns.iter().any(|ret| ret == name)
    }

    /// Enforces the call contract against a set of supplied named values.
    ///
    /// Checks run in order: missing required names, unknown names (skipped
    /// when `allow_unknown` is set, used by chain projection), then declared
    /// type conformance. A blank value skips the type check for optional
    /// arguments only.
    pub fn validate_call_args(
        &self,
        supplied: &Map<String, Value>,
        allow_unknown: bool,
    ) -> Result<(), CallError> {
        let missing: Vec<String> = self
            .requires
            .iter()
            .filter(|arg| !supplied.contains_key(&arg.name))
            .map(|arg| arg.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(CallError::missing(&self.name, missing));
        }

        if !allow_unknown {
            let unknown: Vec<String> = supplied
                .keys()
                .filter(|key| !self.is_argument(key))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(CallError::unknown(&self.name, unknown));
            }
        }

        for arg in self.arguments() {
            let Some(kind) = arg.kind else { continue };
            let Some(value) = supplied.get(&arg.name) else {
                continue;
            };
            if self.is_allowed(&arg.name) && is_blank(value) {
                continue;
            }
            if !kind.matches(value) {
                return Err(CallError::wrong_type(&self.name, &arg.name, kind));
            }
        }

        Ok(())
    }
}

/// Builder for [`Contract`]. Declaration problems (duplicate names, reserved
/// names) surface from [`build`](ContractBuilder::build) as [`CallError`]s.
#[derive(Debug, Clone)]
pub struct ContractBuilder {
    name: String,
    requires: Vec<Argument>,
    allows: Vec<Argument>,
    returns: Vec<String>,
}

impl ContractBuilder {
    pub fn requires(mut self, name: impl Into<String>) -> Self {
        self.requires.push(Argument {
            name: name.into(),
            kind: None,
        });
        self
    }

    pub fn requires_typed(mut self, name: impl Into<String>, kind: ExpectedKind) -> Self {
        self.requires.push(Argument {
            name: name.into(),
            kind: Some(kind),
        });
        self
    }

    pub fn allows(mut self, name: impl Into<String>) -> Self {
        self.allows.push(Argument {
            name: name.into(),
            kind: None,
        });
        self
    }

    pub fn allows_typed(mut self, name: impl Into<String>, kind: ExpectedKind) -> Self {
        self.allows.push(Argument {
            name: name.into(),
            kind: Some(kind),
        });
        self
    }

    pub fn returns(mut self, name: impl Into<String>) -> Self {
        self.returns.push(name.into());
        self
    }

    pub fn build(self) -> Result<Contract, CallError> {
        let duplicated: Vec<String> = self
            .requires
            .iter()
            .filter(|req| self.allows.iter().any(|allow| allow.name == req.name))
            .map(|req| req.name.clone())
            .collect();
        if !duplicated.is_empty() {
            return Err(CallError::Duplicated {
                command: self.name,
                names: duplicated,
            });
        }

        let mut reserved: Vec<String> = self
            .requires
            .iter()
            .chain(self.allows.iter())
            .map(|arg| arg.name.clone())
            .chain(self.returns.iter().cloned())
            .filter(|name| RESERVED_NAMES.contains(&name.as_str()))
            .collect();
        reserved.dedup();
        if !reserved.is_empty() {
            return Err(CallError::Reserved {
                command: self.name,
                names: reserved,
            });
        }

        Ok(Contract {
            name: self.name,
            requires: self.requires,
            allows: self.allows,
            returns: self.returns,
        })
    }
}

/// Blank means "nothing was really supplied": null, empty string, empty
/// array, or empty object.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
