//! Shared test commands and a recording notifier for the integration suites.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use cmdchain::core::{
    Breadcrumb, CommandError, Context, Contract, ExpectedKind, Notifier, Validation,
};
use cmdchain::engine::{Chain, Command, Failure, Outcome};

// ===============================
// Recording Notifier
// ===============================

/// Captures every notify/breadcrumb call for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notified: Mutex<Vec<String>>,
    pub breadcrumbs: Mutex<Vec<Breadcrumb>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notify_count(&self) -> usize {
        self.notified.lock().unwrap().len()
    }

    pub fn notified_messages(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }

    pub fn breadcrumb_labels(&self) -> Vec<String> {
        self.breadcrumbs
            .lock()
            .unwrap()
            .iter()
            .map(|crumb| crumb.label.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, error: &CommandError) {
        self.notified.lock().unwrap().push(error.to_string());
    }

    fn breadcrumb(&self, crumb: Breadcrumb) {
        self.breadcrumbs.lock().unwrap().push(crumb);
    }
}

fn value_is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// ===============================
// SquareRoot
// ===============================

pub struct SquareRoot;

static SQUARE_ROOT: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("SquareRoot")
        .requires_typed("number", ExpectedKind::Number)
        .returns("root")
        .build()
        .expect("well-formed contract")
});

impl Command for SquareRoot {
    fn contract(&self) -> &Contract {
        &SQUARE_ROOT
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let number: f64 = ctx.get("number")?;
        if number < 0.0 {
            return Err(Failure::halt(format!(
                "numerical argument is out of domain: {number}"
            )));
        }
        Ok(Some(json!(number.sqrt())))
    }

    fn rollback(&self, ctx: &mut Context) {
        let number = ctx.argument("number").clone();
        let _ = ctx.set("root", number);
    }
}

// ===============================
// ArrayAdd / ArrayPop
// ===============================

pub struct ArrayAdd;

static ARRAY_ADD: Lazy<Contract> = Lazy::new(|| {
    // `array` is both argument and return: the in-place mutation (and its
    // rollback) must be visible to enclosing chains
    Contract::builder("ArrayAdd")
        .requires_typed("array", ExpectedKind::Array)
        .requires("item")
        .allows("explode")
        .returns("new_array")
        .returns("array")
        .build()
        .expect("well-formed contract")
});

impl Command for ArrayAdd {
    fn contract(&self) -> &Contract {
        &ARRAY_ADD
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let mut array: Vec<Value> = ctx.get("array")?;
        array.push(ctx.argument("item").clone());
        ctx.set("array", json!(array))?;
        ctx.set("new_array", ctx.argument("array").clone())?;

        if ctx.argument("explode").as_bool().unwrap_or(false) {
            return Err(CommandError::runtime("Test Error").into());
        }
        Ok(None)
    }

    fn rollback(&self, ctx: &mut Context) {
        if let Ok(mut array) = ctx.get::<Vec<Value>>("array") {
            array.pop();
            let _ = ctx.set("array", json!(array));
        }
    }
}

pub struct ArrayPop;

static ARRAY_POP: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("ArrayPop")
        .requires("array")
        .returns("popped_array")
        .returns("popped_item")
        .build()
        .expect("well-formed contract")
});

impl Command for ArrayPop {
    fn contract(&self) -> &Contract {
        &ARRAY_POP
    }

    fn validate(&self, ctx: &Context, validation: &mut Validation) {
        match ctx.argument("array") {
            Value::Array(items) if !items.iter().any(value_is_blank) => {}
            _ => validation.add("array", "must be an array with no blank items"),
        }
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let mut array: Vec<Value> = ctx.get("array")?;
        let popped = array.pop().unwrap_or(Value::Null);
        ctx.set("popped_item", popped)?;
        ctx.set("popped_array", json!(array))?;
        Ok(None)
    }
}

// ===============================
// EIN Normalization Chain
// ===============================

pub struct NormalizeEin;

static NORMALIZE_EIN: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("NormalizeEin")
        .requires_typed("ein", ExpectedKind::String)
        .returns("ein")
        .build()
        .expect("well-formed contract")
});

impl Command for NormalizeEin {
    fn contract(&self) -> &Contract {
        &NORMALIZE_EIN
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let ein: String = ctx.get("ein")?;
        let digits: String = ein.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 3 {
            return Err(Failure::halt(format!("`{ein}` is not an EIN")));
        }
        Ok(Some(json!(format!("{}-{}", &digits[..2], &digits[2..]))))
    }
}

pub struct CreateEntity;

static CREATE_ENTITY: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("CreateEntity")
        .requires_typed("ein", ExpectedKind::String)
        .returns("entity")
        .build()
        .expect("well-formed contract")
});

impl Command for CreateEntity {
    fn contract(&self) -> &Contract {
        &CREATE_ENTITY
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let ein: String = ctx.get("ein")?;
        Ok(Some(json!({ "id": 1, "ein": ein })))
    }
}

pub struct CreateNormalizedEntity;

static CREATE_NORMALIZED_ENTITY: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("CreateNormalizedEntity")
        .requires("ein")
        .returns("entity")
        .build()
        .expect("well-formed contract")
});

impl Chain for CreateNormalizedEntity {
    fn contract(&self) -> &Contract {
        &CREATE_NORMALIZED_ENTITY
    }

    fn steps(&self) -> Vec<&dyn Command> {
        vec![&NormalizeEin, &CreateEntity]
    }
}

// ===============================
// Three-Step Chain
// ===============================

fn push_marker(ctx: &mut Context, marker: &str) -> Result<(), Failure> {
    let mut trail: Vec<Value> = ctx.get("trail")?;
    trail.push(json!(marker));
    ctx.set("trail", json!(trail))?;
    Ok(())
}

pub struct StepOne;

static STEP_ONE: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("StepOne")
        .requires_typed("trail", ExpectedKind::Array)
        .returns("trail")
        .returns("undone_one")
        .build()
        .expect("well-formed contract")
});

impl Command for StepOne {
    fn contract(&self) -> &Contract {
        &STEP_ONE
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        push_marker(ctx, "one")?;
        Ok(None)
    }

    fn rollback(&self, ctx: &mut Context) {
        let _ = ctx.set("undone_one", json!("one-rolled"));
    }
}

pub struct StepTwo;

static STEP_TWO: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("StepTwo")
        .requires_typed("trail", ExpectedKind::Array)
        .allows_typed("fail_message", ExpectedKind::String)
        .returns("trail")
        .build()
        .expect("well-formed contract")
});

impl Command for StepTwo {
    fn contract(&self) -> &Contract {
        &STEP_TWO
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        if let Some(message) = ctx.argument("fail_message").as_str() {
            if !message.is_empty() {
                return Err(Failure::halt(message));
            }
        }
        push_marker(ctx, "two")?;
        Ok(None)
    }
}

pub struct StepThree;

static STEP_THREE: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("StepThree")
        .requires_typed("trail", ExpectedKind::Array)
        .returns("trail")
        .returns("undone_three")
        .build()
        .expect("well-formed contract")
});

impl Command for StepThree {
    fn contract(&self) -> &Contract {
        &STEP_THREE
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        push_marker(ctx, "three")?;
        Ok(None)
    }

    fn rollback(&self, ctx: &mut Context) {
        let _ = ctx.set("undone_three", json!("three-rolled"));
    }
}

pub struct ThreeStepChain;

static THREE_STEP_CHAIN: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("ThreeStepChain")
        .requires_typed("trail", ExpectedKind::Array)
        .allows("fail_message")
        .returns("trail")
        .build()
        .expect("well-formed contract")
});

impl Chain for ThreeStepChain {
    fn contract(&self) -> &Contract {
        &THREE_STEP_CHAIN
    }

    fn steps(&self) -> Vec<&dyn Command> {
        vec![&StepOne, &StepTwo, &StepThree]
    }
}

// ===============================
// ArrayChain (custom body + own rollback)
// ===============================

pub struct ArrayChain;

static ARRAY_CHAIN: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("ArrayChain")
        .requires_typed("array", ExpectedKind::Array)
        .requires_typed("item", ExpectedKind::Integer)
        .allows("explode")
        .returns("new_array")
        .returns("revised_item")
        .build()
        .expect("well-formed contract")
});

impl Chain for ArrayChain {
    fn contract(&self) -> &Contract {
        &ARRAY_CHAIN
    }

    fn steps(&self) -> Vec<&dyn Command> {
        vec![&ArrayAdd, &ArrayPop]
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let item: i64 = ctx.get("item")?;
        ctx.set("revised_item", json!(item + 5))?;

        let mut args = ctx.own_arguments();
        args.insert("item".to_string(), json!(item + 5));
        self.run_chain(ctx, args)?;
        Ok(None)
    }

    fn rollback(&self, ctx: &mut Context) {
        if let Ok(item) = ctx.get::<i64>("item") {
            let _ = ctx.set("revised_item", json!(item - 3));
        }
    }
}

// ===============================
// StopAndFail
// ===============================

pub struct StopAndFail;

static STOP_AND_FAIL: Lazy<Contract> = Lazy::new(|| {
    Contract::builder("StopAndFail")
        .requires_typed("number", ExpectedKind::Integer)
        .allows_typed("fail_error", ExpectedKind::String)
        .returns("revised_number")
        .build()
        .expect("well-formed contract")
});

impl Command for StopAndFail {
    fn contract(&self) -> &Contract {
        &STOP_AND_FAIL
    }

    fn call(&self, ctx: &mut Context) -> Outcome {
        let number: i64 = ctx.get("number")?;
        ctx.set("revised_number", json!(number * 2))?;

        match ctx.argument("fail_error").as_str() {
            Some(message) if !message.is_empty() => Err(Failure::halt_quiet(message)),
            _ => Err(Failure::stop()),
        }
    }

    fn rollback(&self, ctx: &mut Context) {
        if let Ok(number) = ctx.get::<i64>("number") {
            let _ = ctx.set("revised_number", json!(number / 2));
        }
    }
}
