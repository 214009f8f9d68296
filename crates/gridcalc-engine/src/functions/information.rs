//! Information builtins: the IS* predicates and friends.
//!
//! Predicates inspect their argument instead of coercing it, so an error
//! value is something to report (`ISERROR` is TRUE), not something to
//! propagate.

use gridcalc_model::{ErrorKind, Value};

use crate::functions::{
    number_arg, ok_number, ok_value, ArgOrigin, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec,
};

inventory::submit! {
    FunctionSpec {
        name: "ISBLANK",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(isblank_fn),
    }
}

fn isblank_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(matches!(args[0].as_scalar(), Value::Blank)))
}

inventory::submit! {
    FunctionSpec {
        name: "ISNUMBER",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(isnumber_fn),
    }
}

fn isnumber_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(matches!(
        args[0].as_scalar(),
        Value::Number(_)
    )))
}

inventory::submit! {
    FunctionSpec {
        name: "ISTEXT",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(istext_fn),
    }
}

fn istext_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(matches!(args[0].as_scalar(), Value::Text(_))))
}

inventory::submit! {
    FunctionSpec {
        name: "ISLOGICAL",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(islogical_fn),
    }
}

fn islogical_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(matches!(args[0].as_scalar(), Value::Bool(_))))
}

inventory::submit! {
    FunctionSpec {
        name: "ISERROR",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(iserror_fn),
    }
}

fn iserror_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(matches!(args[0].as_scalar(), Value::Error(_))))
}

inventory::submit! {
    FunctionSpec {
        name: "ISERR",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(iserr_fn),
    }
}

/// Every error except `#N/A`, which gets its own predicate.
fn iserr_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let hit = matches!(args[0].as_scalar(), Value::Error(e) if e != ErrorKind::NA);
    ok_value(Value::Bool(hit))
}

inventory::submit! {
    FunctionSpec {
        name: "ISNA",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(isna_fn),
    }
}

fn isna_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let hit = matches!(args[0].as_scalar(), Value::Error(ErrorKind::NA));
    ok_value(Value::Bool(hit))
}

inventory::submit! {
    FunctionSpec {
        name: "ISREF",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(isref_fn),
    }
}

/// Whether the argument was written as a reference. The data arrives
/// dereferenced like everyone else's; the recorded origin is what is
/// being tested.
fn isref_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(args[0].origin() != ArgOrigin::Literal))
}

inventory::submit! {
    FunctionSpec {
        name: "ISEVEN",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(iseven_fn),
    }
}

fn iseven_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?.trunc();
    ok_value(Value::Bool(n % 2.0 == 0.0))
}

inventory::submit! {
    FunctionSpec {
        name: "ISODD",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(isodd_fn),
    }
}

fn isodd_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?.trunc();
    ok_value(Value::Bool(n % 2.0 != 0.0))
}

inventory::submit! {
    FunctionSpec {
        name: "N",
        category: Category::Information,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(n_fn),
    }
}

fn n_fn(args: &[FunctionArg]) -> FunctionOutcome {
    match args[0].as_scalar() {
        Value::Number(n) => ok_number(n),
        Value::Bool(b) => ok_number(if b { 1.0 } else { 0.0 }),
        Value::Error(e) => Err(e),
        // Text and blanks flatten to zero; N never parses digits out of
        // a string.
        _ => ok_number(0.0),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "NA",
        category: Category::Information,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(na_fn),
    }
}

fn na_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    Err(ErrorKind::NA)
}
