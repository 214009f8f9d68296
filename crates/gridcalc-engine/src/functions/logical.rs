//! Logical builtins.
//!
//! The dispatcher resolves arguments before the call, so IF and IFERROR
//! are eager here: both branches are already evaluated by the time the
//! body picks one.

use gridcalc_model::{ErrorKind, Value};

use crate::coercion::to_bool;
use crate::eval::EvalResult;
use crate::functions::{
    arg_result, bool_arg, ok_value, ArgOrigin, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec, RefData, VARIADIC,
};

inventory::submit! {
    FunctionSpec {
        name: "TRUE",
        category: Category::Logical,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(true_fn),
    }
}

fn true_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(true))
}

inventory::submit! {
    FunctionSpec {
        name: "FALSE",
        category: Category::Logical,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(false_fn),
    }
}

fn false_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(false))
}

inventory::submit! {
    FunctionSpec {
        name: "NOT",
        category: Category::Logical,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(not_fn),
    }
}

fn not_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Bool(!bool_arg(args, 0)?))
}

/// Visit every logical contribution of AND/OR/XOR arguments. Mirrors the
/// numeric aggregator reads: literals coerce, stored text and blanks are
/// skipped, stored numbers count as nonzero-is-true, errors propagate.
/// Returns how many values participated.
fn fold_bools(args: &[FunctionArg], mut visit: impl FnMut(bool)) -> Result<usize, ErrorKind> {
    fn visit_stored(
        value: &Value,
        seen: &mut usize,
        visit: &mut dyn FnMut(bool),
    ) -> Result<(), ErrorKind> {
        match value {
            Value::Bool(b) => {
                visit(*b);
                *seen += 1;
            }
            Value::Number(n) => {
                visit(*n != 0.0);
                *seen += 1;
            }
            Value::Error(e) => return Err(*e),
            _ => {}
        }
        Ok(())
    }

    let mut seen = 0usize;
    for arg in args {
        match arg {
            FunctionArg::Omitted(default) => {
                visit(to_bool(default)?);
                seen += 1;
            }
            FunctionArg::Scalar(v, ArgOrigin::Literal) => {
                visit(to_bool(v)?);
                seen += 1;
            }
            FunctionArg::Scalar(v, _) => visit_stored(v, &mut seen, &mut visit)?,
            FunctionArg::Array(a, _) => {
                for v in a.iter() {
                    visit_stored(v, &mut seen, &mut visit)?;
                }
            }
            FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => {
                visit_stored(v, &mut seen, &mut visit)?
            }
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => {
                for v in a.iter() {
                    visit_stored(v, &mut seen, &mut visit)?;
                }
            }
        }
    }
    Ok(seen)
}

inventory::submit! {
    FunctionSpec {
        name: "AND",
        category: Category::Logical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(and_fn),
    }
}

fn and_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut all = true;
    if fold_bools(args, |b| all &= b)? == 0 {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Bool(all))
}

inventory::submit! {
    FunctionSpec {
        name: "OR",
        category: Category::Logical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(or_fn),
    }
}

fn or_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut any = false;
    if fold_bools(args, |b| any |= b)? == 0 {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Bool(any))
}

inventory::submit! {
    FunctionSpec {
        name: "XOR",
        category: Category::Logical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(xor_fn),
    }
}

fn xor_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut trues = 0usize;
    if fold_bools(args, |b| trues += usize::from(b))? == 0 {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Bool(trues % 2 == 1))
}

inventory::submit! {
    FunctionSpec {
        name: "IF",
        category: Category::Logical,
        min_args: 2,
        max_args: 3,
        implementation: BuiltinImpl::Value(if_fn),
    }
}

fn if_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let branch = if bool_arg(args, 0)? {
        arg_result(&args[1])
    } else {
        match args.get(2) {
            Some(arg) => arg_result(arg),
            None => EvalResult::Scalar(Value::Bool(false)),
        }
    };
    Ok(Some(branch))
}

inventory::submit! {
    FunctionSpec {
        name: "IFERROR",
        category: Category::Logical,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(iferror_fn),
    }
}

fn iferror_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let picked = match args[0].as_scalar() {
        Value::Error(_) => &args[1],
        _ => &args[0],
    };
    Ok(Some(arg_result(picked)))
}
