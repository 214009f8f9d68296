//! Trigonometry builtins.
//!
//! Angles are radians unless the name says otherwise. Inverse functions
//! with out-of-domain input produce NaN here and let the numeric scrub at
//! the call boundary turn that into `#VALUE!`.

use gridcalc_model::ErrorKind;

use crate::functions::{
    number_arg, ok_number, BuiltinImpl, Category, FunctionArg, FunctionOutcome, FunctionSpec,
};

inventory::submit! {
    FunctionSpec {
        name: "PI",
        category: Category::Trig,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(pi_fn),
    }
}

fn pi_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(std::f64::consts::PI)
}

inventory::submit! {
    FunctionSpec {
        name: "SIN",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(sin_fn),
    }
}

fn sin_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.sin())
}

inventory::submit! {
    FunctionSpec {
        name: "COS",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(cos_fn),
    }
}

fn cos_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.cos())
}

inventory::submit! {
    FunctionSpec {
        name: "TAN",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(tan_fn),
    }
}

fn tan_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.tan())
}

inventory::submit! {
    FunctionSpec {
        name: "ASIN",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(asin_fn),
    }
}

fn asin_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.asin())
}

inventory::submit! {
    FunctionSpec {
        name: "ACOS",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(acos_fn),
    }
}

fn acos_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.acos())
}

inventory::submit! {
    FunctionSpec {
        name: "ATAN",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(atan_fn),
    }
}

fn atan_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.atan())
}

inventory::submit! {
    FunctionSpec {
        name: "ATAN2",
        category: Category::Trig,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(atan2_fn),
    }
}

fn atan2_fn(args: &[FunctionArg]) -> FunctionOutcome {
    // Argument order is (x, y), unlike f64::atan2.
    let x = number_arg(args, 0)?;
    let y = number_arg(args, 1)?;
    if x == 0.0 && y == 0.0 {
        return Err(ErrorKind::Div0);
    }
    ok_number(y.atan2(x))
}

inventory::submit! {
    FunctionSpec {
        name: "DEGREES",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(degrees_fn),
    }
}

fn degrees_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.to_degrees())
}

inventory::submit! {
    FunctionSpec {
        name: "RADIANS",
        category: Category::Trig,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(radians_fn),
    }
}

fn radians_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.to_radians())
}
