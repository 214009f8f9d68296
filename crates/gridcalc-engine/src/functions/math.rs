//! Math builtins.

use gridcalc_model::ErrorKind;

use crate::eval::pow_value;
use crate::functions::{
    for_each_number, number_arg, ok_number, ok_value, opt_number_arg, BuiltinImpl, Category,
    FunctionArg, FunctionOutcome, FunctionSpec, VARIADIC,
};

inventory::submit! {
    FunctionSpec {
        name: "SUM",
        category: Category::Math,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(sum),
    }
}

fn sum(args: &[FunctionArg]) -> FunctionOutcome {
    let mut total = 0.0;
    for_each_number(args, |n| total += n)?;
    ok_number(total)
}

inventory::submit! {
    FunctionSpec {
        name: "PRODUCT",
        category: Category::Math,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(product),
    }
}

fn product(args: &[FunctionArg]) -> FunctionOutcome {
    let mut total = 1.0;
    let mut seen = 0usize;
    for_each_number(args, |n| {
        total *= n;
        seen += 1;
    })?;
    // No numeric input at all multiplies out to zero, not one.
    ok_number(if seen == 0 { 0.0 } else { total })
}

inventory::submit! {
    FunctionSpec {
        name: "ABS",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(abs_fn),
    }
}

fn abs_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.abs())
}

inventory::submit! {
    FunctionSpec {
        name: "SIGN",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(sign_fn),
    }
}

fn sign_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    // f64::signum maps 0.0 to 1.0; the grid wants 0.
    ok_number(if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    })
}

inventory::submit! {
    FunctionSpec {
        name: "SQRT",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(sqrt_fn),
    }
}

fn sqrt_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    if n < 0.0 {
        return Err(ErrorKind::Num);
    }
    ok_number(n.sqrt())
}

inventory::submit! {
    FunctionSpec {
        name: "POWER",
        category: Category::Math,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(power_fn),
    }
}

fn power_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let base = number_arg(args, 0)?;
    let exponent = number_arg(args, 1)?;
    ok_value(pow_value(base, exponent))
}

inventory::submit! {
    FunctionSpec {
        name: "MOD",
        category: Category::Math,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(mod_fn),
    }
}

fn mod_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    let d = number_arg(args, 1)?;
    if d == 0.0 {
        return Err(ErrorKind::Div0);
    }
    // Result takes the divisor's sign: MOD(-3, 2) is 1.
    ok_number(n - d * (n / d).floor())
}

inventory::submit! {
    FunctionSpec {
        name: "INT",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(int_fn),
    }
}

fn int_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.floor())
}

#[derive(Clone, Copy)]
enum RoundMode {
    HalfAwayFromZero,
    AwayFromZero,
    TowardZero,
}

inventory::submit! {
    FunctionSpec {
        name: "ROUND",
        category: Category::Math,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(round_fn),
    }
}

fn round_fn(args: &[FunctionArg]) -> FunctionOutcome {
    round_impl(args, RoundMode::HalfAwayFromZero)
}

inventory::submit! {
    FunctionSpec {
        name: "ROUNDUP",
        category: Category::Math,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(roundup_fn),
    }
}

fn roundup_fn(args: &[FunctionArg]) -> FunctionOutcome {
    round_impl(args, RoundMode::AwayFromZero)
}

inventory::submit! {
    FunctionSpec {
        name: "ROUNDDOWN",
        category: Category::Math,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(rounddown_fn),
    }
}

fn rounddown_fn(args: &[FunctionArg]) -> FunctionOutcome {
    round_impl(args, RoundMode::TowardZero)
}

fn round_impl(args: &[FunctionArg], mode: RoundMode) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    let digits = opt_number_arg(args, 1, 0.0)?.trunc();
    // Past ~15 significant digits a f64 cannot move anyway.
    let digits = digits.clamp(-300.0, 300.0) as i32;
    let factor = 10f64.powi(digits);
    let scaled = n * factor;
    let rounded = match mode {
        RoundMode::HalfAwayFromZero => scaled.round(),
        RoundMode::AwayFromZero => scaled.abs().ceil().copysign(scaled),
        RoundMode::TowardZero => scaled.trunc(),
    };
    ok_number(rounded / factor)
}

inventory::submit! {
    FunctionSpec {
        name: "EXP",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(exp_fn),
    }
}

fn exp_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(number_arg(args, 0)?.exp())
}

inventory::submit! {
    FunctionSpec {
        name: "LN",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(ln_fn),
    }
}

fn ln_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    if n <= 0.0 {
        return Err(ErrorKind::Num);
    }
    ok_number(n.ln())
}

inventory::submit! {
    FunctionSpec {
        name: "LOG",
        category: Category::Math,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(log_fn),
    }
}

fn log_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    let base = opt_number_arg(args, 1, 10.0)?;
    if n <= 0.0 || base <= 0.0 {
        return Err(ErrorKind::Num);
    }
    if base == 1.0 {
        return Err(ErrorKind::Div0);
    }
    ok_number(n.ln() / base.ln())
}

inventory::submit! {
    FunctionSpec {
        name: "LOG10",
        category: Category::Math,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(log10_fn),
    }
}

fn log10_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    if n <= 0.0 {
        return Err(ErrorKind::Num);
    }
    ok_number(n.log10())
}
