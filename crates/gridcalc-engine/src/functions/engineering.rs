//! Engineering builtins: number-base conversions and bitwise operators.
//!
//! The base conversions speak the grid's fixed-width dialect: ten digits
//! maximum, with the all-digits-wide form read and written as two's
//! complement (10 bits binary, 30 bits octal, 40 bits hex).

use gridcalc_model::{ErrorKind, Value};

use crate::coercion::to_text;
use crate::functions::{
    int_arg, number_arg, ok_number, ok_value, opt_number_arg, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec,
};

/// Digit-string input for the *2DEC conversions. Numbers render through
/// the usual text coercion so `BIN2DEC(1010)` and `BIN2DEC("1010")`
/// agree; a fractional part survives rendering and fails digit
/// validation downstream.
fn digits_arg(args: &[FunctionArg], idx: usize) -> Result<String, ErrorKind> {
    match args[idx].as_scalar() {
        Value::Bool(_) => Err(ErrorKind::Value),
        Value::Blank => Ok("0".to_string()),
        other => Ok(to_text(&other)?.trim().to_string()),
    }
}

fn parse_radix(digits: &str, radix: u32, max_digits: usize) -> Result<u64, ErrorKind> {
    if digits.is_empty()
        || digits.len() > max_digits
        || !digits.chars().all(|c| c.is_digit(radix))
    {
        return Err(ErrorKind::Num);
    }
    u64::from_str_radix(digits, radix).map_err(|_| ErrorKind::Num)
}

fn twos_complement(value: u64, bits: u32) -> f64 {
    if value >= 1 << (bits - 1) {
        (value as i64 - (1i64 << bits)) as f64
    } else {
        value as f64
    }
}

inventory::submit! {
    FunctionSpec {
        name: "BIN2DEC",
        category: Category::Engineering,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(bin2dec_fn),
    }
}

fn bin2dec_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let value = parse_radix(&digits_arg(args, 0)?, 2, 10)?;
    ok_number(twos_complement(value, 10))
}

inventory::submit! {
    FunctionSpec {
        name: "OCT2DEC",
        category: Category::Engineering,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(oct2dec_fn),
    }
}

fn oct2dec_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let value = parse_radix(&digits_arg(args, 0)?, 8, 10)?;
    ok_number(twos_complement(value, 30))
}

inventory::submit! {
    FunctionSpec {
        name: "HEX2DEC",
        category: Category::Engineering,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(hex2dec_fn),
    }
}

fn hex2dec_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let value = parse_radix(&digits_arg(args, 0)?, 16, 10)?;
    ok_number(twos_complement(value, 40))
}

#[derive(Clone, Copy)]
enum Radix {
    Bin,
    Oct,
    Hex,
}

impl Radix {
    fn bits(self) -> u32 {
        match self {
            Radix::Bin => 10,
            Radix::Oct => 30,
            Radix::Hex => 40,
        }
    }

    fn render(self, value: u64) -> String {
        match self {
            Radix::Bin => format!("{value:b}"),
            Radix::Oct => format!("{value:o}"),
            Radix::Hex => format!("{value:X}"),
        }
    }
}

fn dec_to_radix(args: &[FunctionArg], radix: Radix) -> FunctionOutcome {
    let n = int_arg(args, 0)?;
    let bits = radix.bits();
    let low = -(1i64 << (bits - 1));
    let high = (1i64 << (bits - 1)) - 1;
    if n < low || n > high {
        return Err(ErrorKind::Num);
    }

    if n < 0 {
        // Negatives always come out ten digits wide; places is ignored.
        let encoded = (n + (1i64 << bits)) as u64;
        let rendered = radix.render(encoded);
        return ok_value(Value::Text(format!(
            "{:0>width$}",
            rendered,
            width = 10
        )));
    }

    let rendered = radix.render(n as u64);
    match args.get(1) {
        None => ok_value(Value::Text(rendered)),
        Some(_) => {
            let places = int_arg(args, 1)?;
            if places < 1 || places > 10 || (places as usize) < rendered.len() {
                return Err(ErrorKind::Num);
            }
            ok_value(Value::Text(format!(
                "{:0>width$}",
                rendered,
                width = places as usize
            )))
        }
    }
}

inventory::submit! {
    FunctionSpec {
        name: "DEC2BIN",
        category: Category::Engineering,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(dec2bin_fn),
    }
}

fn dec2bin_fn(args: &[FunctionArg]) -> FunctionOutcome {
    dec_to_radix(args, Radix::Bin)
}

inventory::submit! {
    FunctionSpec {
        name: "DEC2OCT",
        category: Category::Engineering,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(dec2oct_fn),
    }
}

fn dec2oct_fn(args: &[FunctionArg]) -> FunctionOutcome {
    dec_to_radix(args, Radix::Oct)
}

inventory::submit! {
    FunctionSpec {
        name: "DEC2HEX",
        category: Category::Engineering,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(dec2hex_fn),
    }
}

fn dec2hex_fn(args: &[FunctionArg]) -> FunctionOutcome {
    dec_to_radix(args, Radix::Hex)
}

/// Bitwise operands must be non-negative integers below 2^48.
fn bit_operand(args: &[FunctionArg], idx: usize) -> Result<u64, ErrorKind> {
    let n = number_arg(args, idx)?;
    if n < 0.0 || n != n.trunc() || n >= (1u64 << 48) as f64 {
        return Err(ErrorKind::Num);
    }
    Ok(n as u64)
}

inventory::submit! {
    FunctionSpec {
        name: "BITAND",
        category: Category::Engineering,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(bitand_fn),
    }
}

fn bitand_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number((bit_operand(args, 0)? & bit_operand(args, 1)?) as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "BITOR",
        category: Category::Engineering,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(bitor_fn),
    }
}

fn bitor_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number((bit_operand(args, 0)? | bit_operand(args, 1)?) as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "BITXOR",
        category: Category::Engineering,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(bitxor_fn),
    }
}

fn bitxor_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number((bit_operand(args, 0)? ^ bit_operand(args, 1)?) as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "DELTA",
        category: Category::Engineering,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(delta_fn),
    }
}

fn delta_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let a = number_arg(args, 0)?;
    let b = opt_number_arg(args, 1, 0.0)?;
    ok_number(if a == b { 1.0 } else { 0.0 })
}

inventory::submit! {
    FunctionSpec {
        name: "GESTEP",
        category: Category::Engineering,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(gestep_fn),
    }
}

fn gestep_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let n = number_arg(args, 0)?;
    let step = opt_number_arg(args, 1, 0.0)?;
    ok_number(if n >= step { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalResult;
    use crate::functions::ArgOrigin;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> FunctionArg {
        FunctionArg::Scalar(Value::Number(n), ArgOrigin::Literal)
    }

    fn text(s: &str) -> FunctionArg {
        FunctionArg::Scalar(Value::Text(s.into()), ArgOrigin::Literal)
    }

    fn result_number(outcome: FunctionOutcome) -> f64 {
        match outcome {
            Ok(Some(EvalResult::Scalar(Value::Number(n)))) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn result_text(outcome: FunctionOutcome) -> String {
        match outcome {
            Ok(Some(EvalResult::Scalar(Value::Text(s)))) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn ten_digit_forms_read_as_twos_complement() {
        assert_eq!(result_number(bin2dec_fn(&[text("1111111111")])), -1.0);
        assert_eq!(result_number(bin2dec_fn(&[num(101.0)])), 5.0);
        assert_eq!(result_number(oct2dec_fn(&[text("7777777777")])), -1.0);
        assert_eq!(result_number(hex2dec_fn(&[text("FFFFFFFFFF")])), -1.0);
        assert_eq!(result_number(hex2dec_fn(&[text("ff")])), 255.0);
        assert_eq!(bin2dec_fn(&[text("10102")]), Err(ErrorKind::Num));
        assert_eq!(bin2dec_fn(&[num(101.5)]), Err(ErrorKind::Num));
    }

    #[test]
    fn negative_conversions_are_ten_digits_wide() {
        assert_eq!(result_text(dec2bin_fn(&[num(-1.0)])), "1111111111");
        assert_eq!(result_text(dec2hex_fn(&[num(-54.0)])), "FFFFFFFFCA");
        assert_eq!(result_text(dec2oct_fn(&[num(-100.0)])), "7777777634");
    }

    #[test]
    fn places_pads_but_never_truncates() {
        assert_eq!(result_text(dec2bin_fn(&[num(9.0), num(4.0)])), "1001");
        assert_eq!(result_text(dec2hex_fn(&[num(255.0), num(4.0)])), "00FF");
        assert_eq!(dec2bin_fn(&[num(9.0), num(3.0)]), Err(ErrorKind::Num));
        assert_eq!(dec2bin_fn(&[num(512.0)]), Err(ErrorKind::Num));
    }

    #[test]
    fn bit_operands_are_bounded_whole_numbers() {
        assert_eq!(result_number(bitand_fn(&[num(13.0), num(25.0)])), 9.0);
        assert_eq!(result_number(bitor_fn(&[num(23.0), num(10.0)])), 31.0);
        assert_eq!(result_number(bitxor_fn(&[num(5.0), num(3.0)])), 6.0);
        assert_eq!(bitand_fn(&[num(-1.0), num(2.0)]), Err(ErrorKind::Num));
        assert_eq!(bitand_fn(&[num(1.5), num(2.0)]), Err(ErrorKind::Num));
        assert_eq!(
            bitand_fn(&[num(2f64.powi(48)), num(2.0)]),
            Err(ErrorKind::Num)
        );
    }

    #[test]
    fn delta_and_gestep_default_to_zero() {
        assert_eq!(result_number(delta_fn(&[num(0.0)])), 1.0);
        assert_eq!(result_number(delta_fn(&[num(2.0), num(2.0)])), 1.0);
        assert_eq!(result_number(delta_fn(&[num(2.0), num(3.0)])), 0.0);
        assert_eq!(result_number(gestep_fn(&[num(-0.5)])), 0.0);
        assert_eq!(result_number(gestep_fn(&[num(5.0), num(4.0)])), 1.0);
    }
}
