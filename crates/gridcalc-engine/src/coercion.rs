//! Scalar coercions shared by the operators and the builtin library.
//!
//! All three helpers propagate error values as `Err(kind)` so callers can
//! surface the original error instead of a generic coercion failure.

use gridcalc_model::{ErrorKind, Value};

/// Numeric coercion: booleans map to 1/0, blanks to 0, text is parsed
/// after trimming. Text that parses to a non-finite number is rejected
/// rather than smuggling infinities into arithmetic.
pub(crate) fn to_number(value: &Value) -> Result<f64, ErrorKind> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Bool(true) => Ok(1.0),
        Value::Bool(false) => Ok(0.0),
        Value::Blank => Ok(0.0),
        Value::Text(t) => t
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or(ErrorKind::Value),
        Value::Error(e) => Err(*e),
        Value::Array(_) => Err(ErrorKind::Value),
    }
}

/// Boolean coercion: numbers are truthy when non-zero, blanks are false,
/// and only the literal words TRUE/FALSE convert from text.
pub(crate) fn to_bool(value: &Value) -> Result<bool, ErrorKind> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Blank => Ok(false),
        Value::Text(t) => {
            let trimmed = t.trim();
            if trimmed.eq_ignore_ascii_case("TRUE") {
                Ok(true)
            } else if trimmed.eq_ignore_ascii_case("FALSE") {
                Ok(false)
            } else {
                Err(ErrorKind::Value)
            }
        }
        Value::Error(e) => Err(*e),
        Value::Array(_) => Err(ErrorKind::Value),
    }
}

/// Text coercion, matching how a grid renders each scalar.
pub(crate) fn to_text(value: &Value) -> Result<String, ErrorKind> {
    match value {
        Value::Text(t) => Ok(t.clone()),
        Value::Number(n) => Ok(format!("{n}")),
        Value::Bool(true) => Ok("TRUE".to_string()),
        Value::Bool(false) => Ok("FALSE".to_string()),
        Value::Blank => Ok(String::new()),
        Value::Error(e) => Err(*e),
        Value::Array(_) => Err(ErrorKind::Value),
    }
}
