//! The result normalizer: the one boundary where every value leaving a
//! function call or a whole evaluation is shape-checked and scrubbed.

use gridcalc_model::{CellRef, ErrorKind, Reference, Value};

use crate::eval::evaluator::Evaluator;
use crate::eval::EvalResult;
use crate::host::DataHost;

/// Scrub one computed number: NaN is a VALUE error (the computation
/// produced no number), infinities are NUM errors (magnitude overflow),
/// and negative zero folds into positive zero.
pub(crate) fn sanitize_number(n: f64) -> Value {
    if n.is_nan() {
        Value::Error(ErrorKind::Value)
    } else if n.is_infinite() {
        Value::Error(ErrorKind::Num)
    } else if n == 0.0 {
        Value::Number(0.0)
    } else {
        Value::Number(n)
    }
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::Number(n) => sanitize_number(n),
        other => other,
    }
}

/// Apply the boundary rules to a raw result.
///
/// With `allow_array` set, reference-shaped results are dereferenced and
/// blocks pass through whole. In ordinary scalar context the result must
/// collapse to one value; anything that cannot is a VALUE error.
pub(crate) fn normalize<H: DataHost>(
    evaluator: &Evaluator<'_, H>,
    result: EvalResult,
    allow_array: bool,
) -> Value {
    if allow_array {
        match evaluator.dereference(result) {
            EvalResult::Scalar(v) => sanitize_value(v),
            EvalResult::Array(a) => Value::Array(a),
            // dereference leaves no reference standing
            EvalResult::Reference { .. } => Value::Error(ErrorKind::Value),
        }
    } else {
        collapse_scalar(evaluator, result)
    }
}

/// Scalar-context collapse: single cells read their value, single-column
/// ranges read the corner cell as written, plain arrays take their
/// top-left element, and any other structured shape (multi-column range,
/// union) is a VALUE error rather than silently occupying a scalar slot.
pub(crate) fn collapse_scalar<H: DataHost>(
    evaluator: &Evaluator<'_, H>,
    result: EvalResult,
) -> Value {
    match result {
        EvalResult::Scalar(v) => sanitize_value(v),
        EvalResult::Array(a) => sanitize_value(a.top_left().clone()),
        EvalResult::Reference { reference, value } => match reference {
            Reference::Cell(cell) => match value {
                Some(v) => sanitize_value(v),
                None => sanitize_value(evaluator.resolve_cell(&cell)),
            },
            Reference::Range(range) if range.is_single_column() => {
                // The corner as written, not the normalized one: no
                // implicit intersection, no row alignment.
                let cell = CellRef {
                    sheet: range.sheet,
                    addr: range.start,
                };
                sanitize_value(evaluator.resolve_cell(&cell))
            }
            Reference::Range(_) | Reference::Union(_) => Value::Error(ErrorKind::Value),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_scrubbing() {
        assert_eq!(sanitize_number(f64::NAN), Value::Error(ErrorKind::Value));
        assert_eq!(sanitize_number(f64::INFINITY), Value::Error(ErrorKind::Num));
        assert_eq!(
            sanitize_number(f64::NEG_INFINITY),
            Value::Error(ErrorKind::Num)
        );
        assert_eq!(sanitize_number(1.5), Value::Number(1.5));

        let zero = sanitize_number(-0.0);
        assert_eq!(zero, Value::Number(0.0));
        match zero {
            Value::Number(n) => assert!(n.is_sign_positive()),
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn errors_pass_unchanged() {
        assert_eq!(
            sanitize_value(Value::Error(ErrorKind::Div0)),
            Value::Error(ErrorKind::Div0)
        );
        assert_eq!(sanitize_value(Value::Text("NaN".into())), Value::Text("NaN".into()));
    }
}
