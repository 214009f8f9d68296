//! Formula evaluation.
//!
//! [`Evaluator`] walks a parsed expression tree against a
//! [`DataHost`](crate::DataHost), producing an [`EvalResult`] that stays
//! reference-shaped until the evaluation boundary. Scalar collapse and the
//! array-mode policy are applied exactly once, on the way out, by the
//! normalizer.

mod dispatch;
mod evaluator;
mod normalize;
mod resolver;

pub(crate) use evaluator::{excel_order, pow_value, Evaluator};
pub(crate) use normalize::normalize;

use gridcalc_model::{Array, ErrorKind, Reference, Value};

/// What evaluating a subexpression produced.
///
/// Formula errors are not a separate variant: they travel as an ordinary
/// [`Value::Error`] in `Scalar` position. Only host-level faults (empty
/// input, syntax, a fatally unresolved function) use the `Result` error
/// channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    /// A single value.
    Scalar(Value),
    /// A 2D block, from an array literal, a dereferenced range, or an
    /// array-returning function.
    Array(Array),
    /// A reference that has not been dereferenced yet. Functions that
    /// return references may attach the value they already computed so
    /// scalar collapse does not ask the host twice.
    Reference {
        reference: Reference,
        value: Option<Value>,
    },
}

impl EvalResult {
    /// The placeholder substituted for unresolved functions in diagnostic
    /// mode.
    pub(crate) fn neutral_zero() -> Self {
        EvalResult::Scalar(Value::Number(0.0))
    }

    pub(crate) fn error(kind: ErrorKind) -> Self {
        EvalResult::Scalar(Value::Error(kind))
    }

    /// The reference this result carries, if it is reference-shaped.
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            EvalResult::Reference { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

impl From<Value> for EvalResult {
    /// Wraps a bare value, unnesting [`Value::Array`] into the dedicated
    /// variant so downstream matches never see a nested array scalar.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(array) => EvalResult::Array(array),
            other => EvalResult::Scalar(other),
        }
    }
}

impl From<Reference> for EvalResult {
    fn from(reference: Reference) -> Self {
        EvalResult::Reference {
            reference,
            value: None,
        }
    }
}
