//! Function dispatch: argument mapping, calling conventions, and the
//! missing-function policy.
//!
//! Two conventions exist. A **value call** resolves every argument before
//! invocation and boundary-normalizes the result. A **reference call**
//! keeps reference structure intact and hands the result back raw, for
//! call sites that need a reference out of the function (`A1:INDEX(..)`).
//! Names on the no-resolve list skip argument resolution in both.

use smallvec::SmallVec;

use gridcalc_model::{ErrorKind, Reference, Value};

use crate::engine::{EngineError, FunctionImpl, RegisteredFunction};
use crate::eval::evaluator::Evaluator;
use crate::eval::normalize::normalize;
use crate::eval::EvalResult;
use crate::functions::{
    is_no_resolve, normalize_name, ArgOrigin, FunctionArg, FunctionOutcome, RawArg, RefData,
};
use crate::host::DataHost;

/// Arguments as the tree walk hands them over: one entry per written
/// slot, `None` for an empty slot.
pub(crate) type CallArgs = Vec<Option<EvalResult>>;

impl<H: DataHost> Evaluator<'_, H> {
    /// Ordinary call position.
    pub(crate) fn call_value(
        &self,
        name: &str,
        args: CallArgs,
    ) -> Result<EvalResult, EngineError> {
        let normalized = normalize_name(name);

        if is_no_resolve(&normalized) {
            return self.call_no_resolve(&normalized, args);
        }

        let Some(function) = self.engine().function(&normalized) else {
            return self.missing_function(&normalized);
        };
        if let Some(fault) = arity_fault(function, args.len()) {
            return Ok(fault);
        }

        let default = function.category.null_default();
        let keep_refs = function.category.preserves_references();
        let mapped: SmallVec<[FunctionArg; 4]> = args
            .into_iter()
            .map(|arg| self.map_argument(arg, &default, keep_refs))
            .collect();

        let outcome = match &function.implementation {
            FunctionImpl::Value(body) => body(&mapped),
            FunctionImpl::Raw(_) | FunctionImpl::RawWithContext(_) => {
                unreachable!("construction pins raw conventions to the no-resolve list")
            }
        };
        self.finish_value_call(&normalized, outcome)
    }

    /// Reference call position: the call site wants a reference out of
    /// the function, so nothing is normalized on the way back and a
    /// registry miss yields a quiet neutral zero. Reference-producing
    /// calls are probed speculatively; failing loudly here would turn
    /// exploration into faults.
    pub(crate) fn call_reference(
        &self,
        name: &str,
        args: CallArgs,
    ) -> Result<EvalResult, EngineError> {
        let normalized = normalize_name(name);
        let Some(function) = self.engine().function(&normalized) else {
            return Ok(EvalResult::neutral_zero());
        };
        if let Some(fault) = arity_fault(function, args.len()) {
            return Ok(fault);
        }

        let outcome = match &function.implementation {
            FunctionImpl::Value(body) => {
                // Reference position always keeps the original reference
                // next to the data, whatever the category says.
                let default = function.category.null_default();
                let mapped: SmallVec<[FunctionArg; 4]> = args
                    .into_iter()
                    .map(|arg| self.map_argument(arg, &default, true))
                    .collect();
                body(&mapped)
            }
            FunctionImpl::Raw(body) => body(&raw_args(args)),
            FunctionImpl::RawWithContext(body) => body(self, &raw_args(args)),
        };
        match outcome {
            Err(kind) => Ok(EvalResult::error(kind)),
            Ok(None) => Ok(EvalResult::neutral_zero()),
            Ok(Some(result)) => Ok(result),
        }
    }

    /// Value-position dispatch for no-resolve names: arguments stay raw,
    /// and only host implementations registered as needing context get
    /// the dispatcher handle.
    fn call_no_resolve(
        &self,
        normalized: &str,
        args: CallArgs,
    ) -> Result<EvalResult, EngineError> {
        let Some(function) = self.engine().function(normalized) else {
            return self.missing_function(normalized);
        };
        if let Some(fault) = arity_fault(function, args.len()) {
            return Ok(fault);
        }

        let raw = raw_args(args);
        let outcome = match &function.implementation {
            FunctionImpl::Raw(body) => body(&raw),
            FunctionImpl::RawWithContext(body) => body(self, &raw),
            FunctionImpl::Value(_) => {
                unreachable!("construction rejects the value convention on no-resolve names")
            }
        };
        self.finish_value_call(normalized, outcome)
    }

    /// One argument slot, value convention. Empty slots become `Omitted`
    /// carrying the category default; everything else dereferences, with
    /// either the original reference kept (`keep_reference`) or its kind
    /// recorded as the argument's origin.
    fn map_argument(
        &self,
        arg: Option<EvalResult>,
        default: &Value,
        keep_reference: bool,
    ) -> FunctionArg {
        let Some(result) = arg else {
            return FunctionArg::Omitted(default.clone());
        };

        if keep_reference {
            if let EvalResult::Reference { reference, .. } = &result {
                let reference = reference.clone();
                let data = match self.dereference(result) {
                    EvalResult::Scalar(v) => RefData::Scalar(v),
                    EvalResult::Array(a) => RefData::Array(a),
                    EvalResult::Reference { .. } => {
                        RefData::Scalar(Value::Error(ErrorKind::Value))
                    }
                };
                return FunctionArg::ReferenceBearing(data, reference);
            }
        }

        let origin = match &result {
            EvalResult::Reference {
                reference: Reference::Cell(_),
                ..
            } => ArgOrigin::CellRef,
            EvalResult::Reference { .. } => ArgOrigin::RangeRef,
            _ => ArgOrigin::Literal,
        };
        match self.dereference(result) {
            EvalResult::Scalar(v) => FunctionArg::Scalar(v, origin),
            EvalResult::Array(a) => FunctionArg::Array(a, origin),
            EvalResult::Reference { .. } => {
                FunctionArg::Scalar(Value::Error(ErrorKind::Value), origin)
            }
        }
    }

    /// Steps shared by every value-position invocation: expected domain
    /// failures become the call's value, an absent result routes through
    /// the missing-function policy, and a present result is
    /// boundary-normalized (array-aware) exactly once.
    fn finish_value_call(
        &self,
        normalized: &str,
        outcome: FunctionOutcome,
    ) -> Result<EvalResult, EngineError> {
        match outcome {
            Err(kind) => Ok(EvalResult::error(kind)),
            Ok(None) => self.missing_function(normalized),
            Ok(Some(result)) => Ok(EvalResult::from(normalize(self, result, true))),
        }
    }

    /// Diagnostic mode logs the name once and substitutes a neutral
    /// zero; otherwise an unresolved function is fatal.
    fn missing_function(&self, normalized: &str) -> Result<EvalResult, EngineError> {
        if self.engine().log_missing() {
            self.engine().record_missing(normalized);
            Ok(EvalResult::neutral_zero())
        } else {
            Err(EngineError::NotImplemented {
                name: normalized.to_string(),
            })
        }
    }
}

fn raw_args(args: CallArgs) -> SmallVec<[RawArg; 4]> {
    args.into_iter()
        .map(|arg| match arg {
            Some(result) => RawArg::Present(result),
            None => RawArg::Missing,
        })
        .collect()
}

fn arity_fault(function: &RegisteredFunction, given: usize) -> Option<EvalResult> {
    if given < function.min_args || given > function.max_args {
        Some(EvalResult::error(ErrorKind::Value))
    } else {
        None
    }
}
