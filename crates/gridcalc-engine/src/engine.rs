//! Engine construction and the public evaluation surface.

use std::cell::RefCell;
use std::collections::BTreeSet;

use ahash::{AHashMap, AHashSet};
use thiserror::Error;

use gridcalc_model::{Position, Value};

use crate::ast::ParseError;
use crate::eval::{normalize, EvalResult, Evaluator};
use crate::functions::{
    builtins, is_no_resolve, normalize_name, ArgOrigin, BuiltinImpl, Category, FunctionArg,
    FunctionContext, FunctionOutcome, RawArg, VARIADIC,
};
use crate::host::DataHost;
use crate::parser::parse_formula;

/// A host-supplied function in one of the three calling conventions.
///
/// Which conventions a name admits depends on whether the name is on the
/// no-resolve list; [`Engine::with_options`] checks the pairing once, at
/// construction.
pub enum HostFunction {
    /// Ordinary convention: arguments arrive resolved.
    Value(Box<dyn Fn(&[FunctionArg]) -> FunctionOutcome>),
    /// Raw arguments, no dispatcher handle.
    Raw(Box<dyn Fn(&[RawArg]) -> FunctionOutcome>),
    /// Raw arguments plus the dispatcher as implicit first argument; the
    /// name must also be listed in `functions_need_context`.
    RawWithContext(Box<dyn Fn(&dyn FunctionContext, &[RawArg]) -> FunctionOutcome>),
}

impl HostFunction {
    pub fn value(f: impl Fn(&[FunctionArg]) -> FunctionOutcome + 'static) -> Self {
        HostFunction::Value(Box::new(f))
    }

    pub fn raw(f: impl Fn(&[RawArg]) -> FunctionOutcome + 'static) -> Self {
        HostFunction::Raw(Box::new(f))
    }

    pub fn raw_with_context(
        f: impl Fn(&dyn FunctionContext, &[RawArg]) -> FunctionOutcome + 'static,
    ) -> Self {
        HostFunction::RawWithContext(Box::new(f))
    }
}

/// A registered implementation after merging builtins with host entries.
pub(crate) enum FunctionImpl {
    Value(Box<dyn Fn(&[FunctionArg]) -> FunctionOutcome>),
    Raw(Box<dyn Fn(&[RawArg]) -> FunctionOutcome>),
    RawWithContext(Box<dyn Fn(&dyn FunctionContext, &[RawArg]) -> FunctionOutcome>),
}

impl From<HostFunction> for FunctionImpl {
    fn from(function: HostFunction) -> Self {
        match function {
            HostFunction::Value(f) => FunctionImpl::Value(f),
            HostFunction::Raw(f) => FunctionImpl::Raw(f),
            HostFunction::RawWithContext(f) => FunctionImpl::RawWithContext(f),
        }
    }
}

pub(crate) struct RegisteredFunction {
    pub(crate) category: Category,
    pub(crate) min_args: usize,
    pub(crate) max_args: usize,
    pub(crate) implementation: FunctionImpl,
}

/// Construction options.
#[derive(Default)]
pub struct EngineOptions {
    /// Extra functions merged into the registry; host entries win over
    /// builtins on name collision. Names are normalized the same way
    /// call sites are (uppercased, interop prefix stripped).
    pub functions: Vec<(String, HostFunction)>,
    /// Names whose implementations receive the dispatcher as implicit
    /// first argument. Only meaningful for names on the no-resolve list;
    /// other entries are inert.
    pub functions_need_context: Vec<String>,
    /// Diagnostic mode: unresolved functions are logged and neutralized
    /// instead of fatal.
    pub log_missing_functions: bool,
}

/// Rejected option combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("function `{name}` is on the no-resolve list and cannot use the value convention")]
    ValueConventionNotApplicable { name: String },
    #[error("function `{name}` is not on the no-resolve list and cannot use a raw convention")]
    RawConventionNotApplicable { name: String },
    #[error("function `{name}` takes a context but is not listed in `functions_need_context`")]
    MissingNeedsContext { name: String },
    #[error(
        "function `{name}` is listed in `functions_need_context` but its implementation does not take a context"
    )]
    NeedsContextMismatch { name: String },
}

/// Fatal evaluation faults.
///
/// Formula errors (`#DIV/0!` and friends) are not represented here; they
/// come back as ordinary [`Value::Error`] results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Empty input text: an input-contract violation, never a formula
    /// error value.
    #[error("formula text is empty")]
    EmptyFormula,
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
    /// A function neither built in nor host-registered, outside
    /// diagnostic mode.
    #[error("function `{name}` is not implemented")]
    NotImplemented { name: String },
}

/// The formula engine: one host, one merged registry, one diagnostics
/// log.
///
/// Evaluation is single-threaded and synchronous. The diagnostics log
/// uses interior mutability, so an engine is deliberately not `Sync`;
/// callers wanting parallel evaluation use one engine per thread.
pub struct Engine<H> {
    host: H,
    registry: AHashMap<String, RegisteredFunction>,
    log_missing: bool,
    missing: RefCell<BTreeSet<String>>,
}

impl<H: DataHost> Engine<H> {
    /// Builtins only, missing functions fatal.
    pub fn new(host: H) -> Self {
        Self::with_options(host, EngineOptions::default())
            .expect("default options register no host functions")
    }

    /// Merge host functions over the builtins and validate calling
    /// conventions. The registry never changes after this returns.
    pub fn with_options(host: H, options: EngineOptions) -> Result<Self, ConfigError> {
        let needs_context: AHashSet<String> = options
            .functions_need_context
            .iter()
            .map(|name| normalize_name(name))
            .collect();

        let mut registry: AHashMap<String, RegisteredFunction> = AHashMap::new();
        for spec in builtins().values() {
            registry.insert(
                spec.name.to_string(),
                RegisteredFunction {
                    category: spec.category,
                    min_args: spec.min_args,
                    max_args: spec.max_args,
                    implementation: match spec.implementation {
                        BuiltinImpl::Value(f) => FunctionImpl::Value(Box::new(f)),
                        BuiltinImpl::Raw(f) => FunctionImpl::Raw(Box::new(f)),
                    },
                },
            );
        }

        for (written_name, implementation) in options.functions {
            let name = normalize_name(&written_name);
            let no_resolve = is_no_resolve(&name);
            match &implementation {
                HostFunction::Value(_) if no_resolve => {
                    return Err(ConfigError::ValueConventionNotApplicable { name });
                }
                HostFunction::Raw(_) | HostFunction::RawWithContext(_) if !no_resolve => {
                    return Err(ConfigError::RawConventionNotApplicable { name });
                }
                HostFunction::RawWithContext(_) if !needs_context.contains(&name) => {
                    return Err(ConfigError::MissingNeedsContext { name });
                }
                HostFunction::Raw(_) if needs_context.contains(&name) => {
                    return Err(ConfigError::NeedsContextMismatch { name });
                }
                _ => {}
            }

            // Category follows the name: overriding a builtin keeps its
            // category, new names are custom.
            let category = registry
                .get(&name)
                .map(|f| f.category)
                .unwrap_or(Category::Custom);
            registry.insert(
                name,
                RegisteredFunction {
                    category,
                    min_args: 0,
                    max_args: VARIADIC,
                    implementation: implementation.into(),
                },
            );
        }

        Ok(Self {
            host,
            registry,
            log_missing: options.log_missing_functions,
            missing: RefCell::new(BTreeSet::new()),
        })
    }

    /// Evaluate `text` as a formula at `position`. A leading `=` is
    /// accepted and ignored.
    ///
    /// `allow_array` selects the result policy: with it set, array and
    /// whole-range results come back intact; without it, the result must
    /// collapse to one scalar.
    ///
    /// Formula errors come back as `Ok(Value::Error(..))`. The `Err`
    /// channel carries only fatal faults: empty input, syntax errors,
    /// and unresolved functions outside diagnostic mode.
    pub fn evaluate(
        &self,
        text: &str,
        position: Position,
        allow_array: bool,
    ) -> Result<Value, EngineError> {
        if text.is_empty() {
            return Err(EngineError::EmptyFormula);
        }
        let expr = parse_formula(text)?;
        let evaluator = Evaluator::new(self, position);
        let raw = evaluator.eval(&expr)?;
        Ok(normalize(&evaluator, raw, allow_array))
    }

    /// Audit which registered names actually work: every entry is probed
    /// with a fixed dummy argument list and counts as supported when it
    /// returns a result or an expected domain failure. Purely
    /// diagnostic; never part of evaluation.
    pub fn supported_functions(&self) -> Vec<String> {
        let evaluator = Evaluator::new(self, Position::new(0, 0, 0));
        let value_probe: Vec<FunctionArg> = (0..3)
            .map(|_| FunctionArg::Scalar(Value::Number(1.0), ArgOrigin::Literal))
            .collect();
        let raw_probe: Vec<RawArg> = (0..3)
            .map(|_| RawArg::Present(EvalResult::Scalar(Value::Number(1.0))))
            .collect();

        let mut supported: Vec<String> = self
            .registry
            .iter()
            .filter(|(_, function)| {
                let outcome = match &function.implementation {
                    FunctionImpl::Value(body) => body(&value_probe),
                    FunctionImpl::Raw(body) => body(&raw_probe),
                    FunctionImpl::RawWithContext(body) => body(&evaluator, &raw_probe),
                };
                !matches!(outcome, Ok(None))
            })
            .map(|(name, _)| name.clone())
            .collect();
        supported.sort_unstable();
        supported
    }

    /// Names diagnostic mode has recorded so far, sorted.
    pub fn missing_functions(&self) -> Vec<String> {
        self.missing.borrow().iter().cloned().collect()
    }

    pub(crate) fn function(&self, normalized: &str) -> Option<&RegisteredFunction> {
        self.registry.get(normalized)
    }

    pub(crate) fn host(&self) -> &H {
        &self.host
    }

    pub(crate) fn log_missing(&self) -> bool {
        self.log_missing
    }

    pub(crate) fn record_missing(&self, name: &str) {
        self.missing.borrow_mut().insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::EmptyHost;

    fn value_stub() -> HostFunction {
        HostFunction::value(|_| Ok(Some(EvalResult::Scalar(Value::Number(1.0)))))
    }

    fn raw_stub() -> HostFunction {
        HostFunction::raw(|_| Ok(Some(EvalResult::Scalar(Value::Number(1.0)))))
    }

    fn ctx_stub() -> HostFunction {
        HostFunction::raw_with_context(|_, _| Ok(Some(EvalResult::Scalar(Value::Number(1.0)))))
    }

    fn build(options: EngineOptions) -> Result<Engine<EmptyHost>, ConfigError> {
        Engine::with_options(EmptyHost, options)
    }

    #[test]
    fn value_convention_rejected_on_no_resolve_names() {
        let err = build(EngineOptions {
            functions: vec![("row".into(), value_stub())],
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            ConfigError::ValueConventionNotApplicable { name: "ROW".into() }
        );
    }

    #[test]
    fn raw_conventions_rejected_on_ordinary_names() {
        let err = build(EngineOptions {
            functions: vec![("SUM".into(), raw_stub())],
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            ConfigError::RawConventionNotApplicable { name: "SUM".into() }
        );
    }

    #[test]
    fn context_implementations_must_be_declared() {
        let err = build(EngineOptions {
            functions: vec![("SUMIF".into(), ctx_stub())],
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            ConfigError::MissingNeedsContext {
                name: "SUMIF".into()
            }
        );

        let err = build(EngineOptions {
            functions: vec![("SUMIF".into(), raw_stub())],
            functions_need_context: vec!["sumif".into()],
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err,
            ConfigError::NeedsContextMismatch {
                name: "SUMIF".into()
            }
        );
    }

    #[test]
    fn needs_context_entries_off_the_list_are_inert() {
        let engine = build(EngineOptions {
            functions: vec![("DOUBLE".into(), value_stub())],
            functions_need_context: vec!["DOUBLE".into()],
            ..Default::default()
        });
        assert!(engine.is_ok());
    }

    #[test]
    fn diagnostics_start_empty() {
        let engine = Engine::new(EmptyHost);
        assert!(engine.missing_functions().is_empty());
        assert!(!engine.log_missing());
    }
}
