//! The function library: builtin tables, calling conventions, and the
//! argument model shared with host-registered functions.
//!
//! Builtins self-register through [`inventory`], one `submit!` per
//! function, grouped into category modules. The engine merges this table
//! with host overrides at construction; nothing here mutates after that.

mod date_time;
mod engineering;
mod information;
mod logical;
mod lookup;
mod math;
mod statistical;
mod text;
mod trig;

use std::sync::OnceLock;

use ahash::AHashMap;
use gridcalc_model::{Array, CellRef, ErrorKind, Position, RangeRef, Reference, Value};

use crate::coercion::{to_bool, to_number, to_text};
use crate::eval::EvalResult;

/// Interop prefix carried by imported formulas for post-2007 function
/// names (`_xlfn.STDEV.P`).
const XLFN_PREFIX: &str = "_XLFN.";

/// Names that are dispatched with raw, unresolved arguments: functions
/// that read reference shape (row/column extents) or aggregate
/// conditionally over a range. This list is part of the dispatch
/// contract, not a tuning knob.
pub const NO_RESOLVE_FUNCTIONS: [&str; 7] = [
    "ROW",
    "COLUMN",
    "ROWS",
    "COLUMNS",
    "SUMIF",
    "COUNTIF",
    "AVERAGEIF",
];

/// Registry key mapping: uppercase, interop prefix stripped.
pub(crate) fn normalize_name(name: &str) -> String {
    let upper = name.to_ascii_uppercase();
    match upper.strip_prefix(XLFN_PREFIX) {
        Some(rest) => rest.to_string(),
        None => upper,
    }
}

/// Whether a normalized name is dispatched raw.
pub(crate) fn is_no_resolve(normalized: &str) -> bool {
    NO_RESOLVE_FUNCTIONS.contains(&normalized)
}

/// Function categories. The category decides what an empty argument slot
/// reads as and whether arguments keep their reference attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Math,
    Trig,
    Text,
    Logical,
    Engineering,
    Lookup,
    Information,
    Statistical,
    DateTime,
    /// Host-registered names the builtin tables do not know.
    Custom,
}

impl Category {
    /// The value an explicitly empty argument slot is presented as.
    ///
    /// Numeric-leaning categories read the slot as zero; text,
    /// information, and custom functions read it as empty text. Grid
    /// functions genuinely disagree here, so the split is per category,
    /// not global.
    pub fn null_default(self) -> Value {
        match self {
            Category::Math
            | Category::Trig
            | Category::Logical
            | Category::Engineering
            | Category::Lookup
            | Category::Statistical
            | Category::DateTime => Value::Number(0.0),
            Category::Text | Category::Information | Category::Custom => {
                Value::Text(String::new())
            }
        }
    }

    /// Whether arguments arrive as [`FunctionArg::ReferenceBearing`],
    /// keeping the original reference next to the resolved data.
    pub fn preserves_references(self) -> bool {
        matches!(self, Category::Lookup)
    }
}

/// Where an argument expression came from. Carried on resolved arguments
/// so functions whose meaning depends on it (aggregators, the IS*
/// predicates) can tell a literal from a value read out of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgOrigin {
    /// A literal or computed expression.
    Literal,
    /// A single-cell reference, already dereferenced.
    CellRef,
    /// A range or union reference, already dereferenced.
    RangeRef,
}

/// The resolved payload carried alongside a preserved reference.
#[derive(Debug, Clone, PartialEq)]
pub enum RefData {
    Scalar(Value),
    Array(Array),
}

/// An argument as a value-convention function body sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    /// The slot was empty (`IF(,1,2)`). Carries the category's null
    /// default so bodies can read it like any other scalar.
    Omitted(Value),
    Scalar(Value, ArgOrigin),
    Array(Array, ArgOrigin),
    /// Resolved data plus the reference it came from. Only
    /// reference-preserving functions see this variant.
    ReferenceBearing(RefData, Reference),
}

impl FunctionArg {
    /// The argument as one value. Arrays collapse to their top-left
    /// element, matching scalar-context reads everywhere else.
    pub fn as_scalar(&self) -> Value {
        match self {
            FunctionArg::Omitted(v) | FunctionArg::Scalar(v, _) => v.clone(),
            FunctionArg::Array(a, _) => a.top_left().clone(),
            FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => v.clone(),
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => a.top_left().clone(),
        }
    }

    /// Every value the argument carries, row-major for arrays.
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            FunctionArg::Omitted(v) | FunctionArg::Scalar(v, _) => Box::new(std::iter::once(v)),
            FunctionArg::Array(a, _) => Box::new(a.iter()),
            FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => Box::new(std::iter::once(v)),
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => Box::new(a.iter()),
        }
    }

    /// (rows, cols) of the carried data; scalars are 1x1.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            FunctionArg::Omitted(_) | FunctionArg::Scalar(..) => (1, 1),
            FunctionArg::Array(a, _) => (a.rows(), a.cols()),
            FunctionArg::ReferenceBearing(RefData::Scalar(_), _) => (1, 1),
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => (a.rows(), a.cols()),
        }
    }

    pub fn origin(&self) -> ArgOrigin {
        match self {
            FunctionArg::Omitted(_) => ArgOrigin::Literal,
            FunctionArg::Scalar(_, origin) | FunctionArg::Array(_, origin) => *origin,
            FunctionArg::ReferenceBearing(_, reference) => match reference {
                Reference::Cell(_) => ArgOrigin::CellRef,
                _ => ArgOrigin::RangeRef,
            },
        }
    }

    pub fn is_omitted(&self) -> bool {
        matches!(self, FunctionArg::Omitted(_))
    }

    /// The preserved reference, for reference-bearing arguments.
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            FunctionArg::ReferenceBearing(_, reference) => Some(reference),
            _ => None,
        }
    }
}

/// An argument as a raw-convention function body sees it: unresolved,
/// reference shape intact.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArg {
    /// The slot was empty.
    Missing,
    Present(EvalResult),
}

impl RawArg {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawArg::Missing)
    }

    /// The reference this argument carries, if it evaluated to one.
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            RawArg::Present(result) => result.reference(),
            RawArg::Missing => None,
        }
    }
}

/// What a function body hands back to the dispatcher.
///
/// `Err(kind)` is an expected domain failure and becomes the call's
/// value. `Ok(None)` means "not actually implemented for these inputs"
/// and is routed through the missing-function policy. `Ok(Some(..))` is a
/// real result and passes through boundary normalization.
pub type FunctionOutcome = Result<Option<EvalResult>, ErrorKind>;

/// The dispatcher surface handed to raw-convention host functions
/// registered as needing context.
pub trait FunctionContext {
    /// The position of the formula being evaluated.
    fn position(&self) -> Position;
    /// Resolve one cell, substituting the position's sheet when bare.
    fn cell_value(&self, cell: &CellRef) -> Value;
    /// Resolve a block, substituting the position's sheet when bare.
    fn range_values(&self, range: &RangeRef) -> Array;
    /// Resolve a variable name via the host; unknown names are NAME
    /// errors.
    fn variable_ref(&self, name: &str) -> Result<Reference, ErrorKind>;
    /// Dereference a reference-shaped result. Anything else passes
    /// through unchanged, so the operation is idempotent.
    fn dereference(&self, result: EvalResult) -> EvalResult;
}

/// Calling convention of a builtin body.
#[derive(Clone, Copy)]
pub(crate) enum BuiltinImpl {
    /// Ordinary convention: arguments arrive resolved per category rules.
    Value(fn(&[FunctionArg]) -> FunctionOutcome),
    /// No-resolve convention: arguments arrive raw. Builtins get no
    /// context; a raw builtin that cannot proceed without one returns
    /// `Ok(None)` and lets the missing-function policy decide.
    Raw(fn(&[RawArg]) -> FunctionOutcome),
}

/// Arity cap for variadic builtins, matching the parser's call cap.
pub(crate) const VARIADIC: usize = crate::parser::MAX_CALL_ARGS;

/// One builtin registration.
pub(crate) struct FunctionSpec {
    /// Uppercase name, the registry key.
    pub name: &'static str,
    pub category: Category,
    pub min_args: usize,
    pub max_args: usize,
    pub implementation: BuiltinImpl,
}

inventory::collect!(FunctionSpec);

/// The builtin table, keyed by normalized name. Built once, on first use.
pub(crate) fn builtins() -> &'static AHashMap<&'static str, &'static FunctionSpec> {
    static REGISTRY: OnceLock<AHashMap<&'static str, &'static FunctionSpec>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = AHashMap::new();
        for spec in inventory::iter::<FunctionSpec> {
            let previous = map.insert(spec.name, spec);
            debug_assert!(previous.is_none(), "duplicate builtin {}", spec.name);
        }
        map
    })
}

// Shared outcome constructors and argument readers for builtin bodies.
// Arity is checked by the dispatcher, so indexed reads below `min_args`
// cannot miss.

pub(crate) fn ok_number(n: f64) -> FunctionOutcome {
    Ok(Some(EvalResult::Scalar(Value::Number(n))))
}

pub(crate) fn ok_value(value: Value) -> FunctionOutcome {
    Ok(Some(EvalResult::from(value)))
}

/// Hand an argument back as a result, shape intact: arrays stay arrays
/// and reference-bearing arguments become reference-shaped results again
/// (with scalar data re-attached). This is how CHOOSE and friends return
/// one of their inputs without flattening it.
pub(crate) fn arg_result(arg: &FunctionArg) -> EvalResult {
    match arg {
        FunctionArg::Omitted(v) | FunctionArg::Scalar(v, _) => EvalResult::Scalar(v.clone()),
        FunctionArg::Array(a, _) => EvalResult::Array(a.clone()),
        FunctionArg::ReferenceBearing(data, reference) => EvalResult::Reference {
            reference: reference.clone(),
            value: match data {
                RefData::Scalar(v) => Some(v.clone()),
                RefData::Array(_) => None,
            },
        },
    }
}

pub(crate) fn number_arg(args: &[FunctionArg], idx: usize) -> Result<f64, ErrorKind> {
    to_number(&args[idx].as_scalar())
}

/// Optional trailing argument with the function's own default. An
/// explicitly empty slot still reads as its carried null default, not
/// `default`; only a slot that is absent altogether falls back.
pub(crate) fn opt_number_arg(
    args: &[FunctionArg],
    idx: usize,
    default: f64,
) -> Result<f64, ErrorKind> {
    match args.get(idx) {
        Some(arg) => to_number(&arg.as_scalar()),
        None => Ok(default),
    }
}

/// Integer read used for counts and indexes; fractional parts truncate
/// toward zero, as grid functions do.
pub(crate) fn int_arg(args: &[FunctionArg], idx: usize) -> Result<i64, ErrorKind> {
    Ok(number_arg(args, idx)?.trunc() as i64)
}

pub(crate) fn text_arg(args: &[FunctionArg], idx: usize) -> Result<String, ErrorKind> {
    to_text(&args[idx].as_scalar())
}

pub(crate) fn bool_arg(args: &[FunctionArg], idx: usize) -> Result<bool, ErrorKind> {
    to_bool(&args[idx].as_scalar())
}

/// Visit every numeric contribution of an aggregator argument list.
///
/// Literal scalars coerce the way operators do, so `SUM("2",TRUE)` is 3.
/// Values read out of references, and elements of array constants, only
/// contribute when they are already numbers; text, logicals, and blanks
/// there are skipped. Error values propagate from either side.
pub(crate) fn for_each_number(
    args: &[FunctionArg],
    mut visit: impl FnMut(f64),
) -> Result<(), ErrorKind> {
    fn visit_stored(values: &mut dyn Iterator<Item = &Value>, visit: &mut dyn FnMut(f64)) -> Result<(), ErrorKind> {
        for value in values {
            match value {
                Value::Number(n) => visit(*n),
                Value::Error(e) => return Err(*e),
                _ => {}
            }
        }
        Ok(())
    }

    for arg in args {
        match arg {
            FunctionArg::Omitted(default) => visit(to_number(default)?),
            FunctionArg::Scalar(v, ArgOrigin::Literal) => visit(to_number(v)?),
            FunctionArg::Scalar(v, _) => visit_stored(&mut std::iter::once(v), &mut visit)?,
            FunctionArg::Array(a, _) => visit_stored(&mut a.iter(), &mut visit)?,
            FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => {
                visit_stored(&mut std::iter::once(v), &mut visit)?
            }
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => {
                visit_stored(&mut a.iter(), &mut visit)?
            }
        }
    }
    Ok(())
}

/// Collect aggregator numbers into a buffer, for bodies that need more
/// than one pass (MEDIAN).
pub(crate) fn collect_numbers(args: &[FunctionArg]) -> Result<Vec<f64>, ErrorKind> {
    let mut numbers = Vec::new();
    for_each_number(args, |n| numbers.push(n))?;
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn name_normalization_strips_interop_prefix() {
        assert_eq!(normalize_name("sum"), "SUM");
        assert_eq!(normalize_name("_xlfn.STDEV.P"), "STDEV.P");
        assert_eq!(normalize_name("_XLFN.concat"), "CONCAT");
        assert_eq!(normalize_name("A_XLFN.B"), "A_XLFN.B");
    }

    #[test]
    fn no_resolve_list_is_checked_post_normalization() {
        assert!(is_no_resolve(&normalize_name("row")));
        assert!(is_no_resolve(&normalize_name("_xlfn.SUMIF")));
        assert!(!is_no_resolve("SUM"));
    }

    #[test]
    fn null_defaults_split_by_category() {
        assert_eq!(Category::Math.null_default(), Value::Number(0.0));
        assert_eq!(Category::Lookup.null_default(), Value::Number(0.0));
        assert_eq!(Category::DateTime.null_default(), Value::Number(0.0));
        assert_eq!(Category::Text.null_default(), Value::Text(String::new()));
        assert_eq!(Category::Information.null_default(), Value::Text(String::new()));
        assert_eq!(Category::Custom.null_default(), Value::Text(String::new()));
        assert!(Category::Lookup.preserves_references());
        assert!(!Category::Math.preserves_references());
    }

    #[test]
    fn aggregator_reads_skip_stored_text_but_coerce_literals() {
        let args = vec![
            FunctionArg::Scalar(Value::Text("2".into()), ArgOrigin::Literal),
            FunctionArg::Scalar(Value::Text("3".into()), ArgOrigin::CellRef),
            FunctionArg::Scalar(Value::Bool(true), ArgOrigin::Literal),
            FunctionArg::Scalar(Value::Blank, ArgOrigin::CellRef),
            FunctionArg::Omitted(Value::Number(0.0)),
        ];
        assert_eq!(collect_numbers(&args), Ok(vec![2.0, 1.0, 0.0]));
    }

    #[test]
    fn aggregator_propagates_stored_errors() {
        let args = vec![FunctionArg::Scalar(
            Value::Error(ErrorKind::Div0),
            ArgOrigin::CellRef,
        )];
        assert_eq!(collect_numbers(&args), Err(ErrorKind::Div0));
    }

    #[test]
    fn builtin_table_has_no_duplicate_names() {
        let table = builtins();
        assert!(table.contains_key("SUM"));
        assert!(table.contains_key("IF"));
        assert_eq!(
            table.len(),
            inventory::iter::<FunctionSpec>.into_iter().count()
        );
    }
}
