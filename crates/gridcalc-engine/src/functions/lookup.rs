//! Lookup and reference builtins.
//!
//! Two populations live here. CHOOSE, INDEX, MATCH, and the LOOKUP pair
//! use the value convention with references preserved, which is how
//! INDEX can hand a real cell reference back to the call site. ROW,
//! COLUMN, ROWS, COLUMNS and the conditional aggregators are no-resolve
//! names dispatched with raw arguments; where a raw builtin would need
//! the evaluation context (ROW with no argument, SUMIF over a live
//! range) it answers `Ok(None)` and leaves the rest to the
//! missing-function policy or a host override.

use std::cmp::Ordering;

use gridcalc_model::{Array, CellAddr, CellRef, ErrorKind, Reference, Value};

use crate::coercion::to_bool;
use crate::eval::{excel_order, EvalResult};
use crate::functions::{
    arg_result, int_arg, ok_number, ok_value, opt_number_arg, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec, RawArg, RefData, VARIADIC,
};

inventory::submit! {
    FunctionSpec {
        name: "CHOOSE",
        category: Category::Lookup,
        min_args: 2,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(choose_fn),
    }
}

fn choose_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let index = int_arg(args, 0)?;
    if index < 1 || index as usize >= args.len() {
        return Err(ErrorKind::Value);
    }
    // The picked argument comes back shape intact, reference and all.
    Ok(Some(arg_result(&args[index as usize])))
}

inventory::submit! {
    FunctionSpec {
        name: "INDEX",
        category: Category::Lookup,
        min_args: 2,
        max_args: 3,
        implementation: BuiltinImpl::Value(index_fn),
    }
}

fn index_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let (height, width) = args[0].shape();

    // Vector convention: with two arguments and a one-row source, the
    // index addresses the column.
    let first = int_arg(args, 1)?;
    let (row, col) = match args.get(2) {
        Some(_) => (first, int_arg(args, 2)?),
        None if height == 1 && width > 1 => (1, first),
        None => (first, 1),
    };
    if row < 1 || col < 1 {
        return Err(ErrorKind::Value);
    }
    let (r, c) = ((row - 1) as usize, (col - 1) as usize);
    if r >= height || c >= width {
        return Err(ErrorKind::Ref);
    }

    match &args[0] {
        FunctionArg::ReferenceBearing(data, reference) => {
            let element = match data {
                RefData::Scalar(v) => v.clone(),
                RefData::Array(a) => a.get(r, c).cloned().unwrap_or(Value::Blank),
            };
            let cell = match reference {
                Reference::Cell(cell) => *cell,
                Reference::Range(range) => {
                    let n = range.normalized();
                    CellRef::new(
                        n.sheet,
                        CellAddr::new(n.start.row + r as u32, n.start.col + c as u32),
                    )
                }
                Reference::Union(_) => return Err(ErrorKind::Value),
            };
            // The result is itself a reference, so `A1:INDEX(..)` and
            // chained dereferencing keep working; the element rides
            // along so nobody has to fetch it twice.
            Ok(Some(EvalResult::Reference {
                reference: Reference::Cell(cell),
                value: Some(element),
            }))
        }
        FunctionArg::Array(a, _) => ok_value(a.get(r, c).cloned().unwrap_or(Value::Blank)),
        FunctionArg::Omitted(v) | FunctionArg::Scalar(v, _) => ok_value(v.clone()),
    }
}

/// Lookup scans only compare same-type values; anything else (including
/// error cells) is passed over rather than propagated.
fn same_type(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_))
            | (Value::Text(_), Value::Text(_))
            | (Value::Bool(_), Value::Bool(_))
    )
}

fn candidate_cmp(candidate: &Value, needle: &Value) -> Option<Ordering> {
    if !same_type(candidate, needle) {
        return None;
    }
    excel_order(candidate, needle).ok()
}

/// The value being searched for. A blank reads as zero; an error is the
/// caller's error.
fn lookup_needle(arg: &FunctionArg) -> Result<Value, ErrorKind> {
    match arg.as_scalar() {
        Value::Error(e) => Err(e),
        Value::Blank => Ok(Value::Number(0.0)),
        other => Ok(other),
    }
}

/// The argument's data as one rectangular block; scalars are 1x1.
fn block_of(arg: &FunctionArg) -> Array {
    match arg {
        FunctionArg::Array(a, _) | FunctionArg::ReferenceBearing(RefData::Array(a), _) => {
            a.clone()
        }
        FunctionArg::Omitted(v) | FunctionArg::Scalar(v, _) => Array::scalar(v.clone()),
        FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => Array::scalar(v.clone()),
    }
}

fn last_where<'v>(
    values: impl Iterator<Item = &'v Value>,
    pred: impl Fn(&Value) -> bool,
) -> Option<usize> {
    let mut hit = None;
    for (idx, value) in values.enumerate() {
        if pred(value) {
            hit = Some(idx);
        }
    }
    hit
}

inventory::submit! {
    FunctionSpec {
        name: "MATCH",
        category: Category::Lookup,
        min_args: 2,
        max_args: 3,
        implementation: BuiltinImpl::Value(match_fn),
    }
}

fn match_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let needle = lookup_needle(&args[0])?;
    let (rows, cols) = args[1].shape();
    if rows > 1 && cols > 1 {
        // MATCH wants a vector; a 2D block has no single position.
        return Err(ErrorKind::NA);
    }
    let mode = opt_number_arg(args, 2, 1.0)?;

    let position = if mode == 0.0 {
        // Exact: first hit wins.
        args[1]
            .values()
            .position(|v| candidate_cmp(v, &needle) == Some(Ordering::Equal))
    } else if mode > 0.0 {
        // Ascending data: largest value still <= the needle.
        last_where(args[1].values(), |v| {
            matches!(candidate_cmp(v, &needle), Some(o) if o != Ordering::Greater)
        })
    } else {
        // Descending data: smallest value still >= the needle.
        last_where(args[1].values(), |v| {
            matches!(candidate_cmp(v, &needle), Some(o) if o != Ordering::Less)
        })
    };
    match position {
        Some(idx) => ok_number((idx + 1) as f64),
        None => Err(ErrorKind::NA),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "VLOOKUP",
        category: Category::Lookup,
        min_args: 3,
        max_args: 4,
        implementation: BuiltinImpl::Value(vlookup_fn),
    }
}

fn vlookup_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let needle = lookup_needle(&args[0])?;
    let table = block_of(&args[1]);
    let pick = int_arg(args, 2)?;
    if pick < 1 {
        return Err(ErrorKind::Value);
    }
    let pick = (pick - 1) as usize;
    if pick >= table.cols() {
        return Err(ErrorKind::Ref);
    }
    let approximate = match args.get(3) {
        Some(arg) => to_bool(&arg.as_scalar())?,
        None => true,
    };

    let keys = table.iter_rows().map(|row| &row[0]);
    let hit = if approximate {
        last_where(keys, |v| {
            matches!(candidate_cmp(v, &needle), Some(o) if o != Ordering::Greater)
        })
    } else {
        table
            .iter_rows()
            .position(|row| candidate_cmp(&row[0], &needle) == Some(Ordering::Equal))
    };
    match hit {
        Some(row) => ok_value(table.get(row, pick).cloned().unwrap_or(Value::Blank)),
        None => Err(ErrorKind::NA),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "HLOOKUP",
        category: Category::Lookup,
        min_args: 3,
        max_args: 4,
        implementation: BuiltinImpl::Value(hlookup_fn),
    }
}

fn hlookup_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let needle = lookup_needle(&args[0])?;
    let table = block_of(&args[1]);
    let pick = int_arg(args, 2)?;
    if pick < 1 {
        return Err(ErrorKind::Value);
    }
    let pick = (pick - 1) as usize;
    if pick >= table.rows() {
        return Err(ErrorKind::Ref);
    }
    let approximate = match args.get(3) {
        Some(arg) => to_bool(&arg.as_scalar())?,
        None => true,
    };

    let keys = (0..table.cols()).map(|c| table.get(0, c).unwrap_or(&Value::Blank));
    let hit = if approximate {
        last_where(keys, |v| {
            matches!(candidate_cmp(v, &needle), Some(o) if o != Ordering::Greater)
        })
    } else {
        (0..table.cols()).find(|&c| {
            let key = table.get(0, c).unwrap_or(&Value::Blank);
            candidate_cmp(key, &needle) == Some(Ordering::Equal)
        })
    };
    match hit {
        Some(col) => ok_value(table.get(pick, col).cloned().unwrap_or(Value::Blank)),
        None => Err(ErrorKind::NA),
    }
}

// ---------------------------------------------------------------------
// Raw-convention builtins: reference shape readers.

/// (rows, cols) of one raw argument without resolving anything.
fn extent_of(arg: &RawArg) -> Result<(usize, usize), ErrorKind> {
    match arg {
        RawArg::Missing => Ok((1, 1)),
        RawArg::Present(EvalResult::Reference { reference, .. }) => match reference {
            Reference::Cell(_) => Ok((1, 1)),
            Reference::Range(range) => Ok((range.height() as usize, range.width() as usize)),
            // Multi-area references report their first area.
            Reference::Union(areas) => match areas.first() {
                Some(range) => Ok((range.height() as usize, range.width() as usize)),
                None => Err(ErrorKind::Ref),
            },
        },
        RawArg::Present(EvalResult::Array(a)) => Ok((a.rows(), a.cols())),
        RawArg::Present(EvalResult::Scalar(Value::Error(e))) => Err(*e),
        RawArg::Present(EvalResult::Scalar(_)) => Ok((1, 1)),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "ROWS",
        category: Category::Lookup,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Raw(rows_fn),
    }
}

fn rows_fn(args: &[RawArg]) -> FunctionOutcome {
    let (rows, _) = extent_of(&args[0])?;
    ok_number(rows as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "COLUMNS",
        category: Category::Lookup,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Raw(columns_fn),
    }
}

fn columns_fn(args: &[RawArg]) -> FunctionOutcome {
    let (_, cols) = extent_of(&args[0])?;
    ok_number(cols as f64)
}

/// Top-left anchor of a reference-shaped raw argument.
fn anchor_of(result: &EvalResult) -> Result<CellAddr, ErrorKind> {
    match result {
        EvalResult::Reference { reference, .. } => match reference {
            Reference::Cell(cell) => Ok(cell.addr),
            Reference::Range(range) => Ok(range.normalized().start),
            Reference::Union(areas) => areas
                .first()
                .map(|r| r.normalized().start)
                .ok_or(ErrorKind::Ref),
        },
        EvalResult::Scalar(Value::Error(e)) => Err(*e),
        _ => Err(ErrorKind::Value),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "ROW",
        category: Category::Lookup,
        min_args: 0,
        max_args: 1,
        implementation: BuiltinImpl::Raw(row_fn),
    }
}

fn row_fn(args: &[RawArg]) -> FunctionOutcome {
    match args.first() {
        // The no-argument form needs the caller's position, which raw
        // builtins do not get.
        None | Some(RawArg::Missing) => Ok(None),
        Some(RawArg::Present(result)) => ok_number(f64::from(anchor_of(result)?.row + 1)),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "COLUMN",
        category: Category::Lookup,
        min_args: 0,
        max_args: 1,
        implementation: BuiltinImpl::Raw(column_fn),
    }
}

fn column_fn(args: &[RawArg]) -> FunctionOutcome {
    match args.first() {
        None | Some(RawArg::Missing) => Ok(None),
        Some(RawArg::Present(result)) => ok_number(f64::from(anchor_of(result)?.col + 1)),
    }
}

// ---------------------------------------------------------------------
// Raw-convention builtins: conditional aggregation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
struct Criteria {
    op: CmpOp,
    operand: Value,
}

/// Split a criteria value into operator and operand. Text starting with
/// a comparison operator is an explicit test (`">=10"`, `"<>done"`);
/// everything else is an equality test against the parsed operand.
/// Wildcards are not interpreted.
fn parse_criteria(value: &Value) -> Criteria {
    let Value::Text(text) = value else {
        return Criteria {
            op: CmpOp::Eq,
            operand: value.clone(),
        };
    };
    let (op, rest) = if let Some(rest) = text.strip_prefix(">=") {
        (CmpOp::Ge, rest)
    } else if let Some(rest) = text.strip_prefix("<=") {
        (CmpOp::Le, rest)
    } else if let Some(rest) = text.strip_prefix("<>") {
        (CmpOp::Ne, rest)
    } else if let Some(rest) = text.strip_prefix('>') {
        (CmpOp::Gt, rest)
    } else if let Some(rest) = text.strip_prefix('<') {
        (CmpOp::Lt, rest)
    } else if let Some(rest) = text.strip_prefix('=') {
        (CmpOp::Eq, rest)
    } else {
        (CmpOp::Eq, text.as_str())
    };
    Criteria {
        op,
        operand: parse_operand(rest),
    }
}

/// Criteria operands re-parse the way cell input does: number first,
/// then TRUE/FALSE, then plain text. An empty operand means "blank".
fn parse_operand(text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::Blank;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.is_finite() {
            return Value::Number(n);
        }
    }
    if trimmed.eq_ignore_ascii_case("TRUE") {
        return Value::Bool(true);
    }
    if trimmed.eq_ignore_ascii_case("FALSE") {
        return Value::Bool(false);
    }
    Value::Text(trimmed.to_string())
}

fn criteria_matches(candidate: &Value, criteria: &Criteria) -> bool {
    if matches!(criteria.operand, Value::Blank) {
        // Blank criteria: equality selects empty cells, inequality
        // selects occupied ones.
        let blankish = matches!(candidate, Value::Blank)
            || matches!(candidate, Value::Text(t) if t.is_empty());
        return match criteria.op {
            CmpOp::Eq => blankish,
            CmpOp::Ne => !blankish,
            _ => false,
        };
    }
    if !same_type(candidate, &criteria.operand) {
        // A cell of a different type only satisfies `<>`.
        return criteria.op == CmpOp::Ne;
    }
    match excel_order(candidate, &criteria.operand) {
        Err(_) => false,
        Ok(ordering) => match criteria.op {
            CmpOp::Eq => ordering == Ordering::Equal,
            CmpOp::Ne => ordering != Ordering::Equal,
            CmpOp::Lt => ordering == Ordering::Less,
            CmpOp::Le => ordering != Ordering::Greater,
            CmpOp::Gt => ordering == Ordering::Greater,
            CmpOp::Ge => ordering != Ordering::Less,
        },
    }
}

/// The data behind a raw argument, when it is readable without resolving
/// references. `Ok(None)` is this builtin's "cannot compute here".
fn data_block(arg: &RawArg) -> Result<Option<Array>, ErrorKind> {
    match arg {
        RawArg::Missing => Ok(Some(Array::scalar(Value::Blank))),
        RawArg::Present(EvalResult::Scalar(Value::Error(e))) => Err(*e),
        RawArg::Present(EvalResult::Scalar(v)) => Ok(Some(Array::scalar(v.clone()))),
        RawArg::Present(EvalResult::Array(a)) => Ok(Some(a.clone())),
        RawArg::Present(EvalResult::Reference { .. }) => Ok(None),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "SUMIF",
        category: Category::Math,
        min_args: 2,
        max_args: 3,
        implementation: BuiltinImpl::Raw(sumif_fn),
    }
}

fn sumif_fn(args: &[RawArg]) -> FunctionOutcome {
    match conditional_fold(args)? {
        None => Ok(None),
        Some(fold) => ok_number(fold.total),
    }
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTIF",
        category: Category::Statistical,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Raw(countif_fn),
    }
}

fn countif_fn(args: &[RawArg]) -> FunctionOutcome {
    let Some(range) = data_block(&args[0])? else {
        return Ok(None);
    };
    let Some(criteria) = data_block(&args[1])? else {
        return Ok(None);
    };
    let criteria = parse_criteria(criteria.top_left());
    let count = range
        .iter()
        .filter(|v| criteria_matches(v, &criteria))
        .count();
    ok_number(count as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "AVERAGEIF",
        category: Category::Statistical,
        min_args: 2,
        max_args: 3,
        implementation: BuiltinImpl::Raw(averageif_fn),
    }
}

fn averageif_fn(args: &[RawArg]) -> FunctionOutcome {
    match conditional_fold(args)? {
        None => Ok(None),
        Some(fold) if fold.count == 0 => Err(ErrorKind::Div0),
        Some(fold) => ok_number(fold.total / fold.count as f64),
    }
}

struct ConditionalFold {
    total: f64,
    count: usize,
}

/// Shared SUMIF/AVERAGEIF walk: test column 0's block against the
/// criteria, fold numbers out of the value block (the third argument, or
/// the test block itself). Matched error cells surface as the result.
fn conditional_fold(args: &[RawArg]) -> Result<Option<ConditionalFold>, ErrorKind> {
    let Some(range) = data_block(&args[0])? else {
        return Ok(None);
    };
    let Some(criteria) = data_block(&args[1])? else {
        return Ok(None);
    };
    let criteria = parse_criteria(criteria.top_left());
    let values = match args.get(2) {
        None => range.clone(),
        Some(arg) => {
            let Some(block) = data_block(arg)? else {
                return Ok(None);
            };
            if block.rows() != range.rows() || block.cols() != range.cols() {
                return Err(ErrorKind::Value);
            }
            block
        }
    };

    let mut fold = ConditionalFold {
        total: 0.0,
        count: 0,
    };
    for (candidate, value) in range.iter().zip(values.iter()) {
        if !criteria_matches(candidate, &criteria) {
            continue;
        }
        match value {
            Value::Number(n) => {
                fold.total += n;
                fold.count += 1;
            }
            Value::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(Some(fold))
}
