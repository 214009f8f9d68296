//! The expression tree walker.
//!
//! Evaluation keeps references unresolved as long as possible: a bare
//! `A1` evaluates to a reference-shaped result, and whoever consumes it
//! (an operator, a function argument mapper, the outer boundary) decides
//! when data is actually fetched.

use std::cmp::Ordering;

use gridcalc_model::{
    Array, CellRef, ErrorKind, Position, RangeRef, Reference, SheetId, Value,
};

use crate::ast::{
    ArrayLiteral, BinaryExpr, BinaryOp, CellRefExpr, Expr, NameRef, PostfixOp, RangeRefExpr,
    UnaryOp,
};
use crate::coercion::{to_number, to_text};
use crate::engine::{Engine, EngineError};
use crate::eval::dispatch::CallArgs;
use crate::eval::normalize::collapse_scalar;
use crate::eval::EvalResult;
use crate::functions::FunctionContext;
use crate::host::DataHost;

pub(crate) struct Evaluator<'a, H: DataHost> {
    engine: &'a Engine<H>,
    position: Position,
}

impl<'a, H: DataHost> Evaluator<'a, H> {
    pub(crate) fn new(engine: &'a Engine<H>, position: Position) -> Self {
        Self { engine, position }
    }

    pub(crate) fn engine(&self) -> &'a Engine<H> {
        self.engine
    }

    pub(crate) fn host(&self) -> &'a H {
        self.engine.host()
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    /// Walk one expression. Formula errors come back as values; only
    /// host-level faults use the error channel.
    pub(crate) fn eval(&self, expr: &Expr) -> Result<EvalResult, EngineError> {
        match expr {
            Expr::Number(n) => Ok(EvalResult::Scalar(Value::Number(*n))),
            Expr::Text(t) => Ok(EvalResult::Scalar(Value::Text(t.clone()))),
            Expr::Bool(b) => Ok(EvalResult::Scalar(Value::Bool(*b))),
            Expr::Error(kind) => Ok(EvalResult::error(*kind)),
            Expr::CellRef(cell) => Ok(match self.lower_cell(cell) {
                Ok(reference) => EvalResult::from(Reference::Cell(reference)),
                Err(kind) => EvalResult::error(kind),
            }),
            Expr::RangeRef(range) => Ok(match self.lower_range(range) {
                Ok(reference) => EvalResult::from(Reference::Range(reference)),
                Err(kind) => EvalResult::error(kind),
            }),
            Expr::NameRef(name) => Ok(match self.eval_name(name) {
                Ok(reference) => EvalResult::from(reference),
                Err(kind) => EvalResult::error(kind),
            }),
            Expr::Array(literal) => Ok(eval_array_literal(literal)),
            Expr::FunctionCall(call) => {
                let args = self.eval_call_args(&call.args)?;
                self.call_value(&call.name, args)
            }
            Expr::Unary(unary) => {
                let operand = self.eval_scalar(&unary.expr)?;
                Ok(EvalResult::Scalar(apply_unary(unary.op, operand)))
            }
            Expr::Postfix(postfix) => {
                let operand = self.eval_scalar(&postfix.expr)?;
                Ok(EvalResult::Scalar(match postfix.op {
                    PostfixOp::Percent => match to_number(&operand) {
                        Ok(n) => Value::Number(n / 100.0),
                        Err(kind) => Value::Error(kind),
                    },
                }))
            }
            Expr::Binary(binary) => self.eval_binary(binary),
            // An argument-less slot outside a call; reads as blank.
            Expr::Missing => Ok(EvalResult::Scalar(Value::Blank)),
        }
    }

    /// Evaluate in scalar position: references and arrays collapse the
    /// same way the outer boundary collapses them.
    fn eval_scalar(&self, expr: &Expr) -> Result<Value, EngineError> {
        let result = self.eval(expr)?;
        Ok(collapse_scalar(self, result))
    }

    fn eval_binary(&self, binary: &BinaryExpr) -> Result<EvalResult, EngineError> {
        if binary.op == BinaryOp::Range {
            return self.eval_range_join(binary);
        }
        let lhs = self.eval_scalar(&binary.left)?;
        let rhs = self.eval_scalar(&binary.right)?;
        Ok(EvalResult::Scalar(apply_binary(binary.op, &lhs, &rhs)))
    }

    /// `:` over operands that are not both plain cells. Each side must
    /// denote a reference; the result is their bounding rectangle.
    fn eval_range_join(&self, binary: &BinaryExpr) -> Result<EvalResult, EngineError> {
        let lhs = match self.reference_operand(&binary.left)? {
            Ok(reference) => reference,
            Err(kind) => return Ok(EvalResult::error(kind)),
        };
        let rhs = match self.reference_operand(&binary.right)? {
            Ok(reference) => reference,
            Err(kind) => return Ok(EvalResult::error(kind)),
        };
        Ok(match self.join_references(&lhs, &rhs) {
            Ok(range) => EvalResult::from(Reference::Range(range)),
            Err(kind) => EvalResult::error(kind),
        })
    }

    /// Evaluate an expression for its reference, not its data. Function
    /// calls here use the reference calling convention.
    fn reference_operand(
        &self,
        expr: &Expr,
    ) -> Result<Result<Reference, ErrorKind>, EngineError> {
        match expr {
            Expr::CellRef(cell) => Ok(self.lower_cell(cell).map(Reference::Cell)),
            Expr::RangeRef(range) => Ok(self.lower_range(range).map(Reference::Range)),
            Expr::NameRef(name) => Ok(self.eval_name(name)),
            Expr::FunctionCall(call) => {
                let args = self.eval_call_args(&call.args)?;
                Ok(match self.call_reference(&call.name, args)? {
                    EvalResult::Reference { reference, .. } => Ok(reference),
                    EvalResult::Scalar(Value::Error(kind)) => Err(kind),
                    _ => Err(ErrorKind::Ref),
                })
            }
            Expr::Binary(inner) if inner.op == BinaryOp::Range => {
                Ok(match self.eval_range_join(inner)? {
                    EvalResult::Reference { reference, .. } => Ok(reference),
                    EvalResult::Scalar(Value::Error(kind)) => Err(kind),
                    _ => Err(ErrorKind::Ref),
                })
            }
            _ => Ok(Err(ErrorKind::Ref)),
        }
    }

    fn join_references(
        &self,
        lhs: &Reference,
        rhs: &Reference,
    ) -> Result<RangeRef, ErrorKind> {
        let current = self.position.sheet;
        let l = bounding_box(lhs, current)?;
        let r = bounding_box(rhs, current)?;
        if l.sheet_or(current) != r.sheet_or(current) {
            return Err(ErrorKind::Ref);
        }
        Ok(l.bounding(r))
    }

    fn eval_call_args(&self, args: &[Expr]) -> Result<CallArgs, EngineError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expr::Missing => out.push(None),
                other => out.push(Some(self.eval(other)?)),
            }
        }
        Ok(out)
    }

    /// Map a written sheet qualifier to an id; unknown names are REF
    /// errors.
    fn sheet_lookup(&self, name: Option<&str>) -> Result<Option<SheetId>, ErrorKind> {
        match name {
            None => Ok(None),
            Some(n) => match self.host().sheet_id(n) {
                Some(id) => Ok(Some(id)),
                None => Err(ErrorKind::Ref),
            },
        }
    }

    fn lower_cell(&self, cell: &CellRefExpr) -> Result<CellRef, ErrorKind> {
        Ok(CellRef::new(
            self.sheet_lookup(cell.sheet.as_deref())?,
            cell.addr,
        ))
    }

    fn lower_range(&self, range: &RangeRefExpr) -> Result<RangeRef, ErrorKind> {
        Ok(RangeRef::new(
            self.sheet_lookup(range.sheet.as_deref())?,
            range.start,
            range.end,
        ))
    }

    fn eval_name(&self, name: &NameRef) -> Result<Reference, ErrorKind> {
        let sheet = match self.sheet_lookup(name.sheet.as_deref())? {
            Some(id) => id,
            None => self.position.sheet,
        };
        self.host()
            .variable_ref(&name.name, sheet)
            .ok_or(ErrorKind::Name)
    }
}

impl<H: DataHost> FunctionContext for Evaluator<'_, H> {
    fn position(&self) -> Position {
        self.position
    }

    fn cell_value(&self, cell: &CellRef) -> Value {
        self.resolve_cell(cell)
    }

    fn range_values(&self, range: &RangeRef) -> Array {
        self.resolve_range(range)
    }

    fn variable_ref(&self, name: &str) -> Result<Reference, ErrorKind> {
        self.resolve_variable(name)
    }

    fn dereference(&self, result: EvalResult) -> EvalResult {
        Evaluator::dereference(self, result)
    }
}

/// The smallest single rectangle a reference covers. Union areas must all
/// share a sheet (after defaulting), mirroring the cross-operand rule in
/// `join_references`; an empty union has no rectangle at all.
fn bounding_box(reference: &Reference, current: SheetId) -> Result<RangeRef, ErrorKind> {
    match reference {
        Reference::Cell(cell) => Ok(cell.to_range()),
        Reference::Range(range) => Ok(*range),
        Reference::Union(areas) => {
            let mut iter = areas.iter();
            let mut acc = *iter.next().ok_or(ErrorKind::Ref)?;
            for area in iter {
                if area.sheet_or(current) != acc.sheet_or(current) {
                    return Err(ErrorKind::Ref);
                }
                acc = acc.bounding(*area);
            }
            Ok(acc)
        }
    }
}

/// Array constants hold only literals, so this cannot touch the host.
fn eval_array_literal(literal: &ArrayLiteral) -> EvalResult {
    let mut rows = Vec::with_capacity(literal.rows.len());
    for row in &literal.rows {
        let mut values = Vec::with_capacity(row.len());
        for element in row {
            values.push(match element {
                Expr::Number(n) => Value::Number(*n),
                Expr::Text(t) => Value::Text(t.clone()),
                Expr::Bool(b) => Value::Bool(*b),
                Expr::Error(kind) => Value::Error(*kind),
                // the grammar admits nothing else inside braces
                _ => Value::Error(ErrorKind::Value),
            });
        }
        rows.push(values);
    }
    match Array::from_rows(rows) {
        Ok(array) => EvalResult::Array(array),
        Err(_) => EvalResult::error(ErrorKind::Value),
    }
}

fn apply_unary(op: UnaryOp, operand: Value) -> Value {
    match op {
        // Unary plus passes anything through untouched, text included.
        UnaryOp::Plus => operand,
        UnaryOp::Minus => match to_number(&operand) {
            Ok(n) => Value::Number(-n),
            Err(kind) => Value::Error(kind),
        },
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => compare_values(op, lhs, rhs),
        BinaryOp::Concat => match (to_text(lhs), to_text(rhs)) {
            (Ok(l), Ok(r)) => Value::Text(format!("{l}{r}")),
            (Err(kind), _) | (_, Err(kind)) => Value::Error(kind),
        },
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let (l, r) = match (to_number(lhs), to_number(rhs)) {
                (Ok(l), Ok(r)) => (l, r),
                (Err(kind), _) | (_, Err(kind)) => return Value::Error(kind),
            };
            match op {
                BinaryOp::Add => Value::Number(l + r),
                BinaryOp::Sub => Value::Number(l - r),
                BinaryOp::Mul => Value::Number(l * r),
                BinaryOp::Div => {
                    if r == 0.0 {
                        Value::Error(ErrorKind::Div0)
                    } else {
                        Value::Number(l / r)
                    }
                }
                BinaryOp::Pow => pow_value(l, r),
                _ => unreachable!(),
            }
        }
        // handled before scalar evaluation
        BinaryOp::Range => Value::Error(ErrorKind::Ref),
    }
}

/// `^` with the grid's edge cases: 0^0 and any power that falls out of
/// the reals are NUM errors, 0 to a negative power is a division by zero.
/// POWER goes through the same rules.
pub(crate) fn pow_value(base: f64, exponent: f64) -> Value {
    if base == 0.0 && exponent == 0.0 {
        return Value::Error(ErrorKind::Num);
    }
    if base == 0.0 && exponent < 0.0 {
        return Value::Error(ErrorKind::Div0);
    }
    let p = base.powf(exponent);
    if p.is_nan() {
        Value::Error(ErrorKind::Num)
    } else {
        Value::Number(p)
    }
}

fn compare_values(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    match excel_order(lhs, rhs) {
        Ok(ordering) => {
            let holds = match op {
                BinaryOp::Eq => ordering == Ordering::Equal,
                BinaryOp::Ne => ordering != Ordering::Equal,
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                BinaryOp::Ge => ordering != Ordering::Less,
                _ => return Value::Error(ErrorKind::Value),
            };
            Value::Bool(holds)
        }
        Err(kind) => Value::Error(kind),
    }
}

/// The grid's scalar ordering: numbers sort before text, text before
/// booleans; text compares case-insensitively; a blank takes the zero
/// value of the other side's type. Errors on either side win outright.
pub(crate) fn excel_order(lhs: &Value, rhs: &Value) -> Result<Ordering, ErrorKind> {
    if let Value::Error(e) = lhs {
        return Err(*e);
    }
    if let Value::Error(e) = rhs {
        return Err(*e);
    }
    if matches!(lhs, Value::Array(_)) || matches!(rhs, Value::Array(_)) {
        return Err(ErrorKind::Value);
    }
    Ok(match (lhs, rhs) {
        (Value::Blank, Value::Blank) => Ordering::Equal,
        (Value::Blank, _) => excel_order(&zero_of(rhs), rhs)?,
        (_, Value::Blank) => excel_order(lhs, &zero_of(lhs))?,
        (Value::Number(l), Value::Number(r)) => l.partial_cmp(r).unwrap_or(Ordering::Equal),
        (Value::Text(l), Value::Text(r)) => {
            l.to_ascii_uppercase().cmp(&r.to_ascii_uppercase())
        }
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (l, r) => type_rank(l).cmp(&type_rank(r)),
    })
}

fn zero_of(value: &Value) -> Value {
    match value {
        Value::Number(_) => Value::Number(0.0),
        Value::Text(_) => Value::Text(String::new()),
        Value::Bool(_) => Value::Bool(false),
        // blanks recurse to Equal above; errors and arrays never get here
        other => other.clone(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::Text(_) => 1,
        Value::Bool(_) => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cmp(op: BinaryOp, l: Value, r: Value) -> Value {
        apply_binary(op, &l, &r)
    }

    #[test]
    fn numbers_sort_before_text_before_booleans() {
        assert_eq!(
            cmp(BinaryOp::Lt, Value::Number(9e9), Value::Text("a".into())),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Lt, Value::Text("zzz".into()), Value::Bool(false)),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Gt, Value::Bool(false), Value::Number(1.0)),
            Value::Bool(true)
        );
    }

    #[test]
    fn text_comparison_ignores_case() {
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Text("Apple".into()), Value::Text("APPLE".into())),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Lt, Value::Text("abc".into()), Value::Text("ABD".into())),
            Value::Bool(true)
        );
    }

    #[test]
    fn blank_takes_the_other_sides_zero() {
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Blank, Value::Number(0.0)),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Blank, Value::Text(String::new())),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Blank, Value::Bool(false)),
            Value::Bool(true)
        );
        assert_eq!(
            cmp(BinaryOp::Lt, Value::Blank, Value::Number(1.0)),
            Value::Bool(true)
        );
    }

    #[test]
    fn comparison_propagates_errors() {
        assert_eq!(
            cmp(BinaryOp::Eq, Value::Error(ErrorKind::NA), Value::Number(1.0)),
            Value::Error(ErrorKind::NA)
        );
    }

    #[test]
    fn arithmetic_edge_cases() {
        assert_eq!(
            apply_binary(BinaryOp::Div, &Value::Number(1.0), &Value::Number(0.0)),
            Value::Error(ErrorKind::Div0)
        );
        assert_eq!(pow_value(0.0, 0.0), Value::Error(ErrorKind::Num));
        assert_eq!(pow_value(0.0, -2.0), Value::Error(ErrorKind::Div0));
        assert_eq!(pow_value(-8.0, 1.0 / 3.0), Value::Error(ErrorKind::Num));
        assert_eq!(pow_value(2.0, 10.0), Value::Number(1024.0));
    }

    #[test]
    fn concat_renders_operands() {
        assert_eq!(
            apply_binary(BinaryOp::Concat, &Value::Number(1.5), &Value::Bool(true)),
            Value::Text("1.5TRUE".into())
        );
        assert_eq!(
            apply_binary(BinaryOp::Concat, &Value::Blank, &Value::Text("x".into())),
            Value::Text("x".into())
        );
    }

    #[test]
    fn unary_plus_is_identity() {
        assert_eq!(
            apply_unary(UnaryOp::Plus, Value::Text("abc".into())),
            Value::Text("abc".into())
        );
        assert_eq!(
            apply_unary(UnaryOp::Minus, Value::Text("abc".into())),
            Value::Error(ErrorKind::Value)
        );
        assert_eq!(apply_unary(UnaryOp::Minus, Value::Blank), Value::Number(-0.0));
    }
}
