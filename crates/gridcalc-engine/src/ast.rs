use gridcalc_model::{CellAddr, ErrorKind};
use serde::{Deserialize, Serialize};

/// Byte range within the formula source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            start: self.start.saturating_add(delta),
            end: self.end.saturating_add(delta),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (at {}..{})",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}

impl ParseError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub fn add_offset(self, delta: usize) -> Self {
        Self {
            message: self.message,
            span: self.span.add_offset(delta),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostfixOp {
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Range combine (`:`), tightest-binding infix operator.
    Range,
    Pow,
    Mul,
    Div,
    Add,
    Sub,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// True for the six comparison operators.
    pub fn is_compare(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

/// A possibly sheet-qualified cell reference as written (`A1`, `Sheet2!B3`).
///
/// Sheets are still names at this stage; the evaluator maps them to ids via
/// the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRefExpr {
    pub sheet: Option<String>,
    pub addr: CellAddr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRefExpr {
    pub sheet: Option<String>,
    pub start: CellAddr,
    pub end: CellAddr,
}

/// A bare name (`tax_rate`, `Sheet1!inputs`): a host-defined variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRef {
    pub sheet: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Name as written; case and any `_xlfn.` prefix are preserved here and
    /// normalized at dispatch.
    pub name: String,
    pub args: Vec<Expr>,
}

/// Array constant `{1,2;3,4}`. Rows are guaranteed rectangular by the
/// parser; elements are constant expressions only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayLiteral {
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostfixExpr {
    pub op: PostfixOp,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(ErrorKind),
    CellRef(CellRefExpr),
    RangeRef(RangeRefExpr),
    NameRef(NameRef),
    Array(ArrayLiteral),
    FunctionCall(FunctionCall),
    Unary(UnaryExpr),
    Postfix(PostfixExpr),
    /// `Binary` with [`BinaryOp::Range`] only appears when an operand is not
    /// a plain cell (a name or a reference-returning call); `A1:B2` folds
    /// into [`Expr::RangeRef`] during parsing.
    Binary(BinaryExpr),
    /// Missing expression/argument (empty arg slots like `IF(,1,2)`).
    Missing,
}
