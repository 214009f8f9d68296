//! Spreadsheet-formula evaluation against host-owned grid data.
//!
//! The engine parses and evaluates one formula at a time, pulling cell
//! and range contents through the [`DataHost`] trait and returning plain
//! [`Value`]s. Formula errors (`#DIV/0!`, `#NAME?`, ...) are ordinary
//! result values; only input-contract violations (empty text, syntax
//! errors, unresolved functions outside diagnostic mode) use the error
//! channel. Function coverage is extensible at construction through
//! [`EngineOptions`].
//!
//! ```
//! use gridcalc_engine::{EmptyHost, Engine, Position, Value};
//!
//! let engine = Engine::new(EmptyHost);
//! let result = engine
//!     .evaluate("=SUM(1,2,3) * 2", Position::new(0, 0, 0), false)
//!     .unwrap();
//! assert_eq!(result, Value::Number(12.0));
//! ```

#![forbid(unsafe_code)]
#![deny(unreachable_patterns)]

mod ast;
mod coercion;
mod engine;
mod eval;
mod functions;
mod host;
mod lexer;
mod parser;

pub use ast::{
    ArrayLiteral, BinaryExpr, BinaryOp, CellRefExpr, Expr, FunctionCall, NameRef, ParseError,
    PostfixExpr, PostfixOp, RangeRefExpr, Span, UnaryExpr, UnaryOp,
};
pub use engine::{ConfigError, Engine, EngineError, EngineOptions, HostFunction};
pub use eval::EvalResult;
pub use functions::{
    ArgOrigin, Category, FunctionArg, FunctionContext, FunctionOutcome, RawArg, RefData,
    NO_RESOLVE_FUNCTIONS,
};
pub use host::{DataHost, EmptyHost};
pub use lexer::{lex, Token, TokenKind, TOKEN_NAMES};
pub use parser::{parse_formula, MAX_CALL_ARGS};

pub use gridcalc_model::{
    column_index, column_name, A1ParseError, Array, ArrayShapeError, CellAddr, CellRef,
    ErrorKind, Position, RangeRef, Reference, SheetId, Value, MAX_COLS, MAX_ROWS,
};
