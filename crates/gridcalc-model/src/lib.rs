//! `gridcalc-model` defines the data types exchanged between the gridcalc
//! evaluation engine and its embedding hosts.
//!
//! The crate is intentionally behavior-free — values, errors, references,
//! arrays, positions, and their serde representations live here so that:
//! - the evaluation engine (`gridcalc-engine`) can build on a stable core
//! - hosts can implement data callbacks without pulling in the engine
//! - results round-trip across IPC boundaries via `serde`

#![forbid(unsafe_code)]

mod array;
mod refs;
mod value;

pub use array::{Array, ArrayShapeError};
pub use refs::{
    column_index, column_name, A1ParseError, CellAddr, CellRef, Position, RangeRef, Reference,
    SheetId, MAX_COLS, MAX_ROWS,
};
pub use value::{ErrorKind, Value};
