//! Reference resolution: the only place evaluation talks to the host.
//!
//! Sheet defaulting happens here, once. Every reference leaves this module
//! with a concrete sheet, and whatever the host returns is taken as ground
//! truth with no validation or caching.

use gridcalc_model::{Array, CellRef, ErrorKind, RangeRef, Reference, Value};

use crate::eval::evaluator::Evaluator;
use crate::eval::EvalResult;
use crate::host::DataHost;

impl<H: DataHost> Evaluator<'_, H> {
    /// Single-cell read, with the evaluation position's sheet substituted
    /// when the reference carries none.
    pub(crate) fn resolve_cell(&self, cell: &CellRef) -> Value {
        let sheet = cell.sheet_or(self.position().sheet);
        self.host().cell_value(sheet, cell.addr)
    }

    /// Block read; same sheet-default rule. The corners are normalized so
    /// the host always sees top-left/bottom-right.
    pub(crate) fn resolve_range(&self, range: &RangeRef) -> Array {
        let range = range.normalized();
        let sheet = range.sheet_or(self.position().sheet);
        self.host().range_values(sheet, range.start, range.end)
    }

    /// Named-variable lookup. A name the host does not resolve to a
    /// location is a NAME error, not a blank.
    pub(crate) fn resolve_variable(&self, name: &str) -> Result<Reference, ErrorKind> {
        self.host()
            .variable_ref(name, self.position().sheet)
            .ok_or(ErrorKind::Name)
    }

    /// Turn a reference-shaped result into data. Cell references resolve
    /// to their scalar (reusing an attached value when a function already
    /// computed one), ranges resolve to a block, and anything that is not
    /// a reference passes through unchanged, so dereferencing twice is
    /// the same as dereferencing once.
    ///
    /// A union cannot be expressed as one rectangular block, so it
    /// dereferences to a VALUE error.
    pub(crate) fn dereference(&self, result: EvalResult) -> EvalResult {
        match result {
            EvalResult::Reference { reference, value } => match reference {
                Reference::Cell(cell) => match value {
                    Some(v) => EvalResult::Scalar(v),
                    None => EvalResult::Scalar(self.resolve_cell(&cell)),
                },
                Reference::Range(range) => EvalResult::Array(self.resolve_range(&range)),
                Reference::Union(_) => EvalResult::error(ErrorKind::Value),
            },
            plain => plain,
        }
    }
}
