//! The seam between the engine and whatever owns the actual grid data.
//!
//! The engine never stores cell contents. Every reference a formula touches
//! is routed through a [`DataHost`], with the evaluation position's sheet
//! already substituted for bare references, so hosts only ever see concrete
//! sheet ids.

use gridcalc_model::{Array, CellAddr, Reference, SheetId, Value};

/// Read-only view of the host's grid and named variables.
///
/// All methods have defaults so a host only implements what it has: an
/// empty host resolves every cell to blank and every variable to a NAME
/// error.
pub trait DataHost {
    /// Current value of a single cell.
    fn cell_value(&self, sheet: SheetId, addr: CellAddr) -> Value {
        let _ = (sheet, addr);
        Value::Blank
    }

    /// Values of a rectangular block, row-major, `start` and `end`
    /// inclusive and already normalized (`start` is the top-left corner).
    ///
    /// The default builds the block cell-by-cell from [`cell_value`];
    /// hosts with columnar storage will want to override it.
    ///
    /// [`cell_value`]: DataHost::cell_value
    fn range_values(&self, sheet: SheetId, start: CellAddr, end: CellAddr) -> Array {
        let rows = (end.row - start.row + 1) as usize;
        let cols = (end.col - start.col + 1) as usize;
        let mut data = Vec::with_capacity(rows * cols);
        for row in start.row..=end.row {
            for col in start.col..=end.col {
                data.push(self.cell_value(sheet, CellAddr::new(row, col)));
            }
        }
        Array::from_vec(rows, cols, data).unwrap_or_else(|_| Array::scalar(Value::Blank))
    }

    /// Resolve a bare name to a reference, if the host knows it. `sheet`
    /// is the sheet of the formula being evaluated, for hosts with
    /// sheet-scoped names. `None` becomes a NAME error.
    fn variable_ref(&self, name: &str, sheet: SheetId) -> Option<Reference> {
        let _ = (name, sheet);
        None
    }

    /// Map a sheet name from a qualified reference (`Sheet2!A1`) to its
    /// id. `None` becomes a REF error.
    fn sheet_id(&self, name: &str) -> Option<SheetId> {
        let _ = name;
        None
    }
}

/// A host with no data at all. Useful for evaluating pure formulas and as
/// the probe target for function coverage audits.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyHost;

impl DataHost for EmptyHost {}
