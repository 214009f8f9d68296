//! Reference resolution: sheet defaulting, cross-sheet and quoted sheet
//! names, host-defined variables, and the scalar collapse rules for ranges.

mod harness;

use gridcalc_engine::{
    CellAddr, CellRef, ErrorKind, Position, RangeRef, Reference, Value,
};
use harness::{assert_number, GridHost, TestGrid};
use pretty_assertions::assert_eq;

#[test]
fn unqualified_cells_default_to_the_callers_sheet() {
    let mut host = GridHost::new();
    let data = host.sheet("Data");
    host.set("A1", 10.0);
    host.set_on(data, "A1", 20.0);
    let grid = TestGrid::new(host);

    assert_number(&grid.eval("=A1"), 10.0);
    assert_number(&grid.eval_at("=A1", Position::new(data, 0, 0)), 20.0);
}

#[test]
fn sheet_qualifiers_override_the_default() {
    let mut host = GridHost::new();
    let data = host.sheet("Data");
    let report = host.sheet("My Sheet");
    host.set_on(data, "A1", 20.0);
    host.set_on(report, "B2", 7.0);
    let grid = TestGrid::new(host);

    assert_number(&grid.eval("=Data!A1"), 20.0);
    assert_number(&grid.eval("='My Sheet'!B2"), 7.0);
    // Qualifier wins even when the caller sits on another sheet.
    assert_number(&grid.eval_at("=Data!A1", Position::new(report, 5, 5)), 20.0);
}

#[test]
fn unknown_sheets_fault_in_value() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=Nowhere!A1"), Value::Error(ErrorKind::Ref));
    assert_eq!(
        grid.try_eval("=SUM(Nowhere!A1:A3)"),
        Ok(Value::Error(ErrorKind::Ref))
    );
}

#[test]
fn variables_resolve_through_the_host() {
    let mut host = GridHost::new();
    host.set("A1", 0.05);
    host.set("B1", 1.0);
    host.set("B2", 2.0);
    host.set("B3", 3.0);
    host.define("rate", Reference::Cell(CellRef::new(None, CellAddr::new(0, 0))));
    host.define(
        "totals",
        Reference::Range(RangeRef::new(None, CellAddr::new(0, 1), CellAddr::new(2, 1))),
    );
    let grid = TestGrid::new(host);

    assert_number(&grid.eval("=rate*2"), 0.1);
    assert_number(&grid.eval("=SUM(totals)"), 6.0);
    // Lookup is case-insensitive on the way in.
    assert_number(&grid.eval("=RATE*100"), 5.0);
}

#[test]
fn unknown_names_fault_as_name() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=bogus+1"), Value::Error(ErrorKind::Name));
    assert_eq!(grid.eval("=ISNA(bogus)"), Value::Bool(false));
}

#[test]
fn union_variables_refuse_to_collapse() {
    let mut host = GridHost::new();
    host.set("A1", 1.0);
    host.set("C1", 2.0);
    host.define(
        "zones",
        Reference::Union(vec![
            RangeRef::new(None, CellAddr::new(0, 0), CellAddr::new(0, 0)),
            RangeRef::new(None, CellAddr::new(0, 2), CellAddr::new(0, 2)),
        ]),
    );
    let grid = TestGrid::new(host);

    assert_eq!(grid.eval("=zones"), Value::Error(ErrorKind::Value));
    assert_eq!(grid.eval("=SUM(zones)"), Value::Error(ErrorKind::Value));
}

#[test]
fn scalar_collapse_reads_the_written_corner() {
    let mut host = GridHost::new();
    host.set("B1", 1.0);
    host.set("B2", 2.0);
    host.set("B3", 3.0);
    host.set("A1", 9.0);
    let grid = TestGrid::new(host);

    // A single-column range hands back the corner the author wrote first.
    assert_number(&grid.eval("=B1:B3"), 1.0);
    assert_number(&grid.eval("=B3:B1"), 3.0);
    assert_number(&grid.eval("=B2:B2"), 2.0);

    // Anything wider refuses to guess.
    assert_eq!(grid.eval("=A1:B1"), Value::Error(ErrorKind::Value));
    assert_eq!(grid.eval("=A1:B3"), Value::Error(ErrorKind::Value));
}

#[test]
fn range_join_accepts_reference_producing_calls() {
    let mut host = GridHost::new();
    for (row, value) in (0u32..5).zip([1.0, 2.0, 3.0, 4.0, 5.0]) {
        host.set_on(0, &format!("A{}", row + 1), value);
    }
    let grid = TestGrid::new(host);

    assert_number(&grid.eval("=SUM(A1:INDEX(A1:A5,3))"), 6.0);
    assert_number(&grid.eval("=SUM(INDEX(A1:A5,2):INDEX(A1:A5,5))"), 14.0);
}

#[test]
fn reference_slots_swallow_missing_functions_quietly() {
    let grid = TestGrid::empty();

    // A call that only exists to anchor a range never reaches the missing
    // policy: the join simply faults.
    assert_eq!(
        grid.try_eval("=SUM(A1:NOSUCH(1))"),
        Ok(Value::Error(ErrorKind::Ref))
    );
    assert!(grid.engine().missing_functions().is_empty());
}
