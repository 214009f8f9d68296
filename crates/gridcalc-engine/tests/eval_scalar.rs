//! Scalar evaluation through the full pipeline: operator precedence, text
//! concatenation, the comparison ordering, blank coercion, and the numeric
//! fault scrubbing applied to every result.

mod harness;

use gridcalc_engine::{ErrorKind, Value};
use harness::{assert_number, GridHost, TestGrid};
use pretty_assertions::assert_eq;

#[test]
fn arithmetic_precedence_and_associativity() {
    let grid = TestGrid::empty();

    assert_number(&grid.eval("=1+2*3"), 7.0);
    assert_number(&grid.eval("=(1+2)*3"), 9.0);
    assert_number(&grid.eval("=2*3^2"), 18.0);
    assert_number(&grid.eval("=10-4-3"), 3.0);

    // Exponentiation associates to the right; unary minus binds tighter.
    assert_number(&grid.eval("=2^3^2"), 512.0);
    assert_number(&grid.eval("=-2^2"), 4.0);
    assert_number(&grid.eval("=-(2^2)"), -4.0);
}

#[test]
fn percent_is_a_tight_postfix() {
    let grid = TestGrid::empty();

    assert_number(&grid.eval("=10%"), 0.1);
    assert_number(&grid.eval("=200%%"), 0.02);
    assert_number(&grid.eval("=50%*3"), 1.5);
    // Percent applies before the power does.
    assert_number(&grid.eval("=2^200%"), 4.0);
}

#[test]
fn concatenation_renders_both_sides() {
    let mut host = GridHost::new();
    host.set("A1", 1.5);
    let grid = TestGrid::new(host);

    assert_eq!(grid.eval("=\"a\"&A1"), Value::from("a1.5"));
    assert_eq!(grid.eval("=1&2"), Value::from("12"));
    assert_eq!(grid.eval("=\"x\"&TRUE"), Value::from("xTRUE"));
    // A blank operand renders as the empty string.
    assert_eq!(grid.eval("=Z9&\"b\""), Value::from("b"));
}

#[test]
fn comparisons_rank_types_and_fold_text_case() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=1<2"), Value::Bool(true));
    assert_eq!(grid.eval("=2>=2"), Value::Bool(true));
    assert_eq!(grid.eval("=2<>2"), Value::Bool(false));
    assert_eq!(grid.eval("=\"abc\"=\"ABC\""), Value::Bool(true));
    assert_eq!(grid.eval("=\"a\"<\"b\""), Value::Bool(true));

    // Mixed types never coerce: numbers sort below text, text below logicals.
    assert_eq!(grid.eval("=1<\"a\""), Value::Bool(true));
    assert_eq!(grid.eval("=TRUE>100"), Value::Bool(true));
    assert_eq!(grid.eval("=\"TRUE\"=TRUE"), Value::Bool(false));
}

#[test]
fn blanks_compare_as_the_other_sides_zero() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=A1=0"), Value::Bool(true));
    assert_eq!(grid.eval("=A1=\"\""), Value::Bool(true));
    assert_eq!(grid.eval("=A1<1"), Value::Bool(true));
    assert_eq!(grid.eval("=A1=FALSE"), Value::Bool(true));
    assert_eq!(grid.eval("=A1=B1"), Value::Bool(true));
}

#[test]
fn arithmetic_coerces_text_and_logicals() {
    let grid = TestGrid::empty();

    assert_number(&grid.eval("=\"5\"+2"), 7.0);
    assert_number(&grid.eval("=\" 3 \"*2"), 6.0);
    assert_number(&grid.eval("=TRUE+1"), 2.0);
    assert_number(&grid.eval("=-\"8\""), -8.0);
    assert_eq!(grid.eval("=\"x\"+1"), Value::Error(ErrorKind::Value));
}

#[test]
fn numeric_faults_surface_as_in_value_errors() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=1/0"), Value::Error(ErrorKind::Div0));
    assert_eq!(grid.eval("=0^0"), Value::Error(ErrorKind::Num));
    assert_eq!(grid.eval("=0^-1"), Value::Error(ErrorKind::Div0));

    // Overflow and domain faults are scrubbed out of the float domain.
    assert_eq!(grid.eval("=2^1024"), Value::Error(ErrorKind::Num));
    assert_eq!(grid.eval("=ASIN(2)"), Value::Error(ErrorKind::Value));
    assert_number(&grid.eval("=2^0.5"), std::f64::consts::SQRT_2);
}

#[test]
fn negative_zero_never_escapes() {
    let grid = TestGrid::empty();

    for formula in ["=-0", "=0*-1", "=-A1"] {
        match grid.eval(formula) {
            Value::Number(n) => {
                assert_eq!(n, 0.0, "{formula}");
                assert!(n.is_sign_positive(), "{formula} kept the sign bit");
            }
            other => panic!("{formula} produced {other:?}"),
        }
    }
}

#[test]
fn error_literals_and_faults_propagate() {
    let grid = TestGrid::empty();

    assert_eq!(grid.eval("=#REF!+1"), Value::Error(ErrorKind::Ref));
    assert_eq!(grid.eval("=#N/A"), Value::Error(ErrorKind::NA));
    // A fault inside the condition outranks the branch values.
    assert_eq!(grid.eval("=IF(1/0=1,2,3)"), Value::Error(ErrorKind::Div0));
    assert_number(&grid.eval("=IFERROR(1/0,5)"), 5.0);
    assert_eq!(grid.eval("=ISERROR(1/0)"), Value::Bool(true));
}

#[test]
fn operator_operands_collapse_arrays_to_the_top_left() {
    let grid = TestGrid::empty();

    assert_number(&grid.eval("={1,2;3,4}+10"), 11.0);
    assert_eq!(grid.eval("={1,2}>0"), Value::Bool(true));
    // The whole-formula result collapses the same way in scalar mode.
    assert_number(&grid.eval("={1,2;3,4}"), 1.0);
}
