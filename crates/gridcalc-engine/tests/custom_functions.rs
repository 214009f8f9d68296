//! Host-registered functions: new names, builtin overrides, context
//! plumbing for the no-resolve set, and option validation.

mod harness;

use gridcalc_engine::{
    ConfigError, Engine, EngineOptions, ErrorKind, EvalResult, HostFunction, Position, RawArg,
    Reference, Value,
};
use harness::{assert_number, GridHost, TestGrid};

fn double() -> HostFunction {
    HostFunction::value(|args| {
        let Some(arg) = args.first() else {
            return Err(ErrorKind::Value);
        };
        match arg.as_scalar() {
            Value::Number(n) => Ok(Some(EvalResult::Scalar(Value::Number(n * 2.0)))),
            Value::Error(e) => Err(e),
            _ => Err(ErrorKind::Value),
        }
    })
}

#[test]
fn value_functions_join_the_registry() {
    let mut host = GridHost::new();
    host.set("A1", 5.0);
    let grid = TestGrid::with_options(
        host,
        EngineOptions {
            functions: vec![("double".to_owned(), double())],
            ..EngineOptions::default()
        },
    );

    // Registration normalizes names the same way call sites are.
    assert_number(&grid.eval("=DOUBLE(21)"), 42.0);
    assert_number(&grid.eval("=double(3)"), 6.0);
    // Arguments arrive dereferenced, like any value-convention call.
    assert_number(&grid.eval("=DOUBLE(A1)"), 10.0);
    assert_eq!(grid.eval("=DOUBLE(\"x\")"), Value::Error(ErrorKind::Value));
}

#[test]
fn overrides_shadow_builtins_and_own_their_arity() {
    let override_sum = HostFunction::value(|_| {
        Ok(Some(EvalResult::Scalar(Value::Number(42.0))))
    });
    let grid = TestGrid::with_options(
        GridHost::new(),
        EngineOptions {
            functions: vec![("SUM".to_owned(), override_sum)],
            ..EngineOptions::default()
        },
    );

    assert_number(&grid.eval("=SUM(1,2)"), 42.0);
    // Host entries carry no arity bounds; validation moves into the body,
    // so the builtin's one-argument minimum is gone with it.
    assert_number(&grid.eval("=SUM()"), 42.0);
}

#[test]
fn overridden_names_keep_their_category_defaults() {
    let first_arg = || {
        HostFunction::value(|args| {
            let Some(arg) = args.first() else {
                return Err(ErrorKind::Value);
            };
            Ok(Some(EvalResult::Scalar(arg.as_scalar())))
        })
    };
    let grid = TestGrid::with_options(
        GridHost::new(),
        EngineOptions {
            functions: vec![
                ("SUM".to_owned(), first_arg()),
                ("CONCATENATE".to_owned(), first_arg()),
            ],
            ..EngineOptions::default()
        },
    );

    // Math fills omitted slots with zero, text with the empty string;
    // which one a name gets does not change when a host takes it over.
    assert_number(&grid.eval("=SUM(,9)"), 0.0);
    assert_eq!(
        grid.eval("=CONCATENATE(,\"x\")"),
        Value::Text(String::new())
    );
}

#[test]
fn context_functions_complete_the_no_resolve_gaps() {
    // The builtin ROW() defers without an argument; a context override can
    // answer from the caller's position.
    let row_here = HostFunction::raw_with_context(|ctx, args| {
        match args.first() {
            None | Some(RawArg::Missing) => Ok(Some(EvalResult::Scalar(Value::Number(
                f64::from(ctx.position().row + 1),
            )))),
            Some(RawArg::Present(result)) => match result.reference() {
                Some(Reference::Cell(cell)) => Ok(Some(EvalResult::Scalar(Value::Number(
                    f64::from(cell.addr.row + 1),
                )))),
                _ => Err(ErrorKind::Value),
            },
        }
    });
    let grid = TestGrid::with_options(
        GridHost::new(),
        EngineOptions {
            functions: vec![("ROW".to_owned(), row_here)],
            functions_need_context: vec!["ROW".to_owned()],
            ..EngineOptions::default()
        },
    );

    assert_number(&grid.eval_at("=ROW()", Position::new(0, 4, 2)), 5.0);
    assert_number(&grid.eval("=ROW(B7)"), 7.0);
    assert!(grid.engine().missing_functions().is_empty());
}

#[test]
fn context_functions_can_fetch_range_data() {
    // An equality-only SUMIF that really reads the grid, which the raw
    // builtin cannot.
    let sum_equal = HostFunction::raw_with_context(|ctx, args| {
        let Some(RawArg::Present(range)) = args.first() else {
            return Err(ErrorKind::Value);
        };
        let needle = match args.get(1) {
            Some(RawArg::Present(EvalResult::Scalar(v))) => v.clone(),
            _ => return Err(ErrorKind::Value),
        };
        let total = match ctx.dereference(range.clone()) {
            EvalResult::Scalar(v) if v == needle => match v {
                Value::Number(n) => n,
                _ => 0.0,
            },
            EvalResult::Scalar(_) => 0.0,
            EvalResult::Array(block) => block
                .iter()
                .filter(|v| **v == needle)
                .filter_map(|v| match v {
                    Value::Number(n) => Some(*n),
                    _ => None,
                })
                .sum(),
            EvalResult::Reference { .. } => return Err(ErrorKind::Ref),
        };
        Ok(Some(EvalResult::Scalar(Value::Number(total))))
    });

    let mut host = GridHost::new();
    host.set("A1", 5.0);
    host.set("A2", 3.0);
    host.set("A3", 5.0);
    let grid = TestGrid::with_options(
        host,
        EngineOptions {
            functions: vec![("SUMIF".to_owned(), sum_equal)],
            functions_need_context: vec!["SUMIF".to_owned()],
            ..EngineOptions::default()
        },
    );

    assert_number(&grid.eval("=SUMIF(A1:A3,5)"), 10.0);
    assert!(grid.engine().missing_functions().is_empty());
}

#[test]
fn new_names_default_omitted_slots_to_text() {
    let echo = HostFunction::value(|args| {
        let Some(arg) = args.first() else {
            return Err(ErrorKind::Value);
        };
        Ok(Some(EvalResult::Scalar(arg.as_scalar())))
    });
    let grid = TestGrid::with_options(
        GridHost::new(),
        EngineOptions {
            functions: vec![("ECHO".to_owned(), echo)],
            ..EngineOptions::default()
        },
    );

    assert_eq!(grid.eval("=ECHO(,1)"), Value::Text(String::new()));
    assert_eq!(grid.eval("=ECHO(\"hi\")"), Value::from("hi"));
}

#[test]
fn host_results_pass_boundary_normalization() {
    let bad_math = HostFunction::value(|_| {
        Ok(Some(EvalResult::Scalar(Value::Number(f64::NAN))))
    });
    let grid = TestGrid::with_options(
        GridHost::new(),
        EngineOptions {
            functions: vec![("BADMATH".to_owned(), bad_math)],
            ..EngineOptions::default()
        },
    );

    assert_eq!(grid.eval("=BADMATH()"), Value::Error(ErrorKind::Value));
}

#[test]
fn option_validation_rejects_convention_mismatches() {
    let value_fn = || HostFunction::value(|_| Ok(Some(EvalResult::Scalar(Value::Number(0.0)))));
    let raw_fn = || HostFunction::raw(|_| Ok(Some(EvalResult::Scalar(Value::Number(0.0)))));
    let ctx_fn = || {
        HostFunction::raw_with_context(|_, _| Ok(Some(EvalResult::Scalar(Value::Number(0.0)))))
    };

    let build = |options| Engine::with_options(GridHost::new(), options);

    // Value bodies cannot serve a no-resolve name.
    let err = build(EngineOptions {
        functions: vec![("SUMIF".to_owned(), value_fn())],
        ..EngineOptions::default()
    })
    .err();
    assert_eq!(
        err,
        Some(ConfigError::ValueConventionNotApplicable {
            name: "SUMIF".to_owned()
        })
    );

    // Raw bodies only serve no-resolve names.
    let err = build(EngineOptions {
        functions: vec![("TWICE".to_owned(), raw_fn())],
        ..EngineOptions::default()
    })
    .err();
    assert_eq!(
        err,
        Some(ConfigError::RawConventionNotApplicable {
            name: "TWICE".to_owned()
        })
    );

    // A context body must be announced.
    let err = build(EngineOptions {
        functions: vec![("ROW".to_owned(), ctx_fn())],
        ..EngineOptions::default()
    })
    .err();
    assert_eq!(
        err,
        Some(ConfigError::MissingNeedsContext {
            name: "ROW".to_owned()
        })
    );

    // And an announcement must match the body.
    let err = build(EngineOptions {
        functions: vec![("ROWS".to_owned(), raw_fn())],
        functions_need_context: vec!["ROWS".to_owned()],
        ..EngineOptions::default()
    })
    .err();
    assert_eq!(
        err,
        Some(ConfigError::NeedsContextMismatch {
            name: "ROWS".to_owned()
        })
    );

    // Announcements for names never registered are inert.
    assert!(build(EngineOptions {
        functions: vec![("OK".to_owned(), value_fn())],
        functions_need_context: vec!["MYSTERY".to_owned()],
        ..EngineOptions::default()
    })
    .is_ok());
}
