//! Statistical builtins.

use gridcalc_model::{ErrorKind, Value};

use crate::coercion::to_number;
use crate::functions::{
    collect_numbers, for_each_number, ok_number, ArgOrigin, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec, RefData, VARIADIC,
};

inventory::submit! {
    FunctionSpec {
        name: "AVERAGE",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(average),
    }
}

fn average(args: &[FunctionArg]) -> FunctionOutcome {
    let mut total = 0.0;
    let mut count = 0usize;
    for_each_number(args, |n| {
        total += n;
        count += 1;
    })?;
    if count == 0 {
        return Err(ErrorKind::Div0);
    }
    ok_number(total / count as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "COUNT",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(count_fn),
    }
}

/// COUNT never faults: a stored error or an uncoercible literal simply
/// does not count, so the loop here is not the shared aggregator read.
fn count_fn(args: &[FunctionArg]) -> FunctionOutcome {
    fn count_stored<'v>(values: impl Iterator<Item = &'v Value>) -> usize {
        values
            .filter(|v| matches!(v, Value::Number(_)))
            .count()
    }

    let mut count = 0usize;
    for arg in args {
        count += match arg {
            FunctionArg::Omitted(default) => usize::from(to_number(default).is_ok()),
            FunctionArg::Scalar(v, ArgOrigin::Literal) => usize::from(to_number(v).is_ok()),
            FunctionArg::Scalar(v, _) => count_stored(std::iter::once(v)),
            FunctionArg::Array(a, _) => count_stored(a.iter()),
            FunctionArg::ReferenceBearing(RefData::Scalar(v), _) => {
                count_stored(std::iter::once(v))
            }
            FunctionArg::ReferenceBearing(RefData::Array(a), _) => count_stored(a.iter()),
        };
    }
    ok_number(count as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTA",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(counta_fn),
    }
}

fn counta_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut count = 0usize;
    for arg in args {
        // Everything that is not an empty cell counts, errors included.
        count += arg.values().filter(|v| !matches!(v, Value::Blank)).count();
    }
    ok_number(count as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "COUNTBLANK",
        category: Category::Statistical,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(countblank_fn),
    }
}

fn countblank_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let blanks = args[0]
        .values()
        .filter(|v| matches!(v, Value::Blank))
        .count();
    ok_number(blanks as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "MAX",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(max_fn),
    }
}

fn max_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut best: Option<f64> = None;
    for_each_number(args, |n| {
        best = Some(match best {
            Some(b) => b.max(n),
            None => n,
        });
    })?;
    // Nothing numeric to compare is 0, not an error.
    ok_number(best.unwrap_or(0.0))
}

inventory::submit! {
    FunctionSpec {
        name: "MIN",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(min_fn),
    }
}

fn min_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut best: Option<f64> = None;
    for_each_number(args, |n| {
        best = Some(match best {
            Some(b) => b.min(n),
            None => n,
        });
    })?;
    ok_number(best.unwrap_or(0.0))
}

inventory::submit! {
    FunctionSpec {
        name: "MEDIAN",
        category: Category::Statistical,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(median_fn),
    }
}

fn median_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let mut numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return Err(ErrorKind::Num);
    }
    numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = numbers.len() / 2;
    let median = if numbers.len() % 2 == 1 {
        numbers[mid]
    } else {
        (numbers[mid - 1] + numbers[mid]) / 2.0
    };
    ok_number(median)
}
