//! Text builtins.
//!
//! Slicing and counting operate on extended grapheme clusters, so a
//! flag emoji or a combining sequence is one "character" to LEFT, MID,
//! and LEN alike.

use gridcalc_model::{ErrorKind, Value};
use unicode_segmentation::UnicodeSegmentation;

use crate::coercion::to_text;
use crate::functions::{
    int_arg, ok_number, ok_value, text_arg, BuiltinImpl, Category, FunctionArg, FunctionOutcome,
    FunctionSpec, VARIADIC,
};

/// Result size cap, in grapheme clusters, matching the grid's cell text
/// limit.
const MAX_TEXT_LEN: usize = 32_767;

fn slice_graphemes(text: &str, skip: usize, take: usize) -> String {
    text.graphemes(true).skip(skip).take(take).collect()
}

fn grapheme_count(text: &str) -> usize {
    text.graphemes(true).count()
}

inventory::submit! {
    FunctionSpec {
        name: "CONCATENATE",
        category: Category::Text,
        min_args: 1,
        max_args: VARIADIC,
        implementation: BuiltinImpl::Value(concatenate),
    }
}

fn concatenate(args: &[FunctionArg]) -> FunctionOutcome {
    let mut out = String::new();
    for arg in args {
        out.push_str(&to_text(&arg.as_scalar())?);
    }
    ok_value(Value::Text(out))
}

inventory::submit! {
    FunctionSpec {
        name: "LEFT",
        category: Category::Text,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(left_fn),
    }
}

fn left_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let text = text_arg(args, 0)?;
    let n = match args.get(1) {
        Some(_) => int_arg(args, 1)?,
        None => 1,
    };
    if n < 0 {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Text(slice_graphemes(&text, 0, n as usize)))
}

inventory::submit! {
    FunctionSpec {
        name: "RIGHT",
        category: Category::Text,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(right_fn),
    }
}

fn right_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let text = text_arg(args, 0)?;
    let n = match args.get(1) {
        Some(_) => int_arg(args, 1)?,
        None => 1,
    };
    if n < 0 {
        return Err(ErrorKind::Value);
    }
    let len = grapheme_count(&text);
    let skip = len.saturating_sub(n as usize);
    ok_value(Value::Text(slice_graphemes(&text, skip, len)))
}

inventory::submit! {
    FunctionSpec {
        name: "MID",
        category: Category::Text,
        min_args: 3,
        max_args: 3,
        implementation: BuiltinImpl::Value(mid_fn),
    }
}

fn mid_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let text = text_arg(args, 0)?;
    let start = int_arg(args, 1)?;
    let count = int_arg(args, 2)?;
    if start < 1 || count < 0 {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Text(slice_graphemes(
        &text,
        (start - 1) as usize,
        count as usize,
    )))
}

inventory::submit! {
    FunctionSpec {
        name: "LEN",
        category: Category::Text,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(len_fn),
    }
}

fn len_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(grapheme_count(&text_arg(args, 0)?) as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "LOWER",
        category: Category::Text,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(lower_fn),
    }
}

fn lower_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Text(text_arg(args, 0)?.to_lowercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "UPPER",
        category: Category::Text,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(upper_fn),
    }
}

fn upper_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_value(Value::Text(text_arg(args, 0)?.to_uppercase()))
}

inventory::submit! {
    FunctionSpec {
        name: "TRIM",
        category: Category::Text,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(trim_fn),
    }
}

fn trim_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let text = text_arg(args, 0)?;
    // Only the ASCII space collapses; tabs and non-breaking spaces stay.
    let trimmed = text
        .split(' ')
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    ok_value(Value::Text(trimmed))
}

inventory::submit! {
    FunctionSpec {
        name: "REPT",
        category: Category::Text,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(rept_fn),
    }
}

fn rept_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let text = text_arg(args, 0)?;
    let count = int_arg(args, 1)?;
    if count < 0 {
        return Err(ErrorKind::Value);
    }
    let count = count as usize;
    if grapheme_count(&text).saturating_mul(count) > MAX_TEXT_LEN {
        return Err(ErrorKind::Value);
    }
    ok_value(Value::Text(text.repeat(count)))
}

inventory::submit! {
    FunctionSpec {
        name: "EXACT",
        category: Category::Text,
        min_args: 2,
        max_args: 2,
        implementation: BuiltinImpl::Value(exact_fn),
    }
}

fn exact_fn(args: &[FunctionArg]) -> FunctionOutcome {
    // Case-sensitive, unlike `=` comparison.
    ok_value(Value::Bool(text_arg(args, 0)? == text_arg(args, 1)?))
}
