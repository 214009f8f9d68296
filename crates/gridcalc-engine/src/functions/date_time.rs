//! Date-time builtins.
//!
//! Dates are day serials counted from 1899-12-30, the base that keeps
//! modern dates aligned with classic grid numbering. The 1900 leap-year
//! bug is not emulated, so serials in January and February 1900 sit one
//! below their historical values.

use chrono::{Datelike, Duration, Local, NaiveDate, Timelike};
use gridcalc_model::ErrorKind;

use crate::functions::{
    int_arg, number_arg, ok_number, opt_number_arg, BuiltinImpl, Category, FunctionArg,
    FunctionOutcome, FunctionSpec,
};

/// Serial for 9999-12-31, the last representable date.
const MAX_SERIAL: i64 = 2_958_465;

fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("fixed epoch date")
}

/// Read an argument as a day serial and turn it into a calendar date.
fn serial_date(args: &[FunctionArg], idx: usize) -> Result<NaiveDate, ErrorKind> {
    let serial = number_arg(args, idx)?.trunc();
    if serial < 0.0 || serial > MAX_SERIAL as f64 {
        return Err(ErrorKind::Num);
    }
    Ok(serial_epoch() + Duration::days(serial as i64))
}

inventory::submit! {
    FunctionSpec {
        name: "DATE",
        category: Category::DateTime,
        min_args: 3,
        max_args: 3,
        implementation: BuiltinImpl::Value(date_fn),
    }
}

fn date_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let year = int_arg(args, 0)?;
    let month = int_arg(args, 1)?;
    let day = int_arg(args, 2)?;

    if year < 0 {
        return Err(ErrorKind::Num);
    }
    // Two-digit-era years are offsets from 1900: DATE(108,1,2) is
    // 2008-01-02.
    let year = if year < 1900 { year + 1900 } else { year };

    // Out-of-range months roll the year: DATE(2008,14,8) is 2009-02-08,
    // DATE(2008,-3,2) is 2007-09-02.
    let months = month - 1;
    let year = year + months.div_euclid(12);
    let month = months.rem_euclid(12) + 1;

    let Ok(year) = i32::try_from(year) else {
        return Err(ErrorKind::Num);
    };
    let first = NaiveDate::from_ymd_opt(year, month as u32, 1).ok_or(ErrorKind::Num)?;
    // Day offsets roll too, in either direction.
    let date = first
        .checked_add_signed(Duration::days(day - 1))
        .ok_or(ErrorKind::Num)?;

    let serial = (date - serial_epoch()).num_days();
    if serial < 0 || serial > MAX_SERIAL {
        return Err(ErrorKind::Num);
    }
    ok_number(serial as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "YEAR",
        category: Category::DateTime,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(year_fn),
    }
}

fn year_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(f64::from(serial_date(args, 0)?.year()))
}

inventory::submit! {
    FunctionSpec {
        name: "MONTH",
        category: Category::DateTime,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(month_fn),
    }
}

fn month_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(f64::from(serial_date(args, 0)?.month()))
}

inventory::submit! {
    FunctionSpec {
        name: "DAY",
        category: Category::DateTime,
        min_args: 1,
        max_args: 1,
        implementation: BuiltinImpl::Value(day_fn),
    }
}

fn day_fn(args: &[FunctionArg]) -> FunctionOutcome {
    ok_number(f64::from(serial_date(args, 0)?.day()))
}

inventory::submit! {
    FunctionSpec {
        name: "WEEKDAY",
        category: Category::DateTime,
        min_args: 1,
        max_args: 2,
        implementation: BuiltinImpl::Value(weekday_fn),
    }
}

fn weekday_fn(args: &[FunctionArg]) -> FunctionOutcome {
    let date = serial_date(args, 0)?;
    let return_type = opt_number_arg(args, 1, 1.0)?.trunc();
    let weekday = match return_type {
        1.0 => f64::from(date.weekday().num_days_from_sunday() + 1),
        2.0 => f64::from(date.weekday().num_days_from_monday() + 1),
        3.0 => f64::from(date.weekday().num_days_from_monday()),
        _ => return Err(ErrorKind::Num),
    };
    ok_number(weekday)
}

inventory::submit! {
    FunctionSpec {
        name: "TODAY",
        category: Category::DateTime,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(today_fn),
    }
}

fn today_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    let today = Local::now().date_naive();
    ok_number((today - serial_epoch()).num_days() as f64)
}

inventory::submit! {
    FunctionSpec {
        name: "NOW",
        category: Category::DateTime,
        min_args: 0,
        max_args: 0,
        implementation: BuiltinImpl::Value(now_fn),
    }
}

fn now_fn(_args: &[FunctionArg]) -> FunctionOutcome {
    let now = Local::now().naive_local();
    let days = (now.date() - serial_epoch()).num_days() as f64;
    let day_fraction = f64::from(now.time().num_seconds_from_midnight()) / 86_400.0;
    ok_number(days + day_fraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::EvalResult;
    use crate::functions::ArgOrigin;
    use gridcalc_model::Value;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> FunctionArg {
        FunctionArg::Scalar(Value::Number(n), ArgOrigin::Literal)
    }

    fn result_number(outcome: FunctionOutcome) -> f64 {
        match outcome {
            Ok(Some(EvalResult::Scalar(Value::Number(n)))) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    #[test]
    fn date_matches_known_serials() {
        assert_eq!(result_number(date_fn(&[num(2008.0), num(1.0), num(1.0)])), 39448.0);
        assert_eq!(result_number(date_fn(&[num(9999.0), num(12.0), num(31.0)])), 2_958_465.0);
    }

    #[test]
    fn date_rolls_months_and_days() {
        let rolled = result_number(date_fn(&[num(2008.0), num(14.0), num(8.0)]));
        assert_eq!(result_number(year_fn(&[num(rolled)])), 2009.0);
        assert_eq!(result_number(month_fn(&[num(rolled)])), 2.0);
        assert_eq!(result_number(day_fn(&[num(rolled)])), 8.0);

        let back = result_number(date_fn(&[num(2008.0), num(-3.0), num(2.0)]));
        assert_eq!(result_number(year_fn(&[num(back)])), 2007.0);
        assert_eq!(result_number(month_fn(&[num(back)])), 9.0);

        let long_month = result_number(date_fn(&[num(2008.0), num(1.0), num(35.0)]));
        assert_eq!(result_number(month_fn(&[num(long_month)])), 2.0);
        assert_eq!(result_number(day_fn(&[num(long_month)])), 4.0);
    }

    #[test]
    fn two_digit_era_years_offset_from_1900() {
        let serial = result_number(date_fn(&[num(108.0), num(1.0), num(2.0)]));
        assert_eq!(result_number(year_fn(&[num(serial)])), 2008.0);
    }

    #[test]
    fn out_of_range_dates_fault() {
        // Rolls back before the serial origin.
        assert_eq!(
            date_fn(&[num(1900.0), num(-11.0), num(1.0)]),
            Err(ErrorKind::Num)
        );
        assert_eq!(
            date_fn(&[num(10000.0), num(1.0), num(1.0)]),
            Err(ErrorKind::Num)
        );
        assert_eq!(year_fn(&[num(-1.0)]), Err(ErrorKind::Num));
    }

    #[test]
    fn weekday_return_types() {
        // 2008-01-01 was a Tuesday.
        let serial = num(39448.0);
        assert_eq!(result_number(weekday_fn(&[serial.clone()])), 3.0);
        assert_eq!(result_number(weekday_fn(&[serial.clone(), num(2.0)])), 2.0);
        assert_eq!(result_number(weekday_fn(&[serial.clone(), num(3.0)])), 1.0);
        assert_eq!(weekday_fn(&[serial, num(4.0)]), Err(ErrorKind::Num));
    }

    #[test]
    fn clock_functions_agree() {
        let today = result_number(today_fn(&[]));
        let now = result_number(now_fn(&[]));
        assert_eq!(today, today.trunc());
        assert!(now >= today);
        assert!(now - today < 1.0);
    }
}
