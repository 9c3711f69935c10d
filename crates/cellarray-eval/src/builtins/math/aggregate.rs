use super::super::utils::{coerce_num, collect_numbers, counts_as_number, number, scalar_error};
use crate::function::Function;
use crate::func_caps;
use crate::value::{CalcValue, ScalarValue};
use cellarray_common::{ExcelError, ExcelErrorKind};

/* ─────────────────────────── SUM() ──────────────────────────── */

#[derive(Debug)]
pub struct SumFn;

/// Adds numeric values across scalars and arrays.
///
/// # Remarks
/// - Text, logicals and blanks inside arrays are ignored.
/// - Direct scalar text must parse as a number or the result is `#VALUE!`.
/// - The first error encountered propagates.
///
/// ```text
/// =SUM(10, 20, 5)        → 35
/// =SUM({10;20;"N/A"})    → 30
/// ```
impl Function for SumFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "SUM"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let mut total = ScalarValue::Number(0.0);
        for arg in args {
            let part = match arg {
                CalcValue::Array(a) => a.sum(),
                CalcValue::Scalar(v) => {
                    scalar_error(v)?;
                    ScalarValue::number(coerce_num(v)?)
                }
            };
            total = total.plus(&part);
            scalar_error(&total)?;
        }
        Ok(CalcValue::Scalar(total))
    }
}

/* ─────────────────────────── COUNT() ──────────────────────────── */

#[derive(Debug)]
pub struct CountFn;

/// Counts numbers. In arrays only number cells count; direct arguments also
/// count logicals and numeric text.
impl Function for CountFn {
    func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "COUNT"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let mut count = 0.0;
        for arg in args {
            count += match arg {
                CalcValue::Array(a) => a.count().as_number().unwrap_or(0.0),
                CalcValue::Scalar(v) if counts_as_number(v) => 1.0,
                CalcValue::Scalar(_) => 0.0,
            };
        }
        Ok(number(count))
    }
}

/* ─────────────────────────── COUNTA() ──────────────────────────── */

#[derive(Debug)]
pub struct CountAFn;

impl Function for CountAFn {
    func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "COUNTA"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let mut count = 0.0;
        for arg in args {
            count += match arg {
                CalcValue::Array(a) => a.count_a().as_number().unwrap_or(0.0),
                CalcValue::Scalar(ScalarValue::Null) => 0.0,
                CalcValue::Scalar(_) => 1.0,
            };
        }
        Ok(number(count))
    }
}

/* ─────────────────────────── COUNTBLANK() ──────────────────────────── */

#[derive(Debug)]
pub struct CountBlankFn;

/// Counts blank cells. Empty text counts as blank.
impl Function for CountBlankFn {
    func_caps!(PURE, REDUCTION);

    fn name(&self) -> &'static str {
        "COUNTBLANK"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let mut count = 0.0;
        for arg in args {
            count += match arg {
                CalcValue::Array(a) => {
                    let empty_text = a
                        .cells()
                        .filter(|(_, _, v)| v.as_str().is_some_and(str::is_empty))
                        .count() as f64;
                    a.count_blank().as_number().unwrap_or(0.0) + empty_text
                }
                CalcValue::Scalar(ScalarValue::Null) => 1.0,
                CalcValue::Scalar(ScalarValue::String(s)) if s.is_empty() => 1.0,
                CalcValue::Scalar(_) => 0.0,
            };
        }
        Ok(number(count))
    }
}

/* ─────────────────────────── MAX() / MIN() ──────────────────────────── */

#[derive(Debug)]
pub struct MaxFn;

impl Function for MaxFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "MAX"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let numbers = collect_numbers(args)?;
        Ok(number(numbers.into_iter().reduce(f64::max).unwrap_or(0.0)))
    }
}

#[derive(Debug)]
pub struct MinFn;

impl Function for MinFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "MIN"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let numbers = collect_numbers(args)?;
        Ok(number(numbers.into_iter().reduce(f64::min).unwrap_or(0.0)))
    }
}

/* ─────────────────────────── AVERAGE() ──────────────────────────── */

#[derive(Debug)]
pub struct AverageFn;

/// Arithmetic mean.
///
/// # Remarks
/// - Arrays contribute their number cells (via the array `sum`/`count`).
/// - A direct logical counts as 1/0; a direct blank is skipped.
/// - Direct text must be numeric, otherwise `#VALUE!`.
/// - Nothing to average gives `#DIV/0!`.
///
/// ```text
/// =AVERAGE({1,2,3}, 4)   → 2.5
/// =AVERAGE("x")          → #VALUE!
/// ```
impl Function for AverageFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "AVERAGE"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let mut sum = ScalarValue::Number(0.0);
        let mut count = ScalarValue::Number(0.0);
        for arg in args {
            match arg {
                CalcValue::Array(a) => {
                    sum = sum.plus(&a.sum());
                    scalar_error(&sum)?;
                    count = count.plus(&a.count());
                }
                CalcValue::Scalar(ScalarValue::Null) => {}
                CalcValue::Scalar(v) => {
                    scalar_error(v)?;
                    sum = sum.plus(&ScalarValue::number(coerce_num(v)?));
                    count = count.plus(&ScalarValue::Number(1.0));
                }
            }
        }
        let mean = sum.divided(&count);
        match mean {
            ScalarValue::Error(ExcelErrorKind::Div) => {
                Err(ExcelError::new_div().with_message("AVERAGE: no numbers to average"))
            }
            other => Ok(CalcValue::Scalar(other)),
        }
    }
}

pub fn register_builtins() {
    crate::register_functions!(SumFn, CountFn, CountAFn, CountBlankFn, MaxFn, MinFn, AverageFn);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ArrayValue, ValueObjectFactory};

    fn arr(literal: &str) -> CalcValue {
        ValueObjectFactory::create(literal)
    }

    fn num(v: &CalcValue) -> f64 {
        v.as_scalar().and_then(ScalarValue::as_number).unwrap()
    }

    #[test]
    fn sum_mixes_scalars_and_arrays() {
        let out = SumFn.dispatch(&[arr("{1,2;\"x\",TRUE}"), CalcValue::from("4"), CalcValue::from(true)]);
        assert_eq!(num(&out), 8.0);
        let out = SumFn.dispatch(&[CalcValue::from("abc")]);
        assert_eq!(out, CalcValue::from(ExcelErrorKind::Value));
        let out = SumFn.dispatch(&[arr("{1,#REF!}")]);
        assert_eq!(out, CalcValue::from(ExcelErrorKind::Ref));
    }

    #[test]
    fn counts() {
        let data = arr("{1,\"a\",,TRUE,#N/A}");
        assert_eq!(num(&CountFn.dispatch(&[data.clone(), CalcValue::from("3")])), 2.0);
        assert_eq!(num(&CountAFn.dispatch(std::slice::from_ref(&data))), 4.0);
        assert_eq!(num(&CountBlankFn.dispatch(&[data])), 1.0);
    }

    #[test]
    fn max_min_of_nothing_is_zero() {
        let text = CalcValue::from(ArrayValue::new(vec![vec![ScalarValue::from("x")]]).unwrap());
        assert_eq!(num(&MaxFn.dispatch(std::slice::from_ref(&text))), 0.0);
        assert_eq!(num(&MinFn.dispatch(&[arr("{-3,5}"), CalcValue::from(-7.0)])), -7.0);
        assert_eq!(num(&MaxFn.dispatch(&[arr("{-3,-5}")])), -3.0);
    }

    #[test]
    fn average_rules() {
        assert_eq!(num(&AverageFn.dispatch(&[arr("{1,2,3}"), CalcValue::from(4.0)])), 2.5);
        assert_eq!(num(&AverageFn.dispatch(&[CalcValue::from(true), CalcValue::from(3.0)])), 2.0);
        assert_eq!(num(&AverageFn.dispatch(&[CalcValue::from("6")])), 6.0);
        assert_eq!(AverageFn.dispatch(&[CalcValue::from("six")]), CalcValue::from(ExcelErrorKind::Value));
        assert_eq!(AverageFn.dispatch(&[arr("{\"a\"}")]), CalcValue::from(ExcelErrorKind::Div));
        assert_eq!(
            AverageFn.dispatch(&[arr("{1,#NAME?}")]),
            CalcValue::from(ExcelErrorKind::Name)
        );
        assert_eq!(AverageFn.dispatch(&[]), CalcValue::from(ExcelErrorKind::Na));
    }
}
