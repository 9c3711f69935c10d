//! Statistical functions: MEDIAN, VAR.S, VAR.P, STDEV.S, STDEV.P.
//!
//! Values coming from arrays ignore text and logicals, while direct scalar
//! arguments still coerce (`=STDEV.S(1,TRUE)` treats TRUE as 1). Errors in
//! any argument propagate immediately. The numbers are gathered into a
//! one-row array and reduced with the array's own `median`/`var`/`std`.

use super::utils::{collect_numbers, numbers_row, scalar_error};
use crate::function::Function;
use crate::func_caps;
use crate::value::{ArrayValue, CalcValue, ScalarValue};
use cellarray_common::{ExcelError, ExcelErrorKind};

fn reduce_numbers(
    args: &[CalcValue],
    empty: ExcelErrorKind,
    f: impl FnOnce(&ArrayValue) -> ScalarValue,
) -> Result<CalcValue, ExcelError> {
    let numbers = collect_numbers(args)?;
    let Some(row) = numbers_row(numbers) else {
        return Err(ExcelError::new(empty));
    };
    let out = f(&row);
    scalar_error(&out)?;
    Ok(CalcValue::Scalar(out))
}

/* ─────────────────────────── MEDIAN() ──────────────────────────── */

#[derive(Debug)]
pub struct MedianFn;

impl Function for MedianFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "MEDIAN"
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        reduce_numbers(args, ExcelErrorKind::Num, ArrayValue::median)
    }
}

/* ─────────────────────────── VAR.S() / VAR.P() ──────────────────────────── */

#[derive(Debug)]
pub struct VarSampleFn;

/// Sample variance (n − 1). Fewer than two numbers give `#DIV/0!`.
impl Function for VarSampleFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "VAR.S"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["VAR"]
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        reduce_numbers(args, ExcelErrorKind::Div, |a| a.var(1))
    }
}

#[derive(Debug)]
pub struct VarPopulationFn;

impl Function for VarPopulationFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "VAR.P"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["VARP"]
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        reduce_numbers(args, ExcelErrorKind::Div, |a| a.var(0))
    }
}

/* ─────────────────────────── STDEV.S() / STDEV.P() ──────────────────────────── */

#[derive(Debug)]
pub struct StdevSampleFn;

impl Function for StdevSampleFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "STDEV.S"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["STDEV"]
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        reduce_numbers(args, ExcelErrorKind::Div, |a| a.std(1))
    }
}

#[derive(Debug)]
pub struct StdevPopulationFn;

impl Function for StdevPopulationFn {
    func_caps!(PURE, REDUCTION, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "STDEV.P"
    }
    fn aliases(&self) -> &'static [&'static str] {
        &["STDEVP"]
    }
    fn min_args(&self) -> usize {
        1
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        reduce_numbers(args, ExcelErrorKind::Div, |a| a.std(0))
    }
}

pub fn register_builtins() {
    crate::register_functions!(
        MedianFn,
        VarSampleFn,
        VarPopulationFn,
        StdevSampleFn,
        StdevPopulationFn
    );
}
