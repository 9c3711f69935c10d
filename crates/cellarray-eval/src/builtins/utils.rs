use crate::coercion::to_number_lenient;
use crate::value::{ArrayValue, CalcValue, ScalarValue};
use cellarray_common::{ExcelError, ExcelErrorKind, parse_real_number};

/// Coerce a direct scalar argument: numbers, logicals, blanks and numeric
/// text convert; other text is `#VALUE!`; errors propagate.
pub fn coerce_num(value: &ScalarValue) -> Result<f64, ExcelError> {
    to_number_lenient(value).map_err(ExcelError::new)
}

/// Collect numeric inputs applying Excel statistical semantics:
/// - arrays: only number cells count; text, logicals and blanks are skipped;
///   errors propagate.
/// - direct scalars: coerced with [`coerce_num`], except that a blank
///   argument is skipped.
pub fn collect_numbers(args: &[CalcValue]) -> Result<Vec<f64>, ExcelError> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            CalcValue::Array(a) => {
                for (_, _, cell) in a.cells() {
                    match cell {
                        ScalarValue::Number(n) => out.push(*n),
                        ScalarValue::Error(e) => return Err(ExcelError::new(*e)),
                        _ => {}
                    }
                }
            }
            CalcValue::Scalar(ScalarValue::Null) => {}
            CalcValue::Scalar(v) => out.push(coerce_num(v)?),
        }
    }
    Ok(out)
}

/// Build a one-row array from collected numbers so the array reductions can
/// run over it.
pub fn numbers_row(numbers: Vec<f64>) -> Option<ArrayValue> {
    ArrayValue::new(vec![numbers.into_iter().map(ScalarValue::Number).collect()]).ok()
}

/// `true` for a direct scalar argument that `COUNT` counts.
pub fn counts_as_number(value: &ScalarValue) -> bool {
    match value {
        ScalarValue::Number(_) | ScalarValue::Boolean(_) => true,
        ScalarValue::String(s) => parse_real_number(s).is_some(),
        _ => false,
    }
}

pub fn scalar_error(value: &ScalarValue) -> Result<(), ExcelError> {
    match value {
        ScalarValue::Error(e) => Err(ExcelError::new(*e)),
        _ => Ok(()),
    }
}

/// A `CalcValue` holding one number.
pub fn number(n: f64) -> CalcValue {
    CalcValue::Scalar(ScalarValue::number(n))
}

/// `#VALUE!` with a message naming the function.
pub fn value_error(function: &str, message: impl std::fmt::Display) -> ExcelError {
    ExcelError::new(ExcelErrorKind::Value).with_message(format!("{function}: {message}"))
}
