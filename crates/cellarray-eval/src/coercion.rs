//! Scalar → number coercion shared by arithmetic and the aggregate builtins.

use crate::value::ScalarValue;
use cellarray_common::{ExcelErrorKind, parse_real_number};

/// Operator-style coercion: numbers as-is, TRUE/FALSE as 1/0, blank as 0,
/// numeric text parsed, anything else `#VALUE!`. Errors pass through.
pub fn to_number_lenient(value: &ScalarValue) -> Result<f64, ExcelErrorKind> {
    match value {
        ScalarValue::Number(n) => Ok(*n),
        ScalarValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        ScalarValue::Null => Ok(0.0),
        ScalarValue::String(s) => parse_real_number(s).ok_or(ExcelErrorKind::Value),
        ScalarValue::Error(e) => Err(*e),
    }
}

/// Map a computed float back into a cell value: NaN and infinities become
/// `#NUM!`.
pub fn sanitize_numeric(n: f64) -> ScalarValue {
    if n.is_finite() {
        ScalarValue::Number(n)
    } else {
        ScalarValue::Error(ExcelErrorKind::Num)
    }
}

/// Round to 15 significant digits, the precision a cell displays. Used before
/// rounding at a digit position so `2.675` rounds like the text it shows.
pub fn to_display_precision(n: f64) -> f64 {
    if n == 0.0 || !n.is_finite() {
        return n;
    }
    format!("{n:.14e}").parse().unwrap_or(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_rules() {
        assert_eq!(to_number_lenient(&ScalarValue::Boolean(true)), Ok(1.0));
        assert_eq!(to_number_lenient(&ScalarValue::Null), Ok(0.0));
        assert_eq!(to_number_lenient(&ScalarValue::from(" 2.5 ")), Ok(2.5));
        assert_eq!(
            to_number_lenient(&ScalarValue::from("abc")),
            Err(ExcelErrorKind::Value)
        );
        assert_eq!(
            to_number_lenient(&ScalarValue::Error(ExcelErrorKind::Ref)),
            Err(ExcelErrorKind::Ref)
        );
    }

    #[test]
    fn non_finite_becomes_num_error() {
        assert_eq!(sanitize_numeric(f64::NAN), ScalarValue::Error(ExcelErrorKind::Num));
        assert_eq!(sanitize_numeric(1.0), ScalarValue::Number(1.0));
    }
}
