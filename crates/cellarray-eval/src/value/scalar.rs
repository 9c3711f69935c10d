//! The scalar value model.
//!
//! Every operation takes `&self` and returns a fresh [`ScalarValue`]; errors
//! never panic, they become `Error` values. When both operands are errors the
//! receiver's error wins.

use super::compare::{CompareToken, compare_values, has_wildcard, wildcard_match};
use crate::coercion::{sanitize_numeric, to_display_precision, to_number_lenient};
use cellarray_common::{ExcelErrorKind, RawValue, number_to_text};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Number(f64),
    String(Arc<str>),
    Boolean(bool),
    Null,
    Error(ExcelErrorKind),
}

/// Rounding direction for [`ScalarValue::round`], [`ScalarValue::floor`] and
/// [`ScalarValue::ceil`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundMode {
    HalfAwayFromZero,
    Down,
    Up,
}

fn round_at(value: f64, digits: i32, mode: RoundMode) -> f64 {
    let apply = |x: f64| match mode {
        RoundMode::HalfAwayFromZero => x.round(),
        RoundMode::Down => x.floor(),
        RoundMode::Up => x.ceil(),
    };
    let digits = digits.clamp(-308, 308);
    if digits >= 0 {
        let factor = 10f64.powi(digits);
        let scaled = to_display_precision(value * factor);
        if !scaled.is_finite() {
            return value;
        }
        apply(scaled) / factor
    } else {
        let factor = 10f64.powi(-digits);
        apply(to_display_precision(value / factor)) * factor
    }
}

impl ScalarValue {
    /* ───────────── constructors ───────────── */

    /// Non-finite input becomes `#NUM!`.
    pub fn number(n: f64) -> Self {
        sanitize_numeric(n)
    }

    pub fn string(s: impl Into<Arc<str>>) -> Self {
        ScalarValue::String(s.into())
    }

    pub fn boolean(b: bool) -> Self {
        ScalarValue::Boolean(b)
    }

    pub fn error(kind: ExcelErrorKind) -> Self {
        ScalarValue::Error(kind)
    }

    /* ───────────── inspection ───────────── */

    pub fn is_number(&self) -> bool {
        matches!(self, ScalarValue::Number(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, ScalarValue::String(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ScalarValue::Boolean(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScalarValue::Error(_))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, ScalarValue::Boolean(true))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ExcelErrorKind> {
        match self {
            ScalarValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// The blank value of this value's type: what a `Null` turns into when
    /// compared against it.
    pub(crate) fn blank_like(&self) -> ScalarValue {
        match self {
            ScalarValue::Number(_) => ScalarValue::Number(0.0),
            ScalarValue::String(_) => ScalarValue::String(Arc::from("")),
            ScalarValue::Boolean(_) => ScalarValue::Boolean(false),
            ScalarValue::Null => ScalarValue::Null,
            ScalarValue::Error(e) => ScalarValue::Error(*e),
        }
    }

    /// Text form used by concatenation.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            ScalarValue::Number(n) => Cow::Owned(number_to_text(*n)),
            ScalarValue::String(s) => Cow::Borrowed(s),
            ScalarValue::Boolean(true) => Cow::Borrowed("TRUE"),
            ScalarValue::Boolean(false) => Cow::Borrowed("FALSE"),
            ScalarValue::Null => Cow::Borrowed(""),
            ScalarValue::Error(e) => Cow::Borrowed(e.code()),
        }
    }

    /// Back to a raw literal. Errors come out as their code text.
    pub fn to_raw(&self) -> RawValue {
        match self {
            ScalarValue::Number(n) => RawValue::Number(*n),
            ScalarValue::String(s) => RawValue::Text(s.to_string()),
            ScalarValue::Boolean(b) => RawValue::Boolean(*b),
            ScalarValue::Null => RawValue::Null,
            ScalarValue::Error(e) => RawValue::Text(e.code().to_string()),
        }
    }

    /* ───────────── arithmetic ───────────── */

    fn binary_numeric(&self, other: &ScalarValue, f: impl FnOnce(f64, f64) -> ScalarValue) -> ScalarValue {
        if let ScalarValue::Error(e) = self {
            return ScalarValue::Error(*e);
        }
        if let ScalarValue::Error(e) = other {
            return ScalarValue::Error(*e);
        }
        match (to_number_lenient(self), to_number_lenient(other)) {
            (Ok(a), Ok(b)) => f(a, b),
            (Err(e), _) | (_, Err(e)) => ScalarValue::Error(e),
        }
    }

    fn unary_numeric(&self, f: impl FnOnce(f64) -> ScalarValue) -> ScalarValue {
        match to_number_lenient(self) {
            Ok(n) => f(n),
            Err(e) => ScalarValue::Error(e),
        }
    }

    pub fn plus(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| ScalarValue::number(a + b))
    }

    pub fn minus(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| ScalarValue::number(a - b))
    }

    pub fn multiply(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| ScalarValue::number(a * b))
    }

    pub fn divided(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| {
            if b == 0.0 {
                ScalarValue::Error(ExcelErrorKind::Div)
            } else {
                ScalarValue::number(a / b)
            }
        })
    }

    /// Remainder with the sign of the divisor.
    pub fn modulo(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| {
            if b == 0.0 {
                ScalarValue::Error(ExcelErrorKind::Div)
            } else {
                ScalarValue::number(a - b * (a / b).floor())
            }
        })
    }

    pub fn pow(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |a, b| {
            if a == 0.0 && b < 0.0 {
                ScalarValue::Error(ExcelErrorKind::Div)
            } else if a == 0.0 && b == 0.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(a.powf(b))
            }
        })
    }

    /// `self` is the y coordinate, `other` the x coordinate.
    pub fn atan2(&self, other: &ScalarValue) -> ScalarValue {
        self.binary_numeric(other, |y, x| {
            if x == 0.0 && y == 0.0 {
                ScalarValue::Error(ExcelErrorKind::Div)
            } else {
                ScalarValue::number(y.atan2(x))
            }
        })
    }

    /// Round half away from zero at `digits` decimal places (negative digits
    /// round to the left of the decimal point).
    pub fn round(&self, digits: &ScalarValue) -> ScalarValue {
        self.binary_numeric(digits, |v, d| {
            ScalarValue::number(round_at(v, d.trunc() as i32, RoundMode::HalfAwayFromZero))
        })
    }

    /// Round toward negative infinity at `digits` decimal places.
    pub fn floor(&self, digits: &ScalarValue) -> ScalarValue {
        self.binary_numeric(digits, |v, d| ScalarValue::number(round_at(v, d.trunc() as i32, RoundMode::Down)))
    }

    /// Round toward positive infinity at `digits` decimal places.
    pub fn ceil(&self, digits: &ScalarValue) -> ScalarValue {
        self.binary_numeric(digits, |v, d| ScalarValue::number(round_at(v, d.trunc() as i32, RoundMode::Up)))
    }

    pub fn negative(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(-n))
    }

    pub fn reciprocal(&self) -> ScalarValue {
        ScalarValue::Number(1.0).divided(self)
    }

    pub fn abs(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.abs()))
    }

    pub fn sqrt(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if n < 0.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.sqrt())
            }
        })
    }

    pub fn cbrt(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.cbrt()))
    }

    pub fn exp(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.exp()))
    }

    /// Natural logarithm.
    pub fn log(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if n <= 0.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.ln())
            }
        })
    }

    pub fn log10(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if n <= 0.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.log10())
            }
        })
    }

    pub fn sin(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.sin()))
    }

    pub fn cos(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.cos()))
    }

    pub fn tan(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.tan()))
    }

    pub fn asin(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if !(-1.0..=1.0).contains(&n) {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.asin())
            }
        })
    }

    pub fn acos(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if !(-1.0..=1.0).contains(&n) {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.acos())
            }
        })
    }

    pub fn atan(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.atan()))
    }

    pub fn tanh(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.tanh()))
    }

    pub fn asinh(&self) -> ScalarValue {
        self.unary_numeric(|n| ScalarValue::number(n.asinh()))
    }

    pub fn acosh(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if n < 1.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.acosh())
            }
        })
    }

    pub fn atanh(&self) -> ScalarValue {
        self.unary_numeric(|n| {
            if n <= -1.0 || n >= 1.0 {
                ScalarValue::Error(ExcelErrorKind::Num)
            } else {
                ScalarValue::number(n.atanh())
            }
        })
    }

    /* ───────────── text ───────────── */

    /// `other & self`.
    pub fn concatenate_front(&self, other: &ScalarValue) -> ScalarValue {
        if let ScalarValue::Error(e) = self {
            return ScalarValue::Error(*e);
        }
        if let ScalarValue::Error(e) = other {
            return ScalarValue::Error(*e);
        }
        ScalarValue::string(format!("{}{}", other.to_text(), self.to_text()))
    }

    /// `self & other`.
    pub fn concatenate_back(&self, other: &ScalarValue) -> ScalarValue {
        if let ScalarValue::Error(e) = self {
            return ScalarValue::Error(*e);
        }
        if let ScalarValue::Error(e) = other {
            return ScalarValue::Error(*e);
        }
        ScalarValue::string(format!("{}{}", self.to_text(), other.to_text()))
    }

    /// Combine with a caller-supplied function (used by SUMPRODUCT-style
    /// helpers and mask combination).
    pub fn product(&self, other: &ScalarValue, f: &dyn Fn(&ScalarValue, &ScalarValue) -> ScalarValue) -> ScalarValue {
        f(self, other)
    }

    /* ───────────── comparison ───────────── */

    /// Operator comparison. Returns a `Boolean`, or the first error operand.
    pub fn compare(&self, other: &ScalarValue, token: CompareToken) -> ScalarValue {
        if let ScalarValue::Error(e) = self {
            return ScalarValue::Error(*e);
        }
        if let ScalarValue::Error(e) = other {
            return ScalarValue::Error(*e);
        }
        ScalarValue::Boolean(token.evaluate(compare_values(self, other)))
    }

    /// Like [`compare`](Self::compare), but `=` and `<>` against a text
    /// pattern honour `*`, `?` and `~`. A blank never matches a pattern.
    pub fn compare_wildcard(&self, pattern: &ScalarValue, token: CompareToken) -> ScalarValue {
        if let (ScalarValue::String(p), false) = (pattern, token.is_ordering())
            && has_wildcard(p)
        {
            let matched = match self {
                ScalarValue::Error(e) => return ScalarValue::Error(*e),
                ScalarValue::String(s) => wildcard_match(p, s),
                _ => false,
            };
            return ScalarValue::Boolean(matched == (token == CompareToken::Equals));
        }
        self.compare(pattern, token)
    }

    pub fn is_equal(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::Equals)
    }

    pub fn is_not_equal(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::NotEqual)
    }

    pub fn is_greater_than(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::GreaterThan)
    }

    pub fn is_greater_than_or_equal(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::GreaterThanOrEqual)
    }

    pub fn is_less_than(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::LessThan)
    }

    pub fn is_less_than_or_equal(&self, other: &ScalarValue) -> ScalarValue {
        self.compare(other, CompareToken::LessThanOrEqual)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for ScalarValue {
    fn from(n: f64) -> Self {
        ScalarValue::number(n)
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Boolean(b)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::String(Arc::from(s))
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::String(Arc::from(s))
    }
}

impl From<ExcelErrorKind> for ScalarValue {
    fn from(kind: ExcelErrorKind) -> Self {
        ScalarValue::Error(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> ScalarValue {
        ScalarValue::Number(n)
    }

    #[test]
    fn arithmetic_coerces_booleans_blanks_and_numeric_text() {
        assert_eq!(num(1.0).plus(&ScalarValue::Boolean(true)), num(2.0));
        assert_eq!(num(1.0).plus(&ScalarValue::Null), num(1.0));
        assert_eq!(num(1.0).plus(&ScalarValue::from("2")), num(3.0));
        assert_eq!(
            num(1.0).plus(&ScalarValue::from("two")),
            ScalarValue::Error(ExcelErrorKind::Value)
        );
    }

    #[test]
    fn receiver_error_wins() {
        let lhs = ScalarValue::Error(ExcelErrorKind::Name);
        let rhs = ScalarValue::Error(ExcelErrorKind::Ref);
        assert_eq!(lhs.minus(&rhs), lhs);
        assert_eq!(num(1.0).minus(&rhs), rhs);
        assert_eq!(lhs.compare(&rhs, CompareToken::Equals), lhs);
    }

    #[test]
    fn division_and_modulo() {
        assert_eq!(num(1.0).divided(&num(0.0)), ScalarValue::Error(ExcelErrorKind::Div));
        assert_eq!(num(-7.0).modulo(&num(3.0)), num(2.0));
        assert_eq!(num(7.0).modulo(&num(-3.0)), num(-2.0));
        assert_eq!(num(7.0).modulo(&num(0.0)), ScalarValue::Error(ExcelErrorKind::Div));
    }

    #[test]
    fn pow_domain() {
        assert_eq!(num(2.0).pow(&num(10.0)), num(1024.0));
        assert_eq!(num(0.0).pow(&num(-1.0)), ScalarValue::Error(ExcelErrorKind::Div));
        assert_eq!(num(-8.0).pow(&num(0.5)), ScalarValue::Error(ExcelErrorKind::Num));
    }

    #[test]
    fn rounding_family() {
        assert_eq!(num(2.675).round(&num(2.0)), num(2.68));
        assert_eq!(num(-2.5).round(&num(0.0)), num(-3.0));
        assert_eq!(num(1234.0).round(&num(-2.0)), num(1200.0));
        assert_eq!(num(2.19).floor(&num(1.0)), num(2.1));
        assert_eq!(num(2.11).ceil(&num(1.0)), num(2.2));
    }

    #[test]
    fn comparisons() {
        assert!(num(3.0).is_greater_than(&num(2.0)).is_true());
        assert!(ScalarValue::from("B").is_greater_than(&ScalarValue::from("a")).is_true());
        assert!(ScalarValue::from("a").is_greater_than(&num(1e9)).is_true());
        assert!(ScalarValue::Null.is_equal(&num(0.0)).is_true());
        assert!(ScalarValue::Null.is_equal(&ScalarValue::Boolean(false)).is_true());
        assert!(!num(1.0).is_equal(&ScalarValue::from("1")).is_true());
    }

    #[test]
    fn wildcard_compare_only_for_equality() {
        let pat = ScalarValue::from("ap*");
        assert!(ScalarValue::from("Apple").compare_wildcard(&pat, CompareToken::Equals).is_true());
        assert!(!ScalarValue::from("Apple").compare_wildcard(&pat, CompareToken::NotEqual).is_true());
        assert!(!ScalarValue::Null.compare_wildcard(&pat, CompareToken::Equals).is_true());
        assert!(!num(1.0).compare_wildcard(&pat, CompareToken::Equals).is_true());
        // plain compare treats the pattern literally
        assert!(!ScalarValue::from("Apple").compare(&pat, CompareToken::Equals).is_true());
    }

    #[test]
    fn concatenation_order() {
        let a = ScalarValue::from("a");
        let b = num(1.5);
        assert_eq!(a.concatenate_back(&b), ScalarValue::from("a1.5"));
        assert_eq!(a.concatenate_front(&b), ScalarValue::from("1.5a"));
        assert_eq!(
            ScalarValue::Boolean(true).concatenate_back(&ScalarValue::Null),
            ScalarValue::from("TRUE")
        );
    }

    #[test]
    fn unary_domains() {
        assert_eq!(num(-1.0).sqrt(), ScalarValue::Error(ExcelErrorKind::Num));
        assert_eq!(num(0.0).log(), ScalarValue::Error(ExcelErrorKind::Num));
        assert_eq!(num(2.0).asin(), ScalarValue::Error(ExcelErrorKind::Num));
        assert_eq!(num(4.0).reciprocal(), num(0.25));
        assert_eq!(num(0.0).reciprocal(), ScalarValue::Error(ExcelErrorKind::Div));
        assert_eq!(ScalarValue::from("x").abs(), ScalarValue::Error(ExcelErrorKind::Value));
    }

    #[test]
    fn atan2_orientation() {
        let r = num(1.0).atan2(&num(1.0));
        assert!((r.as_number().unwrap() - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
        assert_eq!(num(0.0).atan2(&num(0.0)), ScalarValue::Error(ExcelErrorKind::Div));
    }
}
