use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{self, Display};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── numeric literal grammar ───────────────────────
Shared by literal classification and by text→number coercion:
  [+-]? ( digits [. digits?] | . digits ) ( [eE] [+-]? digits )?
Surrounding whitespace is ignored. `inf`, `NaN`, hex and digit grouping are
not numbers here even though `str::parse::<f64>` would accept some of them.
------------------------------------------------------------------- */

static REAL_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$")
        .expect("numeric literal grammar")
});

/// `true` if `s` is a syntactically real number under the shared grammar.
pub fn is_real_number(s: &str) -> bool {
    REAL_NUMBER.is_match(s.trim())
}

/// Parse `s` under the shared grammar. Overflowing literals (`1e999`) are
/// rejected so callers never see a non-finite number.
pub fn parse_real_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if !REAL_NUMBER.is_match(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a number the way a cell shows it when used as text: integers
/// without a fraction, everything else rounded to 15 significant digits.
pub fn number_to_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let rounded: f64 = format!("{n:.14e}").parse().unwrap_or(n);
    format!("{rounded}")
}

/// A raw literal as it crosses the boundary into the engine: whatever a
/// cell store or a literal in a formula hands over before classification.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Number(n) => f.write_str(&number_to_text(*n)),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Boolean(true) => f.write_str("TRUE"),
            RawValue::Boolean(false) => f.write_str("FALSE"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<i32> for RawValue {
    fn from(n: i32) -> Self {
        RawValue::Number(n as f64)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Boolean(b)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Null, Into::into)
    }
}
