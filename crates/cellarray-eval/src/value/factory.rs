//! Classification of raw literals into engine values.

use super::{ArrayValue, CalcValue, ScalarValue};
use cellarray_common::{ExcelErrorKind, RawValue, parse_real_number};
use std::sync::Arc;

pub struct ValueObjectFactory;

impl ValueObjectFactory {
    /// Classify a raw literal. Text is tried, on its trimmed upper-cased
    /// form, as an error code, then `TRUE`/`FALSE`, then a number, then an
    /// array literal `{…}`; anything else stays text, verbatim.
    pub fn create(raw: impl Into<RawValue>) -> CalcValue {
        match raw.into() {
            RawValue::Text(text) => {
                let stripped: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
                if let Some(array) = parse_array_literal(&stripped) {
                    return CalcValue::from(array);
                }
                CalcValue::Scalar(classify_text(text))
            }
            other => CalcValue::Scalar(Self::create_scalar(other)),
        }
    }

    /// Like [`create`](Self::create) but never builds an array: array
    /// syntax stays text.
    pub fn create_scalar(raw: impl Into<RawValue>) -> ScalarValue {
        match raw.into() {
            RawValue::Null => ScalarValue::Null,
            RawValue::Boolean(b) => ScalarValue::Boolean(b),
            RawValue::Number(n) => ScalarValue::number(n),
            RawValue::Text(text) => classify_text(text),
        }
    }

    /// Parse `{a,b;c,d}` into an array. `None` if `text` is not an array
    /// literal.
    pub fn parse_array_literal(text: &str) -> Option<ArrayValue> {
        parse_array_literal(text)
    }
}

fn classify_text(text: String) -> ScalarValue {
    let upper = text.trim().to_uppercase();
    if let Some(kind) = ExcelErrorKind::parse(&upper) {
        return ScalarValue::Error(kind);
    }
    match upper.as_str() {
        "TRUE" => return ScalarValue::Boolean(true),
        "FALSE" => return ScalarValue::Boolean(false),
        _ => {}
    }
    if let Some(n) = parse_real_number(&text) {
        return ScalarValue::Number(n);
    }
    ScalarValue::String(Arc::from(text))
}

/// Split on `sep` outside double quotes. `""` inside quotes is an escaped
/// quote and does not close the string.
fn split_outside_quotes(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn parse_cell(raw: &str) -> ScalarValue {
    let cell = raw.trim();
    if cell.is_empty() {
        return ScalarValue::Null;
    }
    if cell.len() >= 2 && cell.starts_with('"') && cell.ends_with('"') {
        let inner = &cell[1..cell.len() - 1];
        return ScalarValue::String(Arc::from(inner.replace("\"\"", "\"")));
    }
    ValueObjectFactory::create_scalar(cell)
}

fn parse_array_literal(text: &str) -> Option<ArrayValue> {
    let body = text.trim().strip_prefix('{')?.strip_suffix('}')?;
    if body.trim().is_empty() {
        return None;
    }

    let mut rows: Vec<Vec<ScalarValue>> = split_outside_quotes(body, ';')
        .into_iter()
        .map(|row| split_outside_quotes(row, ',').into_iter().map(parse_cell).collect())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(1);
    for row in &mut rows {
        row.resize(width, ScalarValue::Error(ExcelErrorKind::Na));
    }
    ArrayValue::new(rows).ok()
}

/// Engine values back to raw literals; errors become their code text.
pub fn transform_to_value(values: &[Vec<ScalarValue>]) -> Vec<Vec<RawValue>> {
    values
        .iter()
        .map(|row| row.iter().map(ScalarValue::to_raw).collect())
        .collect()
}

/// Raw literals to engine values, using scalar classification per cell.
pub fn transform_to_value_object(values: &[Vec<RawValue>]) -> Vec<Vec<ScalarValue>> {
    values
        .iter()
        .map(|row| row.iter().cloned().map(ValueObjectFactory::create_scalar).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(raw: impl Into<RawValue>) -> ScalarValue {
        match ValueObjectFactory::create(raw) {
            CalcValue::Scalar(s) => s,
            CalcValue::Array(a) => panic!("expected scalar, got {a}"),
        }
    }

    #[test]
    fn classifies_text() {
        assert_eq!(scalar("#DIV/0!"), ScalarValue::Error(ExcelErrorKind::Div));
        assert_eq!(scalar(" #n/a "), ScalarValue::Error(ExcelErrorKind::Na));
        assert_eq!(scalar("true"), ScalarValue::Boolean(true));
        assert_eq!(scalar("FALSE"), ScalarValue::Boolean(false));
        assert_eq!(scalar("1.5e3"), ScalarValue::Number(1500.0));
        assert_eq!(scalar(".5"), ScalarValue::Number(0.5));
        assert_eq!(scalar("inf"), ScalarValue::from("inf"));
        assert_eq!(scalar("0x10"), ScalarValue::from("0x10"));
        assert_eq!(scalar("  hello "), ScalarValue::from("  hello "));
        assert_eq!(scalar("#BOGUS!"), ScalarValue::from("#BOGUS!"));
    }

    #[test]
    fn classifies_non_text() {
        assert_eq!(scalar(RawValue::Null), ScalarValue::Null);
        assert_eq!(scalar(true), ScalarValue::Boolean(true));
        assert_eq!(scalar(3.0), ScalarValue::Number(3.0));
        assert_eq!(scalar(f64::INFINITY), ScalarValue::Error(ExcelErrorKind::Num));
        assert_eq!(scalar(f64::NAN), ScalarValue::Error(ExcelErrorKind::Num));
    }

    #[test]
    fn array_literal() {
        let CalcValue::Array(a) = ValueObjectFactory::create("{1,\"a,b\";TRUE,#N/A}") else {
            panic!("expected array");
        };
        assert_eq!((a.row_count(), a.column_count()), (2, 2));
        assert_eq!(a.get(0, 0), ScalarValue::Number(1.0));
        assert_eq!(a.get(0, 1), ScalarValue::from("a,b"));
        assert_eq!(a.get(1, 0), ScalarValue::Boolean(true));
        assert_eq!(a.get(1, 1), ScalarValue::Error(ExcelErrorKind::Na));
    }

    #[test]
    fn array_literal_blanks_padding_and_newlines() {
        let CalcValue::Array(a) = ValueObjectFactory::create("{1,,3;\r\n4}") else {
            panic!("expected array");
        };
        assert_eq!((a.row_count(), a.column_count()), (2, 3));
        assert_eq!(a.get(0, 1), ScalarValue::Null);
        assert_eq!(a.get(1, 0), ScalarValue::Number(4.0));
        assert_eq!(a.get(1, 2), ScalarValue::Error(ExcelErrorKind::Na));
    }

    #[test]
    fn array_literal_escaped_quotes() {
        let a = ValueObjectFactory::parse_array_literal("{\"say \"\"hi\"\"\"}").unwrap();
        assert_eq!(a.get(0, 0), ScalarValue::from("say \"hi\""));
        assert!(ValueObjectFactory::parse_array_literal("{}").is_none());
        assert!(ValueObjectFactory::parse_array_literal("1,2").is_none());
    }

    #[test]
    fn create_scalar_keeps_array_syntax_as_text() {
        assert_eq!(ValueObjectFactory::create_scalar("{1,2}"), ScalarValue::from("{1,2}"));
    }

    #[test]
    fn transforms() {
        let values = vec![vec![ScalarValue::Number(1.0), ScalarValue::Error(ExcelErrorKind::Ref)]];
        let raw = transform_to_value(&values);
        assert_eq!(raw, vec![vec![RawValue::Number(1.0), RawValue::Text("#REF!".into())]]);
        assert_eq!(transform_to_value_object(&raw), values);
    }
}
