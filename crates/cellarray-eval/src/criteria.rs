//! `*IFS` criteria: parsing `">=5"`-style strings and building boolean masks
//! over criteria ranges.

use crate::value::{ArrayValue, CalcValue, CompareToken, ScalarValue, ValueObjectFactory};

/// One parsed criterion.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub token: CompareToken,
    pub operand: ScalarValue,
}

impl Criterion {
    /// Text criteria may start with `>=`, `<=`, `<>`, `>`, `<` or `=`; the
    /// rest is classified like a literal. Text without an operator is an
    /// equality test against its classified literal, so `"5"` matches the
    /// number 5. Anything else is an equality test against the value itself.
    pub fn parse(value: &ScalarValue) -> Self {
        let ScalarValue::String(s) = value else {
            return Self {
                token: CompareToken::Equals,
                operand: value.clone(),
            };
        };
        if let Some((token, rest)) = CompareToken::split_prefix(s) {
            let operand = if rest.is_empty() {
                ScalarValue::Null
            } else {
                ValueObjectFactory::create_scalar(rest)
            };
            return Self { token, operand };
        }
        let operand = if s.is_empty() {
            value.clone()
        } else {
            ValueObjectFactory::create_scalar(s.as_ref())
        };
        Self {
            token: CompareToken::Equals,
            operand,
        }
    }

    /// Test a single cell.
    pub fn test(&self, cell: &ScalarValue) -> bool {
        if let Some(hit) = self.blank_rule(cell) {
            return hit;
        }
        if self.token.is_ordering() && !same_type(cell, &self.operand) {
            return false;
        }
        cell.compare_wildcard(&self.operand, self.token).is_true()
    }

    /// A bare `=` or `<>` tests for (non-)blank cells.
    fn blank_rule(&self, cell: &ScalarValue) -> Option<bool> {
        if !self.operand.is_null() {
            return None;
        }
        match self.token {
            CompareToken::Equals => Some(cell.is_null()),
            CompareToken::NotEqual => Some(!cell.is_null()),
            _ => Some(false),
        }
    }

    /// Boolean mask of `range` against this criterion. The comparison runs
    /// through the array operator so positioned ranges hit the inverted
    /// index; the type rules for ordering tokens are applied afterwards.
    pub fn mask(&self, range: &ArrayValue) -> ArrayValue {
        if self.operand.is_null() {
            return range.map_value(|cell, _, _| ScalarValue::Boolean(self.test(cell)));
        }
        let compared = range.matches(&CalcValue::Scalar(self.operand.clone()), self.token);
        let ordering = self.token.is_ordering();
        compared.map_value(|hit, r, c| {
            let keep = hit.is_true()
                && (!ordering || range.get_real(r, c).is_some_and(|cell| same_type(cell, &self.operand)));
            ScalarValue::Boolean(keep)
        })
    }
}

fn same_type(a: &ScalarValue, b: &ScalarValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// Cell-wise AND of two masks of the same shape.
pub fn and_masks(a: &ArrayValue, b: &ArrayValue) -> ArrayValue {
    a.map_value(|v, r, c| ScalarValue::Boolean(v.is_true() && b.get(r, c).is_true()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(cells: Vec<ScalarValue>) -> ArrayValue {
        ArrayValue::new(cells.into_iter().map(|c| vec![c]).collect()).unwrap()
    }

    fn bools(mask: &ArrayValue) -> Vec<bool> {
        mask.cells().map(|(_, _, v)| v.is_true()).collect()
    }

    #[test]
    fn parse_operators() {
        let c = Criterion::parse(&ScalarValue::from(">=10"));
        assert_eq!(c.token, CompareToken::GreaterThanOrEqual);
        assert_eq!(c.operand, ScalarValue::Number(10.0));

        let c = Criterion::parse(&ScalarValue::from("<>apple"));
        assert_eq!(c.token, CompareToken::NotEqual);
        assert_eq!(c.operand, ScalarValue::from("apple"));

        let c = Criterion::parse(&ScalarValue::from("=TRUE"));
        assert_eq!(c.operand, ScalarValue::Boolean(true));

        let c = Criterion::parse(&ScalarValue::Number(4.0));
        assert_eq!(c.token, CompareToken::Equals);
        assert_eq!(c.operand, ScalarValue::Number(4.0));
    }

    #[test]
    fn plain_text_is_classified_like_a_literal() {
        let c = Criterion::parse(&ScalarValue::from("5"));
        assert_eq!(c.token, CompareToken::Equals);
        assert_eq!(c.operand, ScalarValue::Number(5.0));

        let c = Criterion::parse(&ScalarValue::from("true"));
        assert_eq!(c.operand, ScalarValue::Boolean(true));

        let c = Criterion::parse(&ScalarValue::from("#N/A"));
        assert_eq!(c.operand, ScalarValue::Error(cellarray_common::ExcelErrorKind::Na));

        let c = Criterion::parse(&ScalarValue::from("pear"));
        assert_eq!(c.operand, ScalarValue::from("pear"));

        let range = column(vec![
            ScalarValue::Number(1.0),
            ScalarValue::Number(5.0),
            ScalarValue::from("5"),
        ]);
        let mask = Criterion::parse(&ScalarValue::from("5")).mask(&range);
        assert_eq!(bools(&mask), vec![false, true, false]);
    }

    #[test]
    fn ordering_only_matches_same_type() {
        let c = Criterion::parse(&ScalarValue::from(">2"));
        assert!(c.test(&ScalarValue::Number(3.0)));
        assert!(!c.test(&ScalarValue::from("zzz")));
        assert!(!c.test(&ScalarValue::Boolean(true)));
        assert!(!c.test(&ScalarValue::Null));

        let range = column(vec![ScalarValue::Number(3.0), ScalarValue::from("zzz"), ScalarValue::Number(1.0)]);
        assert_eq!(bools(&c.mask(&range)), vec![true, false, false]);
    }

    #[test]
    fn wildcard_equality() {
        let c = Criterion::parse(&ScalarValue::from("a*"));
        let range = column(vec![
            ScalarValue::from("Apple"),
            ScalarValue::from("banana"),
            ScalarValue::Null,
            ScalarValue::from("avocado"),
        ]);
        assert_eq!(bools(&c.mask(&range)), vec![true, false, false, true]);

        let c = Criterion::parse(&ScalarValue::from("<>a*"));
        assert_eq!(bools(&c.mask(&range)), vec![false, true, true, false]);
    }

    #[test]
    fn bare_operators_test_blankness() {
        let range = column(vec![ScalarValue::Null, ScalarValue::Number(0.0), ScalarValue::from("x")]);
        let eq = Criterion::parse(&ScalarValue::from("="));
        assert_eq!(bools(&eq.mask(&range)), vec![true, false, false]);
        let ne = Criterion::parse(&ScalarValue::from("<>"));
        assert_eq!(bools(&ne.mask(&range)), vec![false, true, true]);
    }

    #[test]
    fn errors_never_match() {
        let range = column(vec![
            ScalarValue::Error(cellarray_common::ExcelErrorKind::Na),
            ScalarValue::Number(1.0),
        ]);
        let c = Criterion::parse(&ScalarValue::Number(1.0));
        assert_eq!(bools(&c.mask(&range)), vec![false, true]);
    }

    #[test]
    fn and_masks_intersects() {
        let a = column(vec![ScalarValue::Boolean(true), ScalarValue::Boolean(true)]);
        let b = column(vec![ScalarValue::Boolean(false), ScalarValue::Boolean(true)]);
        assert_eq!(bools(&and_masks(&a, &b)), vec![false, true]);
    }
}
