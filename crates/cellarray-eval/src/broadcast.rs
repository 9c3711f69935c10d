//! Element-wise binary operators and the shape rules used when two arrays
//! meet.

use crate::value::{CompareToken, ScalarValue};
use cellarray_common::ExcelErrorKind;

/// Callback used by [`BatchOperator::Product`].
pub type ProductFn<'a> = &'a dyn Fn(&ScalarValue, &ScalarValue) -> ScalarValue;

/// A binary operator applied cell by cell.
#[derive(Clone, Copy)]
pub enum BatchOperator<'a> {
    Plus,
    Minus,
    Multiply,
    Divided,
    Mod,
    /// Literal comparison, as `=A1:A5>3` evaluates it.
    Compare(CompareToken),
    /// Criteria comparison: like `Compare`, but text equality honours
    /// wildcards.
    Matches(CompareToken),
    ConcatenateFront,
    ConcatenateBack,
    Product(ProductFn<'a>),
    Pow,
    Round,
    Floor,
    Ceil,
    Atan2,
}

impl BatchOperator<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Multiply => "multiply",
            Self::Divided => "divided",
            Self::Mod => "mod",
            Self::Compare(_) => "compare",
            Self::Matches(_) => "matches",
            Self::ConcatenateFront => "concatenate_front",
            Self::ConcatenateBack => "concatenate_back",
            Self::Product(_) => "product",
            Self::Pow => "pow",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Atan2 => "atan2",
        }
    }

    /// The comparison token when this operator may be answered from the
    /// inverted index.
    pub(crate) fn compare_token(&self) -> Option<CompareToken> {
        match self {
            Self::Compare(t) | Self::Matches(t) => Some(*t),
            _ => None,
        }
    }

    /// Apply to one pair of cells. A receiver error wins over an operand
    /// error.
    pub fn apply(&self, lhs: &ScalarValue, rhs: &ScalarValue) -> ScalarValue {
        if let ScalarValue::Error(e) = lhs {
            return ScalarValue::Error(*e);
        }
        if let ScalarValue::Error(e) = rhs {
            return ScalarValue::Error(*e);
        }
        match self {
            Self::Plus => lhs.plus(rhs),
            Self::Minus => lhs.minus(rhs),
            Self::Multiply => lhs.multiply(rhs),
            Self::Divided => lhs.divided(rhs),
            Self::Mod => lhs.modulo(rhs),
            Self::Compare(t) => lhs.compare(rhs, *t),
            Self::Matches(t) => lhs.compare_wildcard(rhs, *t),
            Self::ConcatenateFront => lhs.concatenate_front(rhs),
            Self::ConcatenateBack => lhs.concatenate_back(rhs),
            Self::Product(f) => lhs.product(rhs, *f),
            Self::Pow => lhs.pow(rhs),
            Self::Round => lhs.round(rhs),
            Self::Floor => lhs.floor(rhs),
            Self::Ceil => lhs.ceil(rhs),
            Self::Atan2 => lhs.atan2(rhs),
        }
    }
}

impl std::fmt::Debug for BatchOperator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compare(t) => write!(f, "Compare({})", t.as_str()),
            Self::Matches(t) => write!(f, "Matches({})", t.as_str()),
            other => f.write_str(other.name()),
        }
    }
}

/// How an array's cells line up against a larger result grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayCalculateType {
    /// 1×1: the one cell repeats everywhere.
    Single,
    /// 1×N: row 0 repeats down every result row.
    Row,
    /// N×1: column 0 repeats across every result column.
    Column,
    /// M×N: cells line up one to one.
    Product,
}

impl ArrayCalculateType {
    pub fn classify(rows: usize, columns: usize) -> Self {
        match (rows, columns) {
            (1, 1) => Self::Single,
            (1, _) => Self::Row,
            (_, 1) => Self::Column,
            _ => Self::Product,
        }
    }

    /// The cell feeding result position `(row, column)`, or `None` when the
    /// grid does not reach it.
    pub fn pick<'v>(self, values: &'v [Vec<ScalarValue>], row: usize, column: usize) -> Option<&'v ScalarValue> {
        match self {
            Self::Single => values.first()?.first(),
            Self::Row => values.first()?.get(column),
            Self::Column => values.get(row)?.first(),
            Self::Product => values.get(row)?.get(column),
        }
    }
}

/// Combine two grids under the cross broadcast rule. The result is as large
/// as both inputs on each axis; positions either side cannot supply are
/// `#N/A`.
pub(crate) fn combine(
    lhs: &[Vec<ScalarValue>],
    lhs_dims: (usize, usize),
    rhs: &[Vec<ScalarValue>],
    rhs_dims: (usize, usize),
    op: BatchOperator<'_>,
) -> Vec<Vec<ScalarValue>> {
    let rows = lhs_dims.0.max(rhs_dims.0);
    let columns = lhs_dims.1.max(rhs_dims.1);
    let lhs_kind = ArrayCalculateType::classify(lhs_dims.0, lhs_dims.1);
    let rhs_kind = ArrayCalculateType::classify(rhs_dims.0, rhs_dims.1);

    (0..rows)
        .map(|r| {
            (0..columns)
                .map(|c| match (lhs_kind.pick(lhs, r, c), rhs_kind.pick(rhs, r, c)) {
                    (Some(a), Some(b)) => op.apply(a, b),
                    _ => ScalarValue::Error(ExcelErrorKind::Na),
                })
                .collect()
        })
        .collect()
}
