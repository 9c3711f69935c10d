//! Values flowing through formula evaluation.

pub mod array;
pub mod compare;
pub mod factory;
pub mod scalar;

pub use array::{ArrayError, ArrayOrigin, ArrayValue, FlattenPosition, RangePosition, SearchType, SliceSpec};
pub use compare::{CompareToken, has_wildcard, wildcard_match};
pub use factory::{ValueObjectFactory, transform_to_value, transform_to_value_object};
pub use scalar::ScalarValue;

use crate::broadcast::BatchOperator;
use cellarray_common::ExcelErrorKind;
use std::rc::Rc;

/// An operand or result: one scalar or a whole array.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcValue {
    Scalar(ScalarValue),
    Array(Rc<ArrayValue>),
}

macro_rules! binary_dispatch {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(&self, other: &CalcValue) -> CalcValue {
                self.binary(other, BatchOperator::$op)
            }
        )*
    };
}

impl CalcValue {
    pub fn is_array(&self) -> bool {
        matches!(self, CalcValue::Array(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CalcValue::Scalar(ScalarValue::Error(_)))
    }

    pub fn as_scalar(&self) -> Option<&ScalarValue> {
        match self {
            CalcValue::Scalar(s) => Some(s),
            CalcValue::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            CalcValue::Array(a) => Some(a),
            CalcValue::Scalar(_) => None,
        }
    }

    /// Arrays as they are; a scalar becomes a 1×1 array.
    pub fn into_array(self) -> Rc<ArrayValue> {
        match self {
            CalcValue::Array(a) => a,
            CalcValue::Scalar(s) => Rc::new(ArrayValue::from_scalar(s)),
        }
    }

    /// `(rows, columns)`; a scalar is 1×1.
    pub fn dims(&self) -> (usize, usize) {
        match self {
            CalcValue::Scalar(_) => (1, 1),
            CalcValue::Array(a) => (a.row_count(), a.column_count()),
        }
    }

    /// The scalar itself, or an array's top-left cell.
    pub fn first_cell(&self) -> ScalarValue {
        match self {
            CalcValue::Scalar(s) => s.clone(),
            CalcValue::Array(a) => a.first_cell(),
        }
    }

    /// Scalar ∘ scalar stays scalar. Anything involving an array takes the
    /// array path, with a scalar receiver promoted to 1×1 so the result
    /// takes the array's shape.
    pub fn binary(&self, other: &CalcValue, op: BatchOperator<'_>) -> CalcValue {
        match (self, other) {
            (CalcValue::Scalar(a), CalcValue::Scalar(b)) => CalcValue::Scalar(op.apply(a, b)),
            (CalcValue::Array(a), _) => CalcValue::Array(Rc::new(a.batch(other, op))),
            (CalcValue::Scalar(a), CalcValue::Array(_)) => {
                let promoted = ArrayValue::from_scalar(a.clone());
                CalcValue::Array(Rc::new(promoted.batch(other, op)))
            }
        }
    }

    binary_dispatch! {
        plus => Plus,
        minus => Minus,
        multiply => Multiply,
        divided => Divided,
        modulo => Mod,
        concatenate_front => ConcatenateFront,
        concatenate_back => ConcatenateBack,
        pow => Pow,
        round => Round,
        floor => Floor,
        ceil => Ceil,
        atan2 => Atan2,
    }

    pub fn compare(&self, other: &CalcValue, token: CompareToken) -> CalcValue {
        self.binary(other, BatchOperator::Compare(token))
    }

    /// Apply a scalar function to every cell (or to the scalar).
    pub fn map(&self, f: impl Fn(&ScalarValue) -> ScalarValue) -> CalcValue {
        match self {
            CalcValue::Scalar(s) => CalcValue::Scalar(f(s)),
            CalcValue::Array(a) => CalcValue::Array(Rc::new(a.map(|v, _, _| f(v)))),
        }
    }
}

impl From<ScalarValue> for CalcValue {
    fn from(v: ScalarValue) -> Self {
        CalcValue::Scalar(v)
    }
}

impl From<ArrayValue> for CalcValue {
    fn from(a: ArrayValue) -> Self {
        CalcValue::Array(Rc::new(a))
    }
}

impl From<Rc<ArrayValue>> for CalcValue {
    fn from(a: Rc<ArrayValue>) -> Self {
        CalcValue::Array(a)
    }
}

impl From<f64> for CalcValue {
    fn from(n: f64) -> Self {
        CalcValue::Scalar(ScalarValue::number(n))
    }
}

impl From<bool> for CalcValue {
    fn from(b: bool) -> Self {
        CalcValue::Scalar(ScalarValue::Boolean(b))
    }
}

impl From<&str> for CalcValue {
    fn from(s: &str) -> Self {
        CalcValue::Scalar(ScalarValue::from(s))
    }
}

impl From<ExcelErrorKind> for CalcValue {
    fn from(kind: ExcelErrorKind) -> Self {
        CalcValue::Scalar(ScalarValue::Error(kind))
    }
}
