//! Meta crate that re-exports the cellarray building blocks. Depend on this
//! crate and opt into layers via feature flags, or use the underlying crates
//! directly for deeper integration.

#[cfg(feature = "common")]
pub use cellarray_common as common;

#[cfg(feature = "eval")]
pub use cellarray_eval as eval;

#[cfg(feature = "common")]
pub use cellarray_common::{CellContext, ExcelError, ExcelErrorKind, RawValue};

#[cfg(feature = "eval")]
pub use cellarray_eval::{
    ArrayValue, CalcValue, CompareToken, EvalConfig, EvalSession, ScalarValue, SearchType, SliceSpec,
    ValueObjectFactory,
};

#[cfg(feature = "eval")]
pub mod doc_examples;
