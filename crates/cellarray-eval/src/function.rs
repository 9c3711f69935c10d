//! The `Function` trait builtins implement, and their capability flags.

use crate::value::{CalcValue, ScalarValue};
use cellarray_common::ExcelError;

bitflags::bitflags! {
    /// Describes the capabilities and properties of a function.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct FnCaps: u16 {
        /// Same output for the same input, no side effects.
        const PURE          = 0b0000_0000_0001;
        /// Output may change with identical inputs.
        const VOLATILE      = 0b0000_0000_0010;
        /// Reduces its inputs to one value (`SUM`, `AVERAGE`).
        const REDUCTION     = 0b0000_0000_0100;
        /// Operates on each element independently.
        const ELEMENTWISE   = 0b0000_0000_1000;
        /// Selects cells with `*IFS`-style criteria; comparisons may be served
        /// by the inverted index.
        const CRITERIA      = 0b0000_0001_0000;
        /// Works on numbers; text and logicals in ranges are skipped.
        const NUMERIC_ONLY  = 0b0000_0010_0000;
    }
}

/// An Excel-style callable. Object-safe so it can live in the registry.
pub trait Function: Send + Sync + 'static {
    fn caps(&self) -> FnCaps {
        FnCaps::PURE
    }

    fn name(&self) -> &'static str;

    fn namespace(&self) -> &'static str {
        ""
    }

    /// Extra names the registry resolves to this function.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    fn min_args(&self) -> usize {
        0
    }

    /// `None` for variadic functions.
    fn max_args(&self) -> Option<usize> {
        None
    }

    fn variadic(&self) -> bool {
        self.max_args().is_none()
    }

    fn volatile(&self) -> bool {
        self.caps().contains(FnCaps::VOLATILE)
    }

    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError>;

    /// Check arity, evaluate, and fold a returned `Err` into an error value.
    fn dispatch(&self, args: &[CalcValue]) -> CalcValue {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("function", name = self.name(), argc = args.len()).entered();

        let too_few = args.len() < self.min_args();
        let too_many = self.max_args().is_some_and(|max| args.len() > max);
        if too_few || too_many {
            #[cfg(feature = "tracing")]
            tracing::debug!(name = self.name(), argc = args.len(), "arity mismatch");
            return CalcValue::Scalar(ScalarValue::Error(cellarray_common::ExcelErrorKind::Na));
        }

        match self.calculate(args) {
            Ok(v) => v,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(name = self.name(), error = %e, "function error");
                CalcValue::Scalar(ScalarValue::Error(e.kind))
            }
        }
    }
}
