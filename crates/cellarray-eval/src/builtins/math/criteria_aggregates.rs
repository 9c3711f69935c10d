//! `SUMIFS`, `COUNTIFS` and `AVERAGEIFS`.
//!
//! Each criterion may itself be an array. The result then has one cell per
//! criteria position (the criteria grids broadcast against each other), and
//! each result cell filters the ranges with the criteria found at that
//! position.

use super::super::utils::value_error;
use crate::broadcast::ArrayCalculateType;
use crate::criteria::{Criterion, and_masks};
use crate::function::Function;
use crate::func_caps;
use crate::value::{ArrayValue, CalcValue, ScalarValue};
use cellarray_common::{ExcelError, ExcelErrorKind};
use smallvec::SmallVec;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IfsReduce {
    Sum,
    Count,
    Average,
}

impl IfsReduce {
    fn name(self) -> &'static str {
        match self {
            IfsReduce::Sum => "SUMIFS",
            IfsReduce::Count => "COUNTIFS",
            IfsReduce::Average => "AVERAGEIFS",
        }
    }

    /// Result for a position some criteria grid does not reach.
    fn missing(self) -> ScalarValue {
        match self {
            IfsReduce::Average => ScalarValue::Error(ExcelErrorKind::Div),
            _ => ScalarValue::Number(0.0),
        }
    }
}

struct CriteriaPair {
    range: Rc<ArrayValue>,
    criteria: Rc<ArrayValue>,
    layout: ArrayCalculateType,
    /// Mask for a 1×1 criteria grid, shared by every result position.
    fixed_mask: Option<ArrayValue>,
}

impl CriteriaPair {
    fn mask_at(&self, row: usize, column: usize) -> Option<ArrayValue> {
        if let Some(mask) = &self.fixed_mask {
            return Some(mask.clone());
        }
        let value = self.layout.pick(self.criteria.values(), row, column)?;
        Some(Criterion::parse(value).mask(&self.range))
    }
}

/// Criteria pairs rarely exceed a handful.
type Pairs = SmallVec<[CriteriaPair; 4]>;

fn build_pairs(reduce: IfsReduce, args: &[CalcValue]) -> Result<Pairs, ExcelError> {
    if args.is_empty() || args.len() % 2 != 0 {
        return Err(value_error(reduce.name(), "expected range/criteria pairs"));
    }
    let mut pairs = Pairs::with_capacity(args.len() / 2);
    for chunk in args.chunks_exact(2) {
        let range = chunk[0].clone().into_array();
        let criteria = chunk[1].clone().into_array();
        let (rows, columns) = (criteria.row_count(), criteria.column_count());
        let layout = ArrayCalculateType::classify(rows, columns);
        let fixed_mask = (layout == ArrayCalculateType::Single)
            .then(|| Criterion::parse(&criteria.get(0, 0)).mask(&range));
        pairs.push(CriteriaPair {
            range,
            criteria,
            layout,
            fixed_mask,
        });
    }
    Ok(pairs)
}

fn evaluate_ifs(
    reduce: IfsReduce,
    target: Option<Rc<ArrayValue>>,
    criteria_args: &[CalcValue],
) -> Result<CalcValue, ExcelError> {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("ifs", function = reduce.name(), pairs = criteria_args.len() / 2).entered();

    let pairs = build_pairs(reduce, criteria_args)?;
    let shape = match (&target, pairs.first()) {
        (Some(t), _) => (t.row_count(), t.column_count()),
        (None, Some(p)) => (p.range.row_count(), p.range.column_count()),
        (None, None) => return Err(value_error(reduce.name(), "no criteria")),
    };
    if pairs
        .iter()
        .any(|p| (p.range.row_count(), p.range.column_count()) != shape)
    {
        return Err(value_error(reduce.name(), "ranges must share one shape"));
    }

    let rows = pairs.iter().map(|p| p.criteria.row_count()).max().unwrap_or(1);
    let columns = pairs.iter().map(|p| p.criteria.column_count()).max().unwrap_or(1);

    let mut out = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut row = Vec::with_capacity(columns);
        for c in 0..columns {
            row.push(reduce_at(reduce, target.as_deref(), &pairs, r, c));
        }
        out.push(row);
    }
    Ok(CalcValue::Array(Rc::new(ArrayValue::from_parts(out, columns))))
}

fn reduce_at(
    reduce: IfsReduce,
    target: Option<&ArrayValue>,
    pairs: &[CriteriaPair],
    row: usize,
    column: usize,
) -> ScalarValue {
    let mut combined: Option<ArrayValue> = None;
    for pair in pairs {
        let Some(mask) = pair.mask_at(row, column) else {
            return reduce.missing();
        };
        combined = Some(match combined {
            Some(acc) => and_masks(&acc, &mask),
            None => mask,
        });
    }
    let Some(mask) = combined else {
        return reduce.missing();
    };
    match (reduce, target) {
        (IfsReduce::Count, _) | (_, None) => {
            ScalarValue::Number(mask.cells().filter(|(_, _, v)| v.is_true()).count() as f64)
        }
        (IfsReduce::Sum, Some(t)) => t.pick(&mask).sum(),
        (IfsReduce::Average, Some(t)) => t.pick(&mask).mean(),
    }
}

/* ─────────────────────────── SUMIFS() ──────────────────────────── */

#[derive(Debug)]
pub struct SumIfsFn;

/// Sums `sum_range` cells where every `(range, criteria)` pair matches.
///
/// ```text
/// =SUMIFS({1;1;1}, {2;3;4}, ">2")          → {2}
/// =SUMIFS({1;1;1}, {2;3;4}, {">2";">3"})   → {2;1}
/// ```
impl Function for SumIfsFn {
    func_caps!(PURE, REDUCTION, CRITERIA, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "SUMIFS"
    }
    fn min_args(&self) -> usize {
        3
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let target = args[0].clone().into_array();
        evaluate_ifs(IfsReduce::Sum, Some(target), &args[1..])
    }
}

/* ─────────────────────────── COUNTIFS() ──────────────────────────── */

#[derive(Debug)]
pub struct CountIfsFn;

impl Function for CountIfsFn {
    func_caps!(PURE, REDUCTION, CRITERIA);

    fn name(&self) -> &'static str {
        "COUNTIFS"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        evaluate_ifs(IfsReduce::Count, None, args)
    }
}

/* ─────────────────────────── AVERAGEIFS() ──────────────────────────── */

#[derive(Debug)]
pub struct AverageIfsFn;

/// Mean of the matching number cells; `#DIV/0!` when none match.
impl Function for AverageIfsFn {
    func_caps!(PURE, REDUCTION, CRITERIA, NUMERIC_ONLY);

    fn name(&self) -> &'static str {
        "AVERAGEIFS"
    }
    fn min_args(&self) -> usize {
        3
    }
    fn calculate(&self, args: &[CalcValue]) -> Result<CalcValue, ExcelError> {
        let target = args[0].clone().into_array();
        evaluate_ifs(IfsReduce::Average, Some(target), &args[1..])
    }
}

pub fn register_builtins() {
    crate::register_functions!(SumIfsFn, CountIfsFn, AverageIfsFn);
}
