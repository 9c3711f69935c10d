//! Rectangular arrays of scalars: broadcasting operators, reductions,
//! reshaping and search.

use super::compare::{compare_text, has_wildcard, sort_order};
use super::factory::transform_to_value;
use super::{CalcValue, CompareToken, ScalarValue};
use crate::broadcast::{BatchOperator, ProductFn, combine};
use crate::inverted_index::{ColumnKey, IndexKey};
use crate::session::EvalEnv;
use cellarray_common::{CellContext, ExcelErrorKind, RawValue};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{ControlFlow, RangeInclusive};
use std::rc::Rc;
use std::sync::Arc;

const DEFAULT_SLICE_CACHE_ENTRIES: usize = 64;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ArrayError {
    #[error("cell ({row}, {column}) is outside a {rows}x{columns} array")]
    OutOfBounds {
        row: usize,
        column: usize,
        rows: usize,
        columns: usize,
    },
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("an array needs at least one row and one column")]
    Empty,
    #[error("sort index {index} is outside 0..{extent}")]
    SortIndex { index: usize, extent: usize },
}

/// Where an array's top-left cell lives. An axis of `None` means the array
/// is not a contiguous window onto a sheet column, so the inverted index is
/// neither consulted nor fed for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayOrigin {
    pub unit_id: Arc<str>,
    pub sheet_id: Arc<str>,
    pub row: Option<u32>,
    pub column: Option<u32>,
}

impl ArrayOrigin {
    pub fn at(context: &CellContext) -> Self {
        Self {
            unit_id: Arc::clone(&context.unit_id),
            sheet_id: Arc::clone(&context.sheet_id),
            row: Some(context.row),
            column: Some(context.column),
        }
    }

    pub fn is_positioned(&self) -> bool {
        self.row.is_some() && self.column.is_some()
    }
}

/// Inclusive bounds of the whole array in its own coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePosition {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

/// One axis of [`ArrayValue::slice`]: `start..stop` taking every `step`th
/// index. Missing bounds default to the whole axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SliceSpec {
    pub start: Option<usize>,
    pub stop: Option<usize>,
    pub step: Option<usize>,
}

impl SliceSpec {
    pub const ALL: SliceSpec = SliceSpec {
        start: None,
        stop: None,
        step: None,
    };

    pub fn new(start: Option<usize>, stop: Option<usize>, step: Option<usize>) -> Self {
        Self { start, stop, step }
    }

    pub fn range(start: usize, stop: usize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    pub fn starting_at(start: usize) -> Self {
        Self::new(Some(start), None, None)
    }

    /// `(start, stop, step)` with defaults applied, `stop` clamped to the
    /// extent and a zero step read as 1.
    fn normalize(self, extent: usize) -> (usize, usize, usize) {
        let start = self.start.unwrap_or(0);
        let stop = self.stop.unwrap_or(extent).min(extent);
        let step = self.step.filter(|s| *s > 0).unwrap_or(1);
        (start, stop, step)
    }
}

type SliceKey = (usize, usize, usize, usize, usize, usize);

/// Strings and numbers of an array in row-major order, each with its
/// flattened index. Booleans, blanks and errors are left out.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FlattenPosition {
    pub string_values: Vec<Arc<str>>,
    pub string_positions: Vec<usize>,
    pub number_values: Vec<f64>,
    pub number_positions: Vec<usize>,
}

/// Which side of the target an inexact search settles on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchType {
    /// Closest value below the target.
    #[default]
    Min,
    /// Closest value above the target.
    Max,
}

#[derive(Default)]
struct ArrayMemo {
    flatten: Option<Rc<ArrayValue>>,
    flatten_position: Option<Rc<FlattenPosition>>,
    slices: FxHashMap<SliceKey, Rc<ArrayValue>>,
}

pub struct ArrayValue {
    values: Vec<Vec<ScalarValue>>,
    rows: usize,
    columns: usize,
    origin: ArrayOrigin,
    env: Option<Rc<EvalEnv>>,
    memo: RefCell<ArrayMemo>,
}

macro_rules! elementwise_unary {
    ($($name:ident),* $(,)?) => {
        $(
            pub fn $name(&self) -> ArrayValue {
                self.map(|v, _, _| v.$name())
            }
        )*
    };
}

macro_rules! broadcast_operators {
    ($($name:ident => $op:ident),* $(,)?) => {
        $(
            pub fn $name(&self, operand: &CalcValue) -> ArrayValue {
                self.batch(operand, BatchOperator::$op)
            }
        )*
    };
}

macro_rules! inverse_operators {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            /// `value` on the left, each cell on the right.
            pub fn $name(&self, value: &ScalarValue) -> ArrayValue {
                self.map(|cell, _, _| value.$method(cell))
            }
        )*
    };
}

impl ArrayValue {
    /* ───────────────────── construction ───────────────────── */

    /// A detached array. Every row must have the same, non-zero length.
    pub fn new(values: Vec<Vec<ScalarValue>>) -> Result<Self, ArrayError> {
        let columns = values.first().map(Vec::len).ok_or(ArrayError::Empty)?;
        if columns == 0 {
            return Err(ArrayError::Empty);
        }
        if let Some((row, found)) = values
            .iter()
            .enumerate()
            .find_map(|(i, r)| (r.len() != columns).then_some((i, r.len())))
        {
            return Err(ArrayError::Ragged {
                row,
                expected: columns,
                found,
            });
        }
        Ok(Self::from_parts(values, columns))
    }

    pub fn from_scalar(value: ScalarValue) -> Self {
        Self::from_parts(vec![vec![value]], 1)
    }

    /// `rows × columns` copies of `value`; zero extents are raised to 1.
    pub fn filled(rows: usize, columns: usize, value: ScalarValue) -> Self {
        let columns = columns.max(1);
        Self::from_parts(vec![vec![value; columns]; rows.max(1)], columns)
    }

    /// Callers guarantee every row holds `columns` cells.
    pub(crate) fn from_parts(values: Vec<Vec<ScalarValue>>, columns: usize) -> Self {
        let rows = values.len().max(1);
        let values = if values.is_empty() { vec![Vec::new()] } else { values };
        Self {
            values,
            rows,
            columns,
            origin: ArrayOrigin::default(),
            env: None,
            memo: RefCell::default(),
        }
    }

    pub fn with_origin(mut self, origin: ArrayOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_env(mut self, env: Rc<EvalEnv>) -> Self {
        self.env = Some(env);
        self
    }

    /// A derived array: same unit, sheet and session; positioned at
    /// `(row, column)` only if this array is positioned itself.
    fn create_new_array(&self, values: Vec<Vec<ScalarValue>>, columns: usize, row: Option<u32>, column: Option<u32>) -> Self {
        let positioned = self.origin.is_positioned();
        let origin = ArrayOrigin {
            unit_id: Arc::clone(&self.origin.unit_id),
            sheet_id: Arc::clone(&self.origin.sheet_id),
            row: row.filter(|_| positioned),
            column: column.filter(|_| positioned),
        };
        let mut out = Self::from_parts(values, columns).with_origin(origin);
        out.env = self.env.clone();
        out
    }

    fn derived(&self, values: Vec<Vec<ScalarValue>>, columns: usize) -> Self {
        self.create_new_array(values, columns, None, None)
    }

    fn clear_memo(&self) {
        let mut memo = self.memo.borrow_mut();
        memo.flatten = None;
        memo.flatten_position = None;
        memo.slices.clear();
    }

    /// Called by every in-place mutation. The grid no longer mirrors the
    /// sheet cells at its origin, so it stops reading from or recording into
    /// the inverted index.
    fn mutated(&mut self) {
        self.clear_memo();
        self.origin.row = None;
        self.origin.column = None;
    }

    /* ───────────────────── access ───────────────────── */

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    /// `true` only for the 1×0 selection `pick` returns when nothing matched.
    pub fn is_empty(&self) -> bool {
        self.columns == 0
    }

    pub fn origin(&self) -> &ArrayOrigin {
        &self.origin
    }

    pub fn env(&self) -> Option<&Rc<EvalEnv>> {
        self.env.as_ref()
    }

    pub fn values(&self) -> &[Vec<ScalarValue>] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Vec<ScalarValue>> {
        self.values
    }

    /// The cell at `(row, column)`, or `Null` outside the array.
    pub fn get(&self, row: usize, column: usize) -> ScalarValue {
        self.get_real(row, column).cloned().unwrap_or(ScalarValue::Null)
    }

    pub fn get_real(&self, row: usize, column: usize) -> Option<&ScalarValue> {
        self.values.get(row)?.get(column)
    }

    pub fn set(&mut self, row: usize, column: usize, value: ScalarValue) -> Result<(), ArrayError> {
        if row >= self.rows || column >= self.columns {
            return Err(ArrayError::OutOfBounds {
                row,
                column,
                rows: self.rows,
                columns: self.columns,
            });
        }
        self.mutated();
        self.values[row][column] = value;
        Ok(())
    }

    /// Replace the whole grid. Keeps the unit, sheet and session but no
    /// longer counts as positioned.
    pub fn set_values(&mut self, values: Vec<Vec<ScalarValue>>) -> Result<(), ArrayError> {
        let checked = Self::new(values)?;
        self.mutated();
        self.rows = checked.rows;
        self.columns = checked.columns;
        self.values = checked.values;
        Ok(())
    }

    pub fn range_position(&self) -> RangePosition {
        RangePosition {
            start_row: 0,
            end_row: self.rows - 1,
            start_column: 0,
            end_column: self.columns.saturating_sub(1),
        }
    }

    /// Row-major walk; `Break` stops early.
    pub fn iterate(&self, mut f: impl FnMut(&ScalarValue, usize, usize) -> ControlFlow<()>) {
        for (r, row) in self.values.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if f(cell, r, c).is_break() {
                    return;
                }
            }
        }
    }

    /// Row-major walk from the last cell back to the first.
    pub fn iterate_reverse(&self, mut f: impl FnMut(&ScalarValue, usize, usize) -> ControlFlow<()>) {
        for (r, row) in self.values.iter().enumerate().rev() {
            for (c, cell) in row.iter().enumerate().rev() {
                if f(cell, r, c).is_break() {
                    return;
                }
            }
        }
    }

    /// `(row, column, cell)` in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &ScalarValue)> + '_ {
        self.values
            .iter()
            .enumerate()
            .flat_map(|(r, row)| row.iter().enumerate().map(move |(c, v)| (r, c, v)))
    }

    pub fn first_cell(&self) -> ScalarValue {
        self.get(0, 0)
    }

    pub fn last_cell(&self) -> ScalarValue {
        match self.columns {
            0 => ScalarValue::Null,
            n => self.get(self.rows - 1, n - 1),
        }
    }

    pub fn first_true_position(&self) -> Option<(usize, usize)> {
        self.cells().find(|(_, _, v)| v.is_true()).map(|(r, c, _)| (r, c))
    }

    pub fn last_true_position(&self) -> Option<(usize, usize)> {
        let mut found = None;
        self.iterate_reverse(|v, r, c| {
            if v.is_true() {
                found = Some((r, c));
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        });
        found
    }

    /* ───────────────────── reshaping ───────────────────── */

    /// The cells whose mask cell is `TRUE`, as one row. A mask of another
    /// shape yields a single blank.
    pub fn pick(&self, mask: &ArrayValue) -> ArrayValue {
        if mask.rows != self.rows || mask.columns != self.columns {
            return self.derived(vec![vec![ScalarValue::Null]], 1);
        }
        let picked: Vec<ScalarValue> = self
            .cells()
            .filter(|(r, c, _)| mask.values[*r][*c].is_true())
            .map(|(_, _, v)| v.clone())
            .collect();
        let columns = picked.len();
        self.derived(vec![picked], columns)
    }

    /// All cells as one row, row-major. Memoized until the next mutation.
    pub fn flatten(&self) -> Rc<ArrayValue> {
        if let Some(cached) = self.memo.borrow().flatten.clone() {
            #[cfg(feature = "tracing")]
            tracing::trace!("flatten memo hit");
            return cached;
        }
        let row: Vec<ScalarValue> = self.values.iter().flatten().cloned().collect();
        let columns = row.len();
        let flat = Rc::new(self.derived(vec![row], columns));
        self.memo.borrow_mut().flatten = Some(Rc::clone(&flat));
        flat
    }

    /// Memoized split of the cells into strings and numbers.
    pub fn flatten_position(&self) -> Rc<FlattenPosition> {
        if let Some(cached) = self.memo.borrow().flatten_position.clone() {
            return cached;
        }
        let mut out = FlattenPosition::default();
        for (i, cell) in self.values.iter().flatten().enumerate() {
            match cell {
                ScalarValue::String(s) => {
                    out.string_values.push(Arc::clone(s));
                    out.string_positions.push(i);
                }
                ScalarValue::Number(n) => {
                    out.number_values.push(*n);
                    out.number_positions.push(i);
                }
                _ => {}
            }
        }
        let out = Rc::new(out);
        self.memo.borrow_mut().flatten_position = Some(Rc::clone(&out));
        out
    }

    /// Sub-grid selection, `None` when a start lies past the edge or nothing
    /// is selected. The result keeps this array's position on an axis only
    /// when that axis is contiguous (step 1).
    pub fn slice(&self, rows: SliceSpec, columns: SliceSpec) -> Option<Rc<ArrayValue>> {
        let (r_start, r_stop, r_step) = rows.normalize(self.rows);
        let (c_start, c_stop, c_step) = columns.normalize(self.columns);
        if r_start >= self.rows || c_start >= self.columns {
            return None;
        }
        let key = (r_start, r_stop, r_step, c_start, c_stop, c_step);
        if let Some(hit) = self.memo.borrow().slices.get(&key).cloned() {
            #[cfg(feature = "tracing")]
            tracing::trace!(?key, "slice memo hit");
            return Some(hit);
        }

        let result: Vec<Vec<ScalarValue>> = (r_start..r_stop)
            .step_by(r_step)
            .map(|r| {
                (c_start..c_stop)
                    .step_by(c_step)
                    .map(|c| self.values[r][c].clone())
                    .collect::<Vec<_>>()
            })
            .collect();
        let width = result.first().map_or(0, Vec::len);
        if width == 0 {
            return None;
        }

        let shift = |at: Option<u32>, step: usize, start: usize| {
            at.filter(|_| step == 1)
                .and_then(|at| at.checked_add(u32::try_from(start).ok()?))
        };
        let row = shift(self.origin.row, r_step, r_start);
        let column = shift(self.origin.column, c_step, c_start);
        let sliced = Rc::new(self.create_new_array(result, width, row, column));

        let cap = self
            .env
            .as_ref()
            .map_or(DEFAULT_SLICE_CACHE_ENTRIES, |e| e.config.max_slice_cache_entries);
        if cap > 0 {
            let mut memo = self.memo.borrow_mut();
            if memo.slices.len() >= cap
                && let Some(first) = memo.slices.keys().next().copied()
            {
                memo.slices.remove(&first);
            }
            memo.slices.insert(key, Rc::clone(&sliced));
        }
        Some(sliced)
    }

    pub fn transpose(&self) -> ArrayValue {
        if self.columns == 0 {
            return self.derived(vec![Vec::new()], 0);
        }
        let transposed = (0..self.columns)
            .map(|c| self.values.iter().map(|row| row[c].clone()).collect())
            .collect();
        self.derived(transposed, self.rows)
    }

    /// Reorder columns by the values in row `index`. Stable; errors last.
    pub fn sort_by_row(&mut self, index: usize) -> Result<(), ArrayError> {
        if index >= self.rows {
            return Err(ArrayError::SortIndex {
                index,
                extent: self.rows,
            });
        }
        let key_row = &self.values[index];
        let mut order: Vec<usize> = (0..self.columns).collect();
        order.sort_by(|a, b| sort_cells(&key_row[*a], &key_row[*b]));
        self.mutated();
        for row in &mut self.values {
            let original = std::mem::take(row);
            let mut taken: Vec<Option<ScalarValue>> = original.into_iter().map(Some).collect();
            *row = order.iter().filter_map(|c| taken[*c].take()).collect();
        }
        Ok(())
    }

    /// Reorder rows by the values in column `index`. Stable; errors last.
    pub fn sort_by_column(&mut self, index: usize) -> Result<(), ArrayError> {
        if index >= self.columns {
            return Err(ArrayError::SortIndex {
                index,
                extent: self.columns,
            });
        }
        self.mutated();
        self.values.sort_by(|a, b| sort_cells(&a[index], &b[index]));
        Ok(())
    }

    /* ───────────────────── broadcasting ───────────────────── */

    broadcast_operators! {
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

    pub fn compare(&self, operand: &CalcValue, token: CompareToken) -> ArrayValue {
        self.batch(operand, BatchOperator::Compare(token))
    }

    /// Criteria comparison: text equality honours `*`, `?` and `~`.
    pub fn matches(&self, operand: &CalcValue, token: CompareToken) -> ArrayValue {
        self.batch(operand, BatchOperator::Matches(token))
    }

    pub fn product(&self, operand: &CalcValue, f: ProductFn<'_>) -> ArrayValue {
        self.batch(operand, BatchOperator::Product(f))
    }

    /// Apply `op` between every cell and `operand`.
    ///
    /// A scalar or 1×1 operand is applied to each column in turn, as is a
    /// single-row operand against a multi-column receiver (one operand cell
    /// per column). These column passes can be answered from the inverted
    /// index. Any other shape pairing goes through the cross broadcast rule.
    pub fn batch(&self, operand: &CalcValue, op: BatchOperator<'_>) -> ArrayValue {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("array_batch", op = op.name(), rows = self.rows, columns = self.columns).entered();

        match operand {
            CalcValue::Scalar(s) => {
                let per_column = vec![Some(s); self.columns];
                self.batch_by_column(&per_column, op)
            }
            CalcValue::Array(other) if other.rows == 1 && other.columns == 1 => {
                let cell = &other.values[0][0];
                let per_column = vec![Some(cell); self.columns];
                self.batch_by_column(&per_column, op)
            }
            CalcValue::Array(other) if other.rows == 1 && self.columns > 1 => {
                let columns = self.columns.max(other.columns);
                let per_column: Vec<Option<&ScalarValue>> = (0..columns).map(|c| other.values[0].get(c)).collect();
                self.batch_by_column(&per_column, op)
            }
            CalcValue::Array(other) => {
                let values = combine(
                    &self.values,
                    (self.rows, self.columns),
                    &other.values,
                    (other.rows, other.columns),
                    op,
                );
                let columns = self.columns.max(other.columns);
                self.derived(values, columns)
            }
        }
    }

    fn batch_by_column(&self, per_column: &[Option<&ScalarValue>], op: BatchOperator<'_>) -> ArrayValue {
        let columns = per_column.len();
        let mut result = vec![vec![ScalarValue::Null; columns]; self.rows];
        for (c, operand) in per_column.iter().enumerate() {
            match operand {
                Some(operand) if c < self.columns => self.column_pass(c, operand, op, &mut result),
                _ => result.iter_mut().for_each(|row| row[c] = ScalarValue::Error(ExcelErrorKind::Na)),
            }
        }
        self.derived(result, columns)
    }

    /// Index key and row span for column `c`, when this array may use the
    /// inverted index.
    fn index_slot(&self, c: usize) -> Option<(&EvalEnv, ColumnKey, RangeInclusive<u32>)> {
        let env = self.env.as_deref().filter(|e| e.index_enabled())?;
        let (row, column) = (self.origin.row?, self.origin.column?);
        // Grids that would reach past the last sheet row or column are never
        // indexed.
        let last_row = row.checked_add(u32::try_from(self.rows.checked_sub(1)?).ok()?)?;
        let column = column.checked_add(u32::try_from(c).ok()?)?;
        let key = ColumnKey::new(Arc::clone(&self.origin.unit_id), Arc::clone(&self.origin.sheet_id), column);
        Some((env, key, row..=last_row))
    }

    fn column_pass(&self, c: usize, operand: &ScalarValue, op: BatchOperator<'_>, result: &mut [Vec<ScalarValue>]) {
        let slot = self.index_slot(c);

        if let Some(token) = op.compare_token()
            && let Some((env, key, rows)) = &slot
            && !operand.is_error()
            && env.index.can_use_cache(key, rows)
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(column = key.column, start = rows.start(), end = rows.end(), "inverted index hit");
            let covered = env
                .index
                .with_column(key, |col| self.compare_from_index(col, rows, c, operand, token, op, result))
                .unwrap_or_default();
            // Rows the index did not cover fall back to a scan.
            for (r, hit) in covered.iter().enumerate() {
                if !hit {
                    result[r][c] = op.apply(&self.values[r][c], operand);
                }
            }
            if !covered.is_empty() {
                return;
            }
        }

        for (r, row) in self.values.iter().enumerate() {
            result[r][c] = op.apply(&row[c], operand);
        }

        if let Some((env, key, rows)) = slot {
            #[cfg(feature = "tracing")]
            tracing::debug!(column = key.column, start = rows.start(), end = rows.end(), "inverted index miss; recording");
            env.index
                .record_column(&key, *rows.start(), self.values.iter().map(|row| &row[c]));
        }
    }

    /// Fill column `c` of `result` from a column index. Returns which rows
    /// were written.
    fn compare_from_index(
        &self,
        col: &crate::inverted_index::ColumnIndex,
        span: &RangeInclusive<u32>,
        c: usize,
        operand: &ScalarValue,
        token: CompareToken,
        op: BatchOperator<'_>,
        result: &mut [Vec<ScalarValue>],
    ) -> Vec<bool> {
        let (start_row, end_row) = (*span.start(), *span.end());
        let mut covered = vec![false; self.rows];
        let mut write = |rows: &std::collections::BTreeSet<u32>, value: &ScalarValue| {
            for row in rows.range(start_row..=end_row) {
                let r = (row - start_row) as usize;
                result[r][c] = value.clone();
                covered[r] = true;
            }
        };

        let pattern = matches!(op, BatchOperator::Matches(_)) && operand.as_str().is_some_and(has_wildcard);
        if token == CompareToken::Equals && !operand.is_null() && !pattern {
            // Membership: only the operand's own key, blanks and errors can
            // produce anything but FALSE.
            let target = IndexKey::of(operand);
            for (key, rows) in col.entries() {
                let value = if *key == target {
                    ScalarValue::Boolean(true)
                } else {
                    match key {
                        IndexKey::Null => op.apply(&ScalarValue::Null, operand),
                        IndexKey::Error(e) => ScalarValue::Error(*e),
                        _ => ScalarValue::Boolean(false),
                    }
                };
                write(rows, &value);
            }
        } else {
            for (key, rows) in col.entries() {
                let value = op.apply(&key.to_scalar(), operand);
                write(rows, &value);
            }
        }
        covered
    }

    /* ───────────────────── element-wise ───────────────────── */

    /// Apply `f` to each non-error cell; error cells are copied through.
    pub fn map(&self, f: impl Fn(&ScalarValue, usize, usize) -> ScalarValue) -> ArrayValue {
        self.map_value(|v, r, c| if v.is_error() { v.clone() } else { f(v, r, c) })
    }

    /// Apply `f` to every cell, errors included.
    pub fn map_value(&self, f: impl Fn(&ScalarValue, usize, usize) -> ScalarValue) -> ArrayValue {
        let values = self
            .values
            .iter()
            .enumerate()
            .map(|(r, row)| row.iter().enumerate().map(|(c, v)| f(v, r, c)).collect())
            .collect();
        self.derived(values, self.columns)
    }

    inverse_operators! {
        mod_inverse => modulo,
        pow_inverse => pow,
        atan2_inverse => atan2,
        round_inverse => round,
        floor_inverse => floor,
        ceil_inverse => ceil,
    }

    elementwise_unary! {
        abs, sqrt, cbrt, exp, log, log10,
        sin, cos, tan, asin, acos, atan,
        tanh, asinh, acosh, atanh,
        reciprocal,
    }

    pub fn negative(&self) -> ArrayValue {
        let zero = ScalarValue::Number(0.0);
        self.map(|v, _, _| zero.minus(v))
    }

    pub fn to_value(&self) -> Vec<Vec<RawValue>> {
        transform_to_value(&self.values)
    }

    /* ───────────────────── reductions ───────────────────── */

    /// Sum of the number cells; text, logicals and blanks are ignored and
    /// the first error is returned.
    pub fn sum(&self) -> ScalarValue {
        match self.fold_numbers(0.0, |acc, n| acc + n) {
            Ok(total) => ScalarValue::number(total),
            Err(e) => ScalarValue::Error(e),
        }
    }

    pub fn max(&self) -> ScalarValue {
        match self.fold_numbers(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n)))) {
            Ok(m) => ScalarValue::Number(m.unwrap_or(0.0)),
            Err(e) => ScalarValue::Error(e),
        }
    }

    pub fn min(&self) -> ScalarValue {
        match self.fold_numbers(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.min(n)))) {
            Ok(m) => ScalarValue::Number(m.unwrap_or(0.0)),
            Err(e) => ScalarValue::Error(e),
        }
    }

    /// Number cells only; errors are not counted.
    pub fn count(&self) -> ScalarValue {
        ScalarValue::Number(self.cells().filter(|(_, _, v)| v.is_number()).count() as f64)
    }

    pub fn count_a(&self) -> ScalarValue {
        ScalarValue::Number(self.cells().filter(|(_, _, v)| !v.is_null()).count() as f64)
    }

    pub fn count_blank(&self) -> ScalarValue {
        ScalarValue::Number(self.cells().filter(|(_, _, v)| v.is_null()).count() as f64)
    }

    pub fn mean(&self) -> ScalarValue {
        let (total, count) = match self.fold_numbers((0.0, 0usize), |(s, k), n| (s + n, k + 1)) {
            Ok(acc) => acc,
            Err(e) => return ScalarValue::Error(e),
        };
        if count == 0 {
            return ScalarValue::Error(ExcelErrorKind::Div);
        }
        ScalarValue::number(total / count as f64)
    }

    /// Variance with `ddof` delta degrees of freedom (0 population, 1
    /// sample).
    pub fn var(&self, ddof: usize) -> ScalarValue {
        let numbers = match self.fold_numbers(Vec::new(), |mut v, n| {
            v.push(n);
            v
        }) {
            Ok(v) => v,
            Err(e) => return ScalarValue::Error(e),
        };
        if numbers.len() <= ddof {
            return ScalarValue::Error(ExcelErrorKind::Div);
        }
        let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
        let ss: f64 = numbers.iter().map(|x| (x - mean) * (x - mean)).sum();
        ScalarValue::number(ss / (numbers.len() - ddof) as f64)
    }

    pub fn std(&self, ddof: usize) -> ScalarValue {
        match self.var(ddof) {
            ScalarValue::Number(v) => ScalarValue::number(v.sqrt()),
            other => other,
        }
    }

    /// Median of the number cells; `#NUM!` when there are none.
    pub fn median(&self) -> ScalarValue {
        let mut numbers = self.flatten_position().number_values.clone();
        if numbers.is_empty() {
            return ScalarValue::Error(ExcelErrorKind::Num);
        }
        numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = numbers.len() / 2;
        let median = if numbers.len() % 2 == 0 {
            (numbers[mid - 1] + numbers[mid]) / 2.0
        } else {
            numbers[mid]
        };
        ScalarValue::number(median)
    }

    /// Fold the number cells in row-major order, stopping at the first error.
    fn fold_numbers<A>(&self, init: A, mut f: impl FnMut(A, f64) -> A) -> Result<A, ExcelErrorKind> {
        let mut acc = init;
        for cell in self.values.iter().flatten() {
            match cell {
                ScalarValue::Number(n) => acc = f(acc, *n),
                ScalarValue::Error(e) => return Err(*e),
                _ => {}
            }
        }
        Ok(acc)
    }

    /* ───────────────────── search ───────────────────── */

    /// Scan for `target`, forward or (when `is_desc`) backward. An exact
    /// match wins; otherwise the closest value strictly below (`Min`) or
    /// above (`Max`) the target, the first one found on ties. Blank and
    /// error cells are skipped.
    pub fn order_search(
        &self,
        target: &ScalarValue,
        search_type: SearchType,
        is_desc: bool,
        is_fuzzy: bool,
    ) -> Option<(usize, usize)> {
        let mut exact = None;
        let mut closest: Option<(usize, usize, Option<f64>)> = None;

        let mut visit = |cell: &ScalarValue, r: usize, c: usize| {
            if cell.is_null() || cell.is_error() {
                return ControlFlow::Continue(());
            }
            let matched = if is_fuzzy {
                cell.compare_wildcard(target, CompareToken::Equals)
            } else {
                cell.is_equal(target)
            };
            if matched.is_true() {
                exact = Some((r, c));
                return ControlFlow::Break(());
            }

            let on_side = match search_type {
                SearchType::Min => cell.is_less_than(target),
                SearchType::Max => cell.is_greater_than(target),
            };
            if on_side.is_true() {
                let distance = cell.minus(target).abs().as_number();
                let better = match (&closest, distance) {
                    (None, _) => true,
                    (Some((_, _, Some(best))), Some(d)) => d < *best,
                    _ => false,
                };
                if better {
                    closest = Some((r, c, distance));
                }
            }
            ControlFlow::Continue(())
        };

        if is_desc {
            self.iterate_reverse(&mut visit);
        } else {
            self.iterate(&mut visit);
        }
        exact.or(closest.map(|(r, c, _)| (r, c)))
    }

    /// Binary search over the same-typed cells, which the caller has sorted
    /// ascending. Returns a flattened index.
    pub fn binary_search(&self, target: &ScalarValue, search_type: SearchType) -> Option<usize> {
        let fp = self.flatten_position();
        match target {
            ScalarValue::String(s) => bisect(&fp.string_values, &fp.string_positions, search_type, |v| {
                compare_text(v, s)
            }),
            ScalarValue::Number(n) => bisect(&fp.number_values, &fp.number_positions, search_type, |v| {
                v.partial_cmp(n).unwrap_or(Ordering::Equal)
            }),
            _ => None,
        }
    }
}

fn bisect<T>(values: &[T], positions: &[usize], search_type: SearchType, cmp: impl Fn(&T) -> Ordering) -> Option<usize> {
    let (mut lo, mut hi) = (0usize, values.len());
    let mut last = None;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match cmp(&values[mid]) {
            Ordering::Equal => return positions.get(mid).copied(),
            Ordering::Less => {
                if search_type == SearchType::Min {
                    last = Some(mid);
                }
                lo = mid + 1;
            }
            Ordering::Greater => {
                if search_type == SearchType::Max {
                    last = Some(mid);
                }
                hi = mid;
            }
        }
    }
    last.and_then(|i| positions.get(i).copied())
}

fn sort_cells(a: &ScalarValue, b: &ScalarValue) -> Ordering {
    match (a.is_error(), b.is_error()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => sort_order(a, b),
    }
}

impl Clone for ArrayValue {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            rows: self.rows,
            columns: self.columns,
            origin: self.origin.clone(),
            env: self.env.clone(),
            memo: RefCell::default(),
        }
    }
}

impl PartialEq for ArrayValue {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.columns == other.columns && self.values == other.values
    }
}

impl fmt::Debug for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayValue")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("origin", &self.origin)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ArrayValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (r, row) in self.values.iter().enumerate() {
            if r > 0 {
                f.write_str(";")?;
            }
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(",")?;
                }
                match cell {
                    ScalarValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\""))?,
                    other => write!(f, "{other}")?,
                }
            }
        }
        f.write_str("}")
    }
}
