//! Per-column value → rows index used to answer repeated comparisons
//! against the same sheet column without rescanning it.
//!
//! Each indexed column carries a *watermark*: one contiguous row range whose
//! cells are all known to be recorded. A lookup is only trusted when the
//! requested rows sit inside the watermark. The index never observes sheet
//! edits, so the host clears it (or the affected unit/sheet/column) when
//! data changes.

use crate::value::ScalarValue;
use cellarray_common::ExcelErrorKind;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Normalised cell value used as the index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    /// `f64` bits with `-0.0` folded onto `0.0`.
    Number(u64),
    /// Lower-cased text.
    Text(Box<str>),
    Boolean(bool),
    Null,
    Error(ExcelErrorKind),
}

impl IndexKey {
    pub fn of(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                IndexKey::Number(n.to_bits())
            }
            ScalarValue::String(s) => IndexKey::Text(s.to_lowercase().into_boxed_str()),
            ScalarValue::Boolean(b) => IndexKey::Boolean(*b),
            ScalarValue::Null => IndexKey::Null,
            ScalarValue::Error(e) => IndexKey::Error(*e),
        }
    }

    /// A representative value. Text comes back lower-cased, which compares
    /// the same as the original under case-insensitive rules.
    pub fn to_scalar(&self) -> ScalarValue {
        match self {
            IndexKey::Number(bits) => ScalarValue::Number(f64::from_bits(*bits)),
            IndexKey::Text(s) => ScalarValue::String(Arc::from(&**s)),
            IndexKey::Boolean(b) => ScalarValue::Boolean(*b),
            IndexKey::Null => ScalarValue::Null,
            IndexKey::Error(e) => ScalarValue::Error(*e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub unit_id: Arc<str>,
    pub sheet_id: Arc<str>,
    pub column: u32,
}

impl ColumnKey {
    pub fn new(unit_id: impl Into<Arc<str>>, sheet_id: impl Into<Arc<str>>, column: u32) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            column,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ColumnIndex {
    positions: FxHashMap<IndexKey, BTreeSet<u32>>,
    watermark: Option<RangeInclusive<u32>>,
}

impl ColumnIndex {
    /// Rows holding `key`.
    pub fn rows(&self, key: &IndexKey) -> Option<&BTreeSet<u32>> {
        self.positions.get(key)
    }

    /// Every distinct value with its rows.
    pub fn entries(&self) -> impl Iterator<Item = (&IndexKey, &BTreeSet<u32>)> {
        self.positions.iter()
    }

    pub fn watermark(&self) -> Option<&RangeInclusive<u32>> {
        self.watermark.as_ref()
    }

    pub fn covers(&self, rows: &RangeInclusive<u32>) -> bool {
        self.watermark
            .as_ref()
            .is_some_and(|w| w.start() <= rows.start() && rows.end() <= w.end())
    }

    fn record(&mut self, key: IndexKey, row: u32) {
        self.positions.entry(key).or_default().insert(row);
    }

    /// Merge `rows` into the watermark: overlapping or adjacent ranges are
    /// unioned; a disjoint range replaces the current one only if it is
    /// longer.
    fn extend_watermark(&mut self, rows: RangeInclusive<u32>) {
        let next = match self.watermark.take() {
            None => rows,
            Some(current) => {
                let touches = rows.start().saturating_sub(1) <= *current.end()
                    && current.start().saturating_sub(1) <= *rows.end();
                if touches {
                    *current.start().min(rows.start())..=*current.end().max(rows.end())
                } else if rows.end() - rows.start() > current.end() - current.start() {
                    rows
                } else {
                    current
                }
            }
        };
        self.watermark = Some(next);
    }
}

/// The index itself. Interior mutability lets arrays record into it while
/// only holding a shared handle.
#[derive(Debug, Default)]
pub struct InvertedIndexCache {
    columns: RefCell<FxHashMap<ColumnKey, ColumnIndex>>,
    max_columns: Option<usize>,
}

impl InvertedIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_columns(max_columns: Option<usize>) -> Self {
        Self {
            columns: RefCell::default(),
            max_columns,
        }
    }

    fn with_column_mut<R>(&self, key: &ColumnKey, f: impl FnOnce(&mut ColumnIndex) -> R) -> Option<R> {
        let mut columns = self.columns.borrow_mut();
        if !columns.contains_key(key) {
            if self.max_columns == Some(0) {
                return None;
            }
            // At capacity: drop the first key to make room.
            if let Some(limit) = self.max_columns
                && columns.len() >= limit
                && let Some(first) = columns.keys().next().cloned()
            {
                #[cfg(feature = "tracing")]
                tracing::debug!(unit = %first.unit_id, sheet = %first.sheet_id, column = first.column, "inverted index evict");
                columns.remove(&first);
            }
        }
        Some(f(columns.entry(key.clone()).or_default()))
    }

    /// Record that `row` of the column holds `value`.
    pub fn set(&self, key: &ColumnKey, value: &ScalarValue, row: u32) {
        self.with_column_mut(key, |col| col.record(IndexKey::of(value), row));
    }

    /// Record a contiguous run of cells starting at `start_row` and extend
    /// the watermark over it.
    pub fn record_column<'v>(&self, key: &ColumnKey, start_row: u32, cells: impl IntoIterator<Item = &'v ScalarValue>) {
        self.with_column_mut(key, |col| {
            let mut end = None;
            for (offset, cell) in cells.into_iter().enumerate() {
                let Some(row) = u32::try_from(offset).ok().and_then(|o| start_row.checked_add(o)) else {
                    break;
                };
                col.record(IndexKey::of(cell), row);
                end = Some(row);
            }
            if let Some(end) = end {
                col.extend_watermark(start_row..=end);
                #[cfg(feature = "tracing")]
                tracing::debug!(column = key.column, start_row, end, watermark = ?col.watermark, "inverted index watermark");
            }
        });
    }

    /// Mark `rows` of the column as completely recorded.
    pub fn extend_watermark(&self, key: &ColumnKey, rows: RangeInclusive<u32>) {
        if rows.is_empty() {
            return;
        }
        self.with_column_mut(key, |col| col.extend_watermark(rows));
    }

    /// `true` when every row of `rows` is known to be recorded.
    pub fn can_use_cache(&self, key: &ColumnKey, rows: &RangeInclusive<u32>) -> bool {
        self.columns.borrow().get(key).is_some_and(|col| col.covers(rows))
    }

    /// Run `f` against a column's index if one exists.
    pub fn with_column<R>(&self, key: &ColumnKey, f: impl FnOnce(&ColumnIndex) -> R) -> Option<R> {
        self.columns.borrow().get(key).map(f)
    }

    /// Rows of the column holding a value equal to `value`.
    pub fn cell_positions(&self, key: &ColumnKey, value: &ScalarValue) -> Option<BTreeSet<u32>> {
        self.with_column(key, |col| col.rows(&IndexKey::of(value)).cloned())
            .flatten()
    }

    pub fn clear(&self) {
        self.columns.borrow_mut().clear();
    }

    pub fn clear_unit(&self, unit_id: &str) {
        self.columns.borrow_mut().retain(|k, _| &*k.unit_id != unit_id);
    }

    pub fn clear_sheet(&self, unit_id: &str, sheet_id: &str) {
        self.columns
            .borrow_mut()
            .retain(|k, _| !(&*k.unit_id == unit_id && &*k.sheet_id == sheet_id));
    }

    pub fn clear_column(&self, key: &ColumnKey) {
        self.columns.borrow_mut().remove(key);
    }

    /// Number of indexed columns.
    pub fn len(&self) -> usize {
        self.columns.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(col: u32) -> ColumnKey {
        ColumnKey::new("book", "s1", col)
    }

    #[test]
    fn keys_normalise_case_and_negative_zero() {
        assert_eq!(IndexKey::of(&ScalarValue::from("ABC")), IndexKey::of(&ScalarValue::from("abc")));
        assert_eq!(IndexKey::of(&ScalarValue::Number(-0.0)), IndexKey::of(&ScalarValue::Number(0.0)));
        assert_ne!(IndexKey::of(&ScalarValue::Number(1.0)), IndexKey::of(&ScalarValue::from("1")));
    }

    #[test]
    fn record_column_sets_watermark() {
        let cache = InvertedIndexCache::new();
        let cells = [ScalarValue::Number(1.0), ScalarValue::from("a"), ScalarValue::Number(1.0)];
        cache.record_column(&key(2), 10, &cells);

        assert!(cache.can_use_cache(&key(2), &(10..=12)));
        assert!(cache.can_use_cache(&key(2), &(11..=11)));
        assert!(!cache.can_use_cache(&key(2), &(9..=12)));
        assert!(!cache.can_use_cache(&key(3), &(10..=12)));

        let rows = cache.cell_positions(&key(2), &ScalarValue::Number(1.0)).unwrap();
        assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![10, 12]);
        let rows = cache.cell_positions(&key(2), &ScalarValue::from("A")).unwrap();
        assert_eq!(rows.into_iter().collect::<Vec<_>>(), vec![11]);
    }

    #[test]
    fn watermark_merges_adjacent_and_keeps_longest_disjoint() {
        let cache = InvertedIndexCache::new();
        cache.extend_watermark(&key(0), 0..=4);
        cache.extend_watermark(&key(0), 5..=9);
        assert!(cache.can_use_cache(&key(0), &(0..=9)));

        // shorter disjoint range is ignored
        cache.extend_watermark(&key(0), 20..=22);
        assert!(cache.can_use_cache(&key(0), &(0..=9)));
        assert!(!cache.can_use_cache(&key(0), &(20..=22)));

        // longer disjoint range replaces
        cache.extend_watermark(&key(0), 100..=150);
        assert!(!cache.can_use_cache(&key(0), &(0..=9)));
        assert!(cache.can_use_cache(&key(0), &(100..=150)));
    }

    #[test]
    fn clear_scopes() {
        let cache = InvertedIndexCache::new();
        cache.set(&ColumnKey::new("b1", "s1", 0), &ScalarValue::Null, 0);
        cache.set(&ColumnKey::new("b1", "s2", 0), &ScalarValue::Null, 0);
        cache.set(&ColumnKey::new("b2", "s1", 0), &ScalarValue::Null, 0);
        assert_eq!(cache.len(), 3);

        cache.clear_sheet("b1", "s1");
        assert_eq!(cache.len(), 2);
        cache.clear_unit("b1");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn max_columns_evicts() {
        let cache = InvertedIndexCache::with_max_columns(Some(2));
        for c in 0..5 {
            cache.set(&key(c), &ScalarValue::Number(c as f64), 0);
        }
        assert_eq!(cache.len(), 2);

        let disabled = InvertedIndexCache::with_max_columns(Some(0));
        disabled.set(&key(0), &ScalarValue::Null, 0);
        assert!(disabled.is_empty());
    }
}
