//! The "current cell" a value was read from.
//!
//! A resolver that turns a sheet range into an array records the unit
//! (workbook), the sheet and the zero-based top-left cell of that range. The
//! engine uses it for nothing but keying its per-column inverted index.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellContext {
    pub unit_id: Arc<str>,
    pub sheet_id: Arc<str>,
    pub row: u32,
    pub column: u32,
}

impl CellContext {
    pub fn new(unit_id: impl Into<Arc<str>>, sheet_id: impl Into<Arc<str>>, row: u32, column: u32) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            row,
            column,
        }
    }

    /// The same sheet, shifted by a row/column offset.
    pub fn offset(&self, rows: u32, columns: u32) -> Self {
        Self {
            unit_id: Arc::clone(&self.unit_id),
            sheet_id: Arc::clone(&self.sheet_id),
            row: self.row + rows,
            column: self.column + columns,
        }
    }
}

impl fmt::Display for CellContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}!R{}C{}",
            self.unit_id,
            self.sheet_id,
            self.row + 1,
            self.column + 1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_keeps_sheet() {
        let ctx = CellContext::new("book", "s1", 4, 2);
        let moved = ctx.offset(1, 3);
        assert_eq!(moved.row, 5);
        assert_eq!(moved.column, 5);
        assert!(Arc::ptr_eq(&ctx.sheet_id, &moved.sheet_id));
        assert_eq!(ctx.to_string(), "book/s1!R5C3");
    }
}
