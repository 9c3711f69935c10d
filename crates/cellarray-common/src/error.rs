//! Spreadsheet error codes and the richer error struct passed around by
//! function implementations.
//!
//! - **`ExcelErrorKind`** : the closed set of error codes a cell can hold
//! - **`ExcelError`**     : a kind plus an optional message and location
//!
//! Cells only ever carry the kind. The message/location pair exists for
//! callers (argument validation, diagnostics) that want to explain *why* an
//! error value was produced before it is flattened back into a cell.

use std::{error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All recognised error codes.
///
/// **Note:** names are CamelCase (idiomatic Rust) while `Display`
/// renders them exactly as a spreadsheet shows them (`#DIV/0!`, …).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExcelErrorKind {
    Null,
    Ref,
    Name,
    Value,
    Div,
    Na,
    Num,
    Error,
    NImpl,
    Spill,
    Calc,
    Circ,
    Cancelled,
}

impl ExcelErrorKind {
    pub const ALL: [ExcelErrorKind; 13] = [
        Self::Null,
        Self::Ref,
        Self::Name,
        Self::Value,
        Self::Div,
        Self::Na,
        Self::Num,
        Self::Error,
        Self::NImpl,
        Self::Spill,
        Self::Calc,
        Self::Circ,
        Self::Cancelled,
    ];

    /// The code exactly as rendered in a cell.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Null => "#NULL!",
            Self::Ref => "#REF!",
            Self::Name => "#NAME?",
            Self::Value => "#VALUE!",
            Self::Div => "#DIV/0!",
            Self::Na => "#N/A",
            Self::Num => "#NUM!",
            Self::Error => "#ERROR!",
            Self::NImpl => "#N/IMPL!",
            Self::Spill => "#SPILL!",
            Self::Calc => "#CALC!",
            Self::Circ => "#CIRC!",
            Self::Cancelled => "#CANCELLED!",
        }
    }

    /// Recognise an error code, ignoring surrounding whitespace and case.
    ///
    /// Returns `None` for anything that is not one of the known codes, so
    /// literal classification can fall through to the next rule.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if !s.starts_with('#') {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.code().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for ExcelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Where an error was raised, in zero-based sheet coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ErrorContext {
    pub row: Option<u32>,
    pub col: Option<u32>,
    pub sheet: Option<String>,
}

/// An error kind with optional human-readable explanation and location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExcelError {
    pub kind: ExcelErrorKind,
    pub message: Option<String>,
    pub context: Option<ErrorContext>,
}

impl From<ExcelErrorKind> for ExcelError {
    fn from(kind: ExcelErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
        }
    }
}

impl ExcelError {
    pub fn new(kind: ExcelErrorKind) -> Self {
        kind.into()
    }

    pub fn new_value() -> Self {
        Self::new(ExcelErrorKind::Value)
    }

    pub fn new_na() -> Self {
        Self::new(ExcelErrorKind::Na)
    }

    pub fn new_div() -> Self {
        Self::new(ExcelErrorKind::Div)
    }

    pub fn new_num() -> Self {
        Self::new(ExcelErrorKind::Num)
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the location the error was raised at.
    pub fn with_location(mut self, sheet: Option<String>, row: u32, col: u32) -> Self {
        self.context = Some(ErrorContext {
            row: Some(row),
            col: Some(col),
            sheet,
        });
        self
    }

    /// Parse an error code; unknown text becomes `#VALUE!` carrying the text
    /// as its message.
    pub fn from_error_string(s: &str) -> Self {
        match ExcelErrorKind::parse(s) {
            Some(kind) => Self::new(kind),
            None => Self::new_value().with_message(format!("unknown error code '{s}'")),
        }
    }
}

impl fmt::Display for ExcelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }

        if let Some(ref ctx) = self.context
            && let (Some(r), Some(c)) = (ctx.row, ctx.col)
        {
            match ctx.sheet {
                Some(ref sheet) => write!(f, " [{sheet}!R{r}C{c}]")?,
                None => write!(f, " [R{r}C{c}]")?,
            }
        }

        Ok(())
    }
}

impl Error for ExcelError {}

impl PartialEq<str> for ExcelErrorKind {
    fn eq(&self, other: &str) -> bool {
        self.code() == other
    }
}

impl PartialEq<&str> for ExcelError {
    fn eq(&self, other: &&str) -> bool {
        self.kind.code() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_and_space_insensitive() {
        assert_eq!(ExcelErrorKind::parse(" #n/a "), Some(ExcelErrorKind::Na));
        assert_eq!(ExcelErrorKind::parse("#DIV/0!"), Some(ExcelErrorKind::Div));
        assert_eq!(ExcelErrorKind::parse("#name?"), Some(ExcelErrorKind::Name));
    }

    #[test]
    fn parse_rejects_unknown_codes() {
        assert_eq!(ExcelErrorKind::parse("#WHAT"), None);
        assert_eq!(ExcelErrorKind::parse("N/A"), None);
        assert_eq!(ExcelErrorKind::parse(""), None);
    }

    #[test]
    fn every_code_roundtrips() {
        for kind in ExcelErrorKind::ALL {
            assert_eq!(ExcelErrorKind::parse(&kind.to_string()), Some(kind));
        }
    }

    #[test]
    fn display_includes_message_and_location() {
        let err = ExcelError::new_value()
            .with_message("bad shape")
            .with_location(Some("Sheet1".into()), 2, 3);
        assert_eq!(err.to_string(), "#VALUE!: bad shape [Sheet1!R2C3]");
        assert!(err == "#VALUE!");
    }

    #[test]
    fn unknown_error_string_degrades_to_value() {
        let err = ExcelError::from_error_string("#BOGUS");
        assert_eq!(err.kind, ExcelErrorKind::Value);
        assert!(err.message.is_some());
    }
}
