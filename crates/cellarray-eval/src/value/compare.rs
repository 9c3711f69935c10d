//! Comparison operators, cross-type ordering and wildcard matching.

use super::ScalarValue;
use std::cmp::Ordering;

/// A comparison operator as it appears in a formula or a criteria string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareToken {
    Equals,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl CompareToken {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEqual => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
        }
    }

    /// Split a leading operator off `s`. Two-character operators are tried
    /// first so `">=5"` is not read as `>` followed by `"=5"`.
    pub fn split_prefix(s: &str) -> Option<(Self, &str)> {
        const TOKENS: [CompareToken; 6] = [
            CompareToken::GreaterThanOrEqual,
            CompareToken::LessThanOrEqual,
            CompareToken::NotEqual,
            CompareToken::GreaterThan,
            CompareToken::LessThan,
            CompareToken::Equals,
        ];
        TOKENS
            .into_iter()
            .find_map(|t| s.strip_prefix(t.as_str()).map(|rest| (t, rest)))
    }

    pub fn evaluate(self, ord: Ordering) -> bool {
        match self {
            Self::Equals => ord == Ordering::Equal,
            Self::NotEqual => ord != Ordering::Equal,
            Self::GreaterThan => ord == Ordering::Greater,
            Self::GreaterThanOrEqual => ord != Ordering::Less,
            Self::LessThan => ord == Ordering::Less,
            Self::LessThanOrEqual => ord != Ordering::Greater,
        }
    }

    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Equals | Self::NotEqual)
    }
}

/// Numbers sort before text, text before logicals.
fn type_rank(v: &ScalarValue) -> u8 {
    match v {
        ScalarValue::Number(_) => 0,
        ScalarValue::String(_) => 1,
        ScalarValue::Boolean(_) => 2,
        ScalarValue::Null => 3,
        ScalarValue::Error(_) => 4,
    }
}

/// Ordering used by comparison operators. A blank takes the blank value of
/// the other side's type (0, "" or FALSE). Text compares case-insensitively.
/// Callers must have handled error operands already.
pub(crate) fn compare_values(a: &ScalarValue, b: &ScalarValue) -> Ordering {
    use ScalarValue::*;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, other) => compare_values(&other.blank_like(), other),
        (other, Null) => compare_values(other, &other.blank_like()),
        (Number(x), Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (String(x), String(y)) => compare_text(x, y),
        (Boolean(x), Boolean(y)) => x.cmp(y),
        (x, y) => type_rank(x).cmp(&type_rank(y)),
    }
}

pub(crate) fn compare_text(a: &str, b: &str) -> Ordering {
    if a.is_ascii() && b.is_ascii() {
        let lhs = a.bytes().map(|c| c.to_ascii_lowercase());
        let rhs = b.bytes().map(|c| c.to_ascii_lowercase());
        return lhs.cmp(rhs);
    }
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Total order used by in-place sorts: numbers, text, logicals, blanks,
/// then errors.
pub(crate) fn sort_order(a: &ScalarValue, b: &ScalarValue) -> Ordering {
    use ScalarValue::*;
    match (a, b) {
        (Number(x), Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (String(x), String(y)) => compare_text(x, y),
        (Boolean(x), Boolean(y)) => x.cmp(y),
        (Error(x), Error(y)) => x.cmp(y),
        (x, y) => type_rank(x).cmp(&type_rank(y)),
    }
}

pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '~'])
}

/// Spreadsheet wildcard match: `*` any run, `?` any single character,
/// `~` escapes the next character. Case-insensitive.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    #[derive(Clone, Copy, Debug)]
    enum Token {
        AnySeq,
        AnyChar,
        Lit(char),
    }

    let mut tokens: Vec<Token> = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '~' => {
                if let Some(next) = chars.next() {
                    tokens.push(Token::Lit(next));
                }
            }
            '*' => {
                if !matches!(tokens.last(), Some(Token::AnySeq)) {
                    tokens.push(Token::AnySeq);
                }
            }
            '?' => tokens.push(Token::AnyChar),
            c => tokens.push(Token::Lit(c)),
        }
    }

    let text: Vec<char> = text.chars().collect();
    let eq = |a: char, b: char| a == b || a.to_lowercase().eq(b.to_lowercase());

    // Greedy with a single backtrack point for the last `*`.
    let (mut ti, mut si) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while si < text.len() {
        match tokens.get(ti) {
            Some(Token::AnySeq) => {
                star = Some((ti, si));
                ti += 1;
                continue;
            }
            Some(Token::AnyChar) => {
                ti += 1;
                si += 1;
                continue;
            }
            Some(Token::Lit(c)) if eq(*c, text[si]) => {
                ti += 1;
                si += 1;
                continue;
            }
            _ => {}
        }
        match star {
            Some((star_ti, star_si)) => {
                ti = star_ti + 1;
                si = star_si + 1;
                star = Some((star_ti, star_si + 1));
            }
            None => return false,
        }
    }
    tokens[ti..].iter().all(|t| matches!(t, Token::AnySeq))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_prefix_prefers_two_char_tokens() {
        assert_eq!(
            CompareToken::split_prefix(">=5"),
            Some((CompareToken::GreaterThanOrEqual, "5"))
        );
        assert_eq!(
            CompareToken::split_prefix("<>a"),
            Some((CompareToken::NotEqual, "a"))
        );
        assert_eq!(CompareToken::split_prefix("=").map(|p| p.0), Some(CompareToken::Equals));
        assert_eq!(CompareToken::split_prefix("5"), None);
    }

    #[test]
    fn cross_type_ordering() {
        let n = ScalarValue::Number(100.0);
        let s = ScalarValue::from("a");
        let b = ScalarValue::Boolean(false);
        assert_eq!(compare_values(&n, &s), Ordering::Less);
        assert_eq!(compare_values(&s, &b), Ordering::Less);
        assert_eq!(compare_values(&ScalarValue::Null, &ScalarValue::Number(0.0)), Ordering::Equal);
        assert_eq!(compare_values(&ScalarValue::from(""), &ScalarValue::Null), Ordering::Equal);
        assert_eq!(compare_values(&ScalarValue::from("ABC"), &ScalarValue::from("abc")), Ordering::Equal);
    }

    #[test]
    fn wildcards() {
        assert!(wildcard_match("a*", "Apple"));
        assert!(wildcard_match("*le", "apple"));
        assert!(wildcard_match("a?p*", "appLE"));
        assert!(wildcard_match("*", ""));
        assert!(!wildcard_match("a?", "a"));
        assert!(wildcard_match("~*", "*"));
        assert!(!wildcard_match("~*", "x"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXbYY"));
    }
}
