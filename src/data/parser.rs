use std::sync::LazyLock;

use regex::Regex;

use super::model::Record;

/// A token counts as data when it contains digits anywhere, e.g. `123`,
/// `123.45`, `.45` or `M3a1`.
static NUMERIC_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.?\d*").expect("numeric token pattern is valid"));

/// Whether a single whitespace-delimited token is kept.
pub fn is_numeric_token(token: &str) -> bool {
    NUMERIC_TOKEN.is_match(token)
}

/// Turn one line of text into a record.
///
/// Returns `None` when no token survives the filter; malformed lines are
/// never an error.
pub fn parse_record(line: &str, line_no: usize) -> Option<Record> {
    let tokens: Vec<String> = line
        .split_whitespace()
        .filter(|tok| is_numeric_token(tok))
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(Record::new(tokens, line_no))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_tokens_with_digits() {
        let rec = parse_record("  2024-01-05 DM 56.3 snr 12.1 M3 x 7 8 9 1.234 ", 4).unwrap();
        assert_eq!(
            rec.tokens,
            ["2024-01-05", "56.3", "12.1", "M3", "7", "8", "9", "1.234"]
        );
        assert_eq!(rec.line, 4);
    }

    #[test]
    fn accepts_leading_dot_and_embedded_digits() {
        assert!(is_numeric_token(".45"));
        assert!(is_numeric_token("123."));
        assert!(is_numeric_token("M3a1"));
        assert!(!is_numeric_token("abc"));
        assert!(!is_numeric_token("."));
        assert!(!is_numeric_token("-"));
    }

    #[test]
    fn lines_without_numbers_yield_nothing() {
        assert!(parse_record("", 1).is_none());
        assert!(parse_record("   \t ", 1).is_none());
        assert!(parse_record("header only here", 1).is_none());
    }
}
