use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::Dialect;
use crate::keywords;
use crate::options::KeywordCase;
use crate::scanner;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").unwrap());

/// Byte ranges of keywords in plain code. A word right after a `.` is a
/// qualified column name, not a keyword.
fn keyword_ranges(text: &str, dialect: Option<Dialect>) -> Vec<Range<usize>> {
    let classification = scanner::classify(text);
    WORD.find_iter(text)
        .filter(|m| classification.is_code(m.start()))
        .filter(|m| !text[..m.start()].ends_with('.'))
        .filter(|m| keywords::is_keyword(m.as_str(), dialect))
        .map(|m| m.range())
        .collect()
}

/// Re-case every recognised keyword outside string literals and bracketed
/// identifiers. `Unchanged` returns the text as is.
pub fn apply_case(text: &str, case: KeywordCase, dialect: Option<Dialect>) -> String {
    if case == KeywordCase::Unchanged {
        return text.to_string();
    }

    let mut result = text.to_string();
    // Back to front, so earlier ranges stay valid.
    for range in keyword_ranges(text, dialect).into_iter().rev() {
        let word = &text[range.clone()];
        let recased = match case {
            KeywordCase::Uppercase => word.to_ascii_uppercase(),
            KeywordCase::Lowercase => word.to_ascii_lowercase(),
            KeywordCase::Unchanged => continue,
        };
        result.replace_range(range, &recased);
    }
    result
}

/// Number of recognised keywords in plain code.
pub fn count_keywords(text: &str, dialect: Option<Dialect>) -> usize {
    keyword_ranges(text, dialect).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_uppercase_keywords() {
        assert_eq!(
            apply_case("select id from users where active = 1", KeywordCase::Uppercase, None),
            "SELECT id FROM users WHERE active = 1"
        );
    }

    #[test]
    fn test_lowercase_keywords() {
        assert_eq!(
            apply_case("SELECT COUNT(*) FROM Users", KeywordCase::Lowercase, None),
            "select count(*) from Users"
        );
    }

    #[test]
    fn test_literals_are_untouched() {
        let sql = "select * from t where name = \"SELECT\" and note = 'from' and [order] = 1";
        assert_eq!(
            apply_case(sql, KeywordCase::Uppercase, None),
            "SELECT * FROM t WHERE name = \"SELECT\" AND note = 'from' AND [order] = 1"
        );
        assert_eq!(
            apply_case(sql, KeywordCase::Lowercase, None),
            "select * from t where name = \"SELECT\" and note = 'from' and [order] = 1"
        );
    }

    #[test]
    fn test_qualified_names_are_not_keywords() {
        assert_eq!(
            apply_case("select t.date from t", KeywordCase::Uppercase, None),
            "SELECT t.date FROM t"
        );
    }

    #[test]
    fn test_unchanged_is_identity() {
        let sql = "SeLeCt a FrOm b";
        assert_eq!(apply_case(sql, KeywordCase::Unchanged, None), sql);
    }

    #[test]
    fn test_dialect_extensions() {
        assert_eq!(
            apply_case("select * from t where a ilike 'x'", KeywordCase::Uppercase, Some(Dialect::PostgreSql)),
            "SELECT * FROM t WHERE a ILIKE 'x'"
        );
        assert_eq!(
            apply_case("select * from t where a ilike 'x'", KeywordCase::Uppercase, Some(Dialect::MySql)),
            "SELECT * FROM t WHERE a ilike 'x'"
        );
    }

    #[test]
    fn test_count_keywords() {
        assert_eq!(count_keywords("SELECT a FROM t WHERE b = 'WHERE'", None), 3);
    }
}
