use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::ScanState;

static CTE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A[A-Za-z_]\w*\s*(?:\([^)]*\)\s*)?AS\s*\(").unwrap()
});

/// Keywords whose lines sit at the running parenthesis depth.
const BASE_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "OFFSET", "FETCH", "WINDOW",
    "QUALIFY", "RETURNING", "INSERT", "UPDATE", "DELETE", "VALUES", "SET", "UNION", "INTERSECT",
    "EXCEPT", "WITH", "CREATE", "ALTER", "DROP", "TRUNCATE", "MERGE", "REPLACE",
];

const JOIN_KEYWORDS: &[&str] = &["JOIN", "LEFT", "RIGHT", "INNER", "FULL", "CROSS", "NATURAL"];

/// Indentation state machine over the splitter's logical lines.
///
/// A running parenthesis depth gives the base level of each line and the
/// leading keyword picks the offset from it. While inside a `WITH` header, CTE
/// definition lines stay at column zero.
#[derive(Debug)]
pub struct Indenter {
    indent_size: usize,
}

#[derive(Debug, Default)]
struct IndentState {
    depth: usize,
    in_cte_header: bool,
    scan: ScanState,
}

impl Indenter {
    pub fn new(indent_size: usize) -> Self {
        Self { indent_size }
    }

    /// Indent every line and join them. Empty lines stay empty.
    pub fn indent(&self, lines: &[String]) -> String {
        let mut state = IndentState::default();
        let mut out = Vec::with_capacity(lines.len());

        for line in lines {
            if line.is_empty() {
                out.push(String::new());
                continue;
            }
            let first_word = leading_word(line);
            if first_word == "WITH" {
                state.in_cte_header = true;
            }
            let level = self.level(line, &first_word, &state);
            if first_word == "SELECT" && state.depth == 0 {
                state.in_cte_header = false;
            }

            out.push(format!("{}{}", " ".repeat(level * self.indent_size), line));
            self.track_depth(line, &mut state);
            if line.ends_with(';') {
                state.in_cte_header = false;
            }
        }
        out.join("\n")
    }

    fn level(&self, line: &str, first_word: &str, state: &IndentState) -> usize {
        let base = state.depth;
        if line.starts_with(')') {
            return base.saturating_sub(1);
        }
        if line.starts_with(';') {
            return base;
        }
        if state.in_cte_header && state.depth == 0 && CTE_DEFINITION.is_match(line) {
            return 0;
        }
        match first_word {
            w if BASE_KEYWORDS.contains(&w) => base,
            w if JOIN_KEYWORDS.contains(&w) => base + 1,
            "ON" | "WHEN" | "ELSE" | "OVER" => base + 2,
            // AND, OR, CASE, END and field lists
            _ => base + 1,
        }
    }

    fn track_depth(&self, line: &str, state: &mut IndentState) {
        for c in line.chars() {
            if !state.scan.advance(c) {
                continue;
            }
            match c {
                '(' => state.depth += 1,
                ')' => state.depth = state.depth.saturating_sub(1),
                _ => {}
            }
        }
    }
}

/// The first word of a line, upper-cased.
fn leading_word(line: &str) -> String {
    line.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn indent(lines: &[&str], size: usize) -> String {
        let lines: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        Indenter::new(size).indent(&lines)
    }

    #[test]
    fn test_clause_levels() {
        assert_eq!(
            indent(
                &[
                    "SELECT a",
                    "FROM t",
                    "LEFT JOIN u",
                    "ON t.id = u.id",
                    "WHERE a = 1",
                    "AND b = 2",
                    "ORDER BY a"
                ],
                2
            ),
            "SELECT a\nFROM t\n  LEFT JOIN u\n    ON t.id = u.id\nWHERE a = 1\n  AND b = 2\nORDER BY a"
        );
    }

    #[test]
    fn test_case_levels() {
        assert_eq!(
            indent(&["SELECT", "CASE", "WHEN a THEN 1", "ELSE 2", "END AS k", "FROM t"], 4),
            "SELECT\n    CASE\n        WHEN a THEN 1\n        ELSE 2\n    END AS k\nFROM t"
        );
    }

    #[test]
    fn test_subquery_depth() {
        assert_eq!(
            indent(&["SELECT *", "FROM (", "SELECT id", "FROM t", ") x", "WHERE x.id > 1"], 2),
            "SELECT *\nFROM (\n  SELECT id\n  FROM t\n) x\nWHERE x.id > 1"
        );
    }

    #[test]
    fn test_cte_header() {
        assert_eq!(
            indent(
                &["WITH a AS (", "SELECT 1", "),", "b AS (", "SELECT 2", ")", "SELECT *", "FROM a, b"],
                2
            ),
            "WITH a AS (\n  SELECT 1\n),\nb AS (\n  SELECT 2\n)\nSELECT *\nFROM a, b"
        );
    }

    #[test]
    fn test_parentheses_in_literals_do_not_count() {
        assert_eq!(
            indent(&["SELECT ')(' AS x", "FROM t"], 2),
            "SELECT ')(' AS x\nFROM t"
        );
    }

    #[test]
    fn test_bare_semicolon_line_is_not_indented() {
        assert_eq!(indent(&[";"], 2), ";");
        assert_eq!(
            indent(&["SELECT *", "FROM (", "SELECT 1", ")", ";"], 2),
            "SELECT *\nFROM (\n  SELECT 1\n)\n;"
        );
    }

    #[test]
    fn test_blank_lines_and_lowercase_keywords() {
        assert_eq!(
            indent(&["select 1;", "", "select a", "from t", "where a = 1", "and b = 2"], 2),
            "select 1;\n\nselect a\nfrom t\nwhere a = 1\n  and b = 2"
        );
    }
}
