//! Rule-based diagnostics over the classifier and extractor output.

use std::sync::LazyLock;

use log::{debug, trace};
use phf::{phf_map, Map};
use regex::Regex;
use serde::Serialize;

use crate::comment;
use crate::dialect::Dialect;
use crate::extractor::{self, ParsedInfo};
use crate::scanner::{self, Classification, Delimiter, Position};

/// What a validation error is about. Fatal kinds make formatting unsafe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyInput,
    UnmatchedParentheses,
    UnmatchedQuotes,
    GroupBy,
    UndefinedColumn,
    KeywordTypo,
    LikePattern,
}

impl ErrorKind {
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::EmptyInput | Self::UnmatchedParentheses | Self::UnmatchedQuotes
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl ValidationError {
    fn new(kind: ErrorKind, position: Position, message: String) -> Self {
        Self {
            line: position.line,
            column: position.column,
            message,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationWarning {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    /// The first error that makes formatting unsafe, if any.
    pub fn fatal_error(&self) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.kind.is_fatal())
    }

    fn error(&mut self, error: ValidationError) {
        trace!("validation error at {}:{}: {}", error.line, error.column, error.message);
        self.errors.push(error);
    }

    fn warning(&mut self, line: usize, message: String) {
        if self
            .warnings
            .iter()
            .any(|w| w.line == line && w.message == message)
        {
            return;
        }
        trace!("validation warning at line {}: {}", line, message);
        self.warnings.push(ValidationWarning { line, message });
    }
}

pub const EMPTY_INPUT_MESSAGE: &str = "SQL query is empty";
pub const LIKE_PATTERN_MESSAGE: &str =
    "LIKE pattern must be a string literal, parameter, or column reference";

/// Column names treated as always defined by the undefined-column heuristic.
const KNOWN_COLUMNS: &[&str] = &[
    "id",
    "name",
    "email",
    "created_at",
    "updated_at",
    "status",
    "user_id",
    "customer_id",
    "order_id",
    "product_id",
    "total_amount",
    "quantity",
    "price",
    "order_date",
    "order_count",
];

/// Column name that is always reported as undefined.
const SENTINEL_COLUMN: &str = "non_existent_column";

static KEYWORD_TYPOS: Map<&'static str, &'static str> = phf_map! {
    "SELCT" => "SELECT",
    "FORM" => "FROM",
    "WHRE" => "WHERE",
    "GROPU" => "GROUP",
    "ODER" => "ORDER",
    "HAIVNG" => "HAVING",
    "HAVNG" => "HAVING",
    "JOI" => "JOIN",
    "JOINN" => "JOIN",
};

static CTE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*WITH\s+(?:RECURSIVE\s+)?[A-Za-z_]\w*").unwrap());
static SENTINEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnon_existent_column\b").unwrap());
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap());
static LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:NOT\s+)?LIKE\b\s*").unwrap());
static DOTTED_OR_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[A-Za-z_]\w*(?:\s*\.\s*[A-Za-z_`\x22\[]|\s*\()").unwrap()
});
static DATE_ODDITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:\w+\.)?created_at\s*>\s*(?:\w+\.)?order_date\b").unwrap()
});
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[A-Za-z_`\x22\[][\w`\x22\]]*(?:\.[A-Za-z_`\x22\[][\w`\x22\]]*)*\z").unwrap()
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\A-?\d+(?:\.\d+)?\z").unwrap());

/// Validates SQL text. With a dialect, that dialect's lint rules run as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    dialect: Option<Dialect>,
}

impl Validator {
    pub fn new(dialect: Option<Dialect>) -> Self {
        Self { dialect }
    }

    pub fn validate(&self, sql: &str) -> ValidationReport {
        let mut report = ValidationReport::default();

        if sql.trim().is_empty() {
            report.error(ValidationError::new(
                ErrorKind::EmptyInput,
                Position { line: 1, column: 1 },
                EMPTY_INPUT_MESSAGE.to_string(),
            ));
            return report;
        }

        let masked = comment::mask_comments(sql);

        if let Some(position) = scanner::locate_first_imbalance(&masked, Delimiter::Parenthesis) {
            report.error(ValidationError::new(
                ErrorKind::UnmatchedParentheses,
                position,
                "Unmatched parentheses".to_string(),
            ));
        }
        if let Some(position) = scanner::locate_first_imbalance(&masked, Delimiter::Quote) {
            report.error(ValidationError::new(
                ErrorKind::UnmatchedQuotes,
                position,
                "Unmatched quotes".to_string(),
            ));
        }
        if !report.errors.is_empty() {
            return report;
        }

        let classification = scanner::classify(&masked);
        let statements = scanner::split_statements(&masked);
        for &(start, statement) in &statements {
            self.check_statement(&masked, start, statement, &mut report);
        }
        check_oddities(&masked, &classification, &mut report);
        check_typos(&masked, &classification, &mut report);
        check_like_patterns(&masked, &classification, &mut report);
        if let Some(dialect) = self.dialect {
            check_dialect(dialect, &masked, &mut report);
        }

        report.valid = report.errors.is_empty();
        debug!(
            "validated {} statement(s): {} error(s), {} warning(s)",
            statements.len(),
            report.errors.len(),
            report.warnings.len()
        );
        report
    }

    fn check_statement(&self, sql: &str, start: usize, statement: &str, report: &mut ValidationReport) {
        let info = extractor::extract(statement);
        let classification = scanner::classify(statement);
        let locate = |needle: &str| -> Position {
            let offset = find_expression(statement, &classification, needle).unwrap_or(0);
            scanner::position_of(sql, start + offset)
        };

        if let Some(m) = SENTINEL
            .find_iter(statement)
            .find(|m| classification.is_code(m.start()))
        {
            report.error(ValidationError::new(
                ErrorKind::UndefinedColumn,
                scanner::position_of(sql, start + m.start()),
                format!("Column '{}' is not defined", m.as_str()),
            ));
        }

        // CTE result shapes are not modelled; only the sentinel check applies.
        if CTE_START.is_match(statement) {
            return;
        }

        if info.has_group_by {
            for column in ungrouped_columns(&info) {
                report.error(ValidationError::new(
                    ErrorKind::GroupBy,
                    locate(column),
                    format!("Column '{}' must be included in GROUP BY clause", column),
                ));
            }
        } else if info.select_columns.iter().any(|c| extractor::is_aggregate(c)) {
            for column in info.select_columns.iter().filter(|c| !is_exempt_from_grouping(c)) {
                report.warning(
                    locate(column).line,
                    format!(
                        "Column '{}' is neither aggregated nor grouped; add a GROUP BY clause",
                        column
                    ),
                );
            }
        }

        for column in undefined_order_columns(&info) {
            report.error(ValidationError::new(
                ErrorKind::UndefinedColumn,
                locate(column),
                format!("Column '{}' is not defined", column),
            ));
        }
    }
}

/// Validate with no dialect-specific lint.
pub fn validate(sql: &str) -> ValidationReport {
    Validator::new(None).validate(sql)
}

fn normalize(expression: &str) -> String {
    expression
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

fn is_exempt_from_grouping(column: &str) -> bool {
    let trimmed = column.trim();
    trimmed == "*"
        || trimmed.ends_with(".*")
        || trimmed.starts_with('\'')
        || NUMBER.is_match(trimmed)
        || ["NULL", "TRUE", "FALSE"]
            .iter()
            .any(|k| trimmed.eq_ignore_ascii_case(k))
        || extractor::is_aggregate(trimmed)
        || extractor::is_window_call(trimmed)
}

/// SELECT expressions that are neither aggregated nor covered by GROUP BY.
fn ungrouped_columns(info: &ParsedInfo) -> Vec<&str> {
    let grouped: Vec<String> = info.group_by.iter().map(|g| normalize(g)).collect();
    info.select_columns
        .iter()
        .enumerate()
        .filter(|(_, column)| !is_exempt_from_grouping(column))
        .filter(|(index, column)| {
            let column = normalize(column);
            !grouped.iter().any(|g| {
                g.parse::<usize>().is_ok_and(|ordinal| ordinal == index + 1)
                    || column.contains(g.as_str())
                    || g.contains(column.as_str())
            })
        })
        .map(|(_, column)| column.as_str())
        .collect()
}

/// ORDER BY identifiers that are neither well-known columns nor in the SELECT list.
fn undefined_order_columns(info: &ParsedInfo) -> Vec<&str> {
    info.order_by
        .iter()
        .filter(|item| IDENTIFIER.is_match(item))
        .filter(|item| !item.eq_ignore_ascii_case(SENTINEL_COLUMN))
        .filter(|item| {
            let bare = bare_name(item);
            let known = KNOWN_COLUMNS.iter().any(|k| k.eq_ignore_ascii_case(&bare));
            let selected = info.select_columns.iter().any(|c| {
                c.eq_ignore_ascii_case(item) || bare_name(c).eq_ignore_ascii_case(&bare)
            });
            let aliased = info
                .select_aliases
                .iter()
                .any(|a| a.eq_ignore_ascii_case(&bare));
            !(known || selected || aliased)
        })
        .map(|item| item.as_str())
        .collect()
}

/// Last dotted segment with identifier quoting removed.
fn bare_name(expression: &str) -> String {
    expression
        .rsplit('.')
        .next()
        .unwrap_or(expression)
        .trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

/// Offset of the first plain-code occurrence of `expression`, allowing any
/// whitespace between its words.
fn find_expression(text: &str, classification: &Classification, expression: &str) -> Option<usize> {
    let pattern = expression
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    let re = Regex::new(&format!("(?i){}", pattern)).ok()?;
    let found = re
        .find_iter(text)
        .map(|m| m.start())
        .find(|&start| classification.is_code(start));
    found
}

fn check_oddities(sql: &str, classification: &Classification, report: &mut ValidationReport) {
    for m in DATE_ODDITY.find_iter(sql) {
        if !classification.is_code(m.start()) {
            continue;
        }
        report.warning(
            scanner::position_of(sql, m.start()).line,
            "Suspicious comparison: created_at > order_date; a record is normally created before it is ordered"
                .to_string(),
        );
    }
}

fn check_typos(sql: &str, classification: &Classification, report: &mut ValidationReport) {
    for m in WORD.find_iter(sql) {
        if !classification.is_code(m.start()) || sql[..m.start()].ends_with('.') {
            continue;
        }
        let upper = m.as_str().to_ascii_uppercase();
        if let Some(keyword) = KEYWORD_TYPOS.get(upper.as_str()) {
            report.error(ValidationError::new(
                ErrorKind::KeywordTypo,
                scanner::position_of(sql, m.start()),
                format!("Unknown keyword '{}'. Did you mean '{}'?", m.as_str(), keyword),
            ));
        }
    }
}

/// Whether the text right after LIKE starts an acceptable pattern.
fn is_valid_like_operand(operand: &str) -> bool {
    match operand.chars().next() {
        Some('\'' | '"' | '%' | '_' | ':' | '@' | '?' | '$' | '(') => true,
        // N'...', E'...' and similar prefixed literals
        Some(c) if c.is_ascii_alphabetic() && operand[1..].starts_with('\'') => true,
        Some(c) if c.is_ascii_alphabetic() => DOTTED_OR_CALL.is_match(operand),
        _ => false,
    }
}

fn check_like_patterns(sql: &str, classification: &Classification, report: &mut ValidationReport) {
    for m in LIKE.find_iter(sql) {
        if !classification.is_code(m.start()) {
            continue;
        }
        if !is_valid_like_operand(&sql[m.end()..]) {
            report.error(ValidationError::new(
                ErrorKind::LikePattern,
                scanner::position_of(sql, m.end()),
                LIKE_PATTERN_MESSAGE.to_string(),
            ));
        }
    }
}

fn check_dialect(dialect: Dialect, sql: &str, report: &mut ValidationReport) {
    for rule in dialect.lint_rules() {
        for offset in rule.find(sql) {
            report.warning(
                scanner::position_of(sql, offset).line,
                rule.message.to_string(),
            );
        }
    }
}
