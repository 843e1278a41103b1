use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::SqltidyError;

/// How recognised keywords are cased in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordCase {
    #[default]
    Uppercase,
    Lowercase,
    Unchanged,
}

impl FromStr for KeywordCase {
    type Err = SqltidyError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "uppercase" | "upper" => Ok(Self::Uppercase),
            "lowercase" | "lower" => Ok(Self::Lowercase),
            "unchanged" | "preserve" => Ok(Self::Unchanged),
            _ => Err(SqltidyError::Config(format!("Unknown keyword case: {}", name))),
        }
    }
}

/// Options for one formatting call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatterOptions {
    #[serde(default)]
    pub dialect: Dialect,

    /// Spaces per indent level. Must be positive.
    #[serde(default = "default_indent_size")]
    pub indent_size: usize,

    #[serde(default)]
    pub keyword_case: KeywordCase,

    /// Informational: statements are always separated by one blank line.
    #[serde(default = "default_lines_between_queries")]
    pub lines_between_queries: usize,

    /// Advisory only; lines are never wrapped.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    #[serde(default = "default_preserve_comments")]
    pub preserve_comments: bool,

    /// Skip the equivalence check on the formatted output.
    #[serde(default)]
    pub fast: bool,
}

fn default_indent_size() -> usize {
    2
}
fn default_lines_between_queries() -> usize {
    1
}
fn default_max_line_length() -> usize {
    80
}
fn default_preserve_comments() -> bool {
    true
}

impl FormatterOptions {
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    /// Reject option combinations the formatter cannot honour.
    pub fn validate(&self) -> Result<(), SqltidyError> {
        if self.indent_size == 0 {
            return Err(SqltidyError::Config(
                "indent size must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            indent_size: default_indent_size(),
            keyword_case: KeywordCase::default(),
            lines_between_queries: default_lines_between_queries(),
            max_line_length: default_max_line_length(),
            preserve_comments: default_preserve_comments(),
            fast: false,
        }
    }
}
