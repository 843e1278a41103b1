use serde::Serialize;

use crate::case;
use crate::comment;
use crate::dialect::Dialect;
use crate::scanner;
use crate::validator::{ValidationError, ValidationWarning};

/// Statistics over formatted output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub lines: usize,
    pub characters: usize,
    /// Recognised keywords outside literals and comments.
    pub keywords: usize,
    pub statements: usize,
}

impl Stats {
    pub fn compute(formatted: &str, dialect: Dialect) -> Self {
        let (code, _) = comment::extract_comments(formatted);
        Self {
            lines: formatted.lines().count(),
            characters: formatted.chars().count(),
            keywords: case::count_keywords(&code, Some(dialect)),
            statements: scanner::split_statements(&code).len(),
        }
    }
}

/// What one formatting call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatOutcome {
    /// Layout ran. `warnings` are advisory only.
    Formatted {
        formatted: String,
        stats: Stats,
        warnings: Vec<ValidationWarning>,
    },
    /// Structural problems were found, so layout was not attempted.
    DiagnosticsOnly {
        errors: Vec<ValidationError>,
        warnings: Vec<ValidationWarning>,
    },
    /// Formatting could not run or produced unsafe output.
    Fatal { message: String },
}

impl FormatOutcome {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal {
            message: message.into(),
        }
    }

    pub fn formatted(&self) -> Option<&str> {
        match self {
            Self::Formatted { formatted, .. } => Some(formatted),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Diagnostics<'a> {
    errors: &'a [ValidationError],
    warnings: &'a [ValidationWarning],
}

/// The flat result shape handed to callers.
///
/// Structural diagnostics travel in `warning` as a JSON document with
/// `success: true` and an empty `formatted`, so callers that only look at
/// `success` still get a non-error answer for SQL that merely looks wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<usize>,
}

impl FormatResult {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            error: Some(message),
            ..Self::default()
        }
    }
}

/// `Line N: message`, one per line; `None` when there are no warnings.
pub fn render_warnings(warnings: &[ValidationWarning]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }
    Some(
        warnings
            .iter()
            .map(|w| format!("Line {}: {}", w.line, w.message))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

impl From<FormatOutcome> for FormatResult {
    fn from(outcome: FormatOutcome) -> Self {
        match outcome {
            FormatOutcome::Formatted {
                formatted,
                stats,
                warnings,
            } => Self {
                success: true,
                formatted: Some(formatted),
                error: None,
                warning: render_warnings(&warnings),
                lines: Some(stats.lines),
                characters: Some(stats.characters),
                keywords: Some(stats.keywords),
                statements: Some(stats.statements),
            },
            FormatOutcome::DiagnosticsOnly { errors, warnings } => {
                let payload = Diagnostics {
                    errors: &errors,
                    warnings: &warnings,
                };
                match serde_json::to_string(&payload) {
                    Ok(json) => Self {
                        success: true,
                        formatted: Some(String::new()),
                        warning: Some(json),
                        ..Self::default()
                    },
                    Err(e) => Self::failure(e.to_string()),
                }
            }
            FormatOutcome::Fatal { message } => Self::failure(message),
        }
    }
}
