use std::io;
use std::path::PathBuf;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::validator::{ValidationError, ValidationWarning};

/// Status of processing a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// File was already formatted correctly (or is valid, when validating).
    Unchanged,
    /// File was reformatted (or would be, in check mode).
    Changed,
    /// The validator found structural problems; the file was left alone.
    Diagnostics,
    /// An error occurred while processing the file.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One validator finding attached to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub column: Option<usize>,
    pub message: String,
}

impl From<&ValidationError> for Diagnostic {
    fn from(error: &ValidationError) -> Self {
        Self {
            severity: Severity::Error,
            line: error.line,
            column: Some(error.column),
            message: error.message.clone(),
        }
    }
}

impl From<&ValidationWarning> for Diagnostic {
    fn from(warning: &ValidationWarning) -> Self {
        Self {
            severity: Severity::Warning,
            line: warning.line,
            column: None,
            message: warning.message.clone(),
        }
    }
}

/// Result of processing a single file.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub error: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    pub fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            error: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn error(path: PathBuf, message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::new(path, FileStatus::Error)
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Aggregated report of a run.
#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    fn count(&self, status: FileStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn unchanged(&self) -> usize {
        self.count(FileStatus::Unchanged)
    }

    pub fn changed(&self) -> usize {
        self.count(FileStatus::Changed)
    }

    pub fn with_diagnostics(&self) -> usize {
        self.count(FileStatus::Diagnostics)
    }

    pub fn errors(&self) -> usize {
        self.count(FileStatus::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    pub fn has_changes(&self) -> bool {
        self.changed() > 0
    }

    pub fn has_diagnostics(&self) -> bool {
        self.with_diagnostics() > 0
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("{} file(s) processed", self.total()));
        if self.changed() > 0 {
            parts.push(format!("{} reformatted", self.changed()));
        }
        if self.unchanged() > 0 {
            parts.push(format!("{} unchanged", self.unchanged()));
        }
        if self.with_diagnostics() > 0 {
            parts.push(format!("{} with problems", self.with_diagnostics()));
        }
        if self.errors() > 0 {
            parts.push(format!("{} error(s)", self.errors()));
        }
        parts.join(", ")
    }

    /// Print errors and validator findings to stderr.
    pub fn print_problems(&self, color: ColorChoice) -> io::Result<()> {
        let mut stderr = StandardStream::stderr(color);
        self.write_problems(&mut stderr)
    }

    pub fn write_problems<W: WriteColor>(&self, out: &mut W) -> io::Result<()> {
        for result in &self.results {
            if let Some(ref error) = result.error {
                write_label(out, "error", Color::Red)?;
                writeln!(out, "{}: {}", result.path.display(), error)?;
            }
            for diagnostic in &result.diagnostics {
                match diagnostic.severity {
                    Severity::Error => write_label(out, "error", Color::Red)?,
                    Severity::Warning => write_label(out, "warning", Color::Yellow)?,
                }
                match diagnostic.column {
                    Some(column) => write!(
                        out,
                        "{}:{}:{}: ",
                        result.path.display(),
                        diagnostic.line,
                        column
                    )?,
                    None => write!(out, "{}:{}: ", result.path.display(), diagnostic.line)?,
                }
                writeln!(out, "{}", diagnostic.message)?;
            }
        }
        Ok(())
    }
}

fn write_label<W: WriteColor>(out: &mut W, label: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", label)?;
    out.reset()?;
    write!(out, ": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    fn sample_report() -> Report {
        let mut report = Report::new();
        report.add(FileResult::new(PathBuf::from("a.sql"), FileStatus::Changed));
        report.add(FileResult::new(PathBuf::from("b.sql"), FileStatus::Unchanged));
        report.add(FileResult::error(
            PathBuf::from("c.sql"),
            "Unmatched parentheses at line 1, column 8".to_string(),
        ));
        report.add(
            FileResult::new(PathBuf::from("d.sql"), FileStatus::Diagnostics).with_diagnostics(
                vec![
                    Diagnostic {
                        severity: Severity::Error,
                        line: 2,
                        column: Some(1),
                        message: "Unknown keyword 'FORM'. Did you mean 'FROM'?".to_string(),
                    },
                    Diagnostic {
                        severity: Severity::Warning,
                        line: 3,
                        column: None,
                        message: "advisory".to_string(),
                    },
                ],
            ),
        );
        report
    }

    #[test]
    fn test_report_summary() {
        let report = sample_report();
        assert_eq!(report.total(), 4);
        assert_eq!(report.changed(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.errors(), 1);
        assert_eq!(report.with_diagnostics(), 1);
        assert!(report.has_errors());
        assert!(report.has_changes());
        assert_eq!(
            report.summary(),
            "4 file(s) processed, 1 reformatted, 1 unchanged, 1 with problems, 1 error(s)"
        );
    }

    #[test]
    fn test_write_problems() {
        let mut out = NoColor::new(Vec::new());
        sample_report().write_problems(&mut out).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(
            text,
            "error: c.sql: Unmatched parentheses at line 1, column 8\n\
             error: d.sql:2:1: Unknown keyword 'FORM'. Did you mean 'FROM'?\n\
             warning: d.sql:3: advisory\n"
        );
    }
}
