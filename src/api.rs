use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::case;
use crate::comment;
use crate::dialect::{self, Dialect};
use crate::error::SqltidyError;
use crate::formatter::QueryFormatter;
use crate::keywords;
use crate::mode::Mode;
use crate::options::{FormatterOptions, KeywordCase};
use crate::report::{Diagnostic, FileResult, FileStatus, Report};
use crate::result::{FormatOutcome, FormatResult, Stats};
use crate::validator::{
    ErrorKind, ValidationError, ValidationReport, ValidationWarning, Validator,
};

/// Format SQL text. This is the core API function.
pub fn format_sql(sql: &str, options: &FormatterOptions) -> FormatResult {
    format_outcome(sql, options).into()
}

/// Validate, then lay out `sql` unless the validator found problems.
pub fn format_outcome(sql: &str, options: &FormatterOptions) -> FormatOutcome {
    if let Err(e) = options.validate() {
        return FormatOutcome::fatal(e.to_string());
    }

    let report = Validator::new(Some(options.dialect)).validate(sql);
    if let Some(error) = report.fatal_error() {
        return FormatOutcome::fatal(fatal_error(error).to_string());
    }
    if !report.errors.is_empty() {
        debug!("{} structural error(s), skipping layout", report.errors.len());
        return FormatOutcome::DiagnosticsOnly {
            errors: report.errors,
            warnings: report.warnings,
        };
    }

    match panic::catch_unwind(AssertUnwindSafe(|| layout(sql, options))) {
        Ok(Ok(formatted)) => FormatOutcome::Formatted {
            stats: Stats::compute(&formatted, options.dialect),
            formatted,
            warnings: report.warnings,
        },
        Ok(Err(e)) => FormatOutcome::fatal(e.to_string()),
        Err(_) => FormatOutcome::fatal("internal formatter error"),
    }
}

fn fatal_error(error: &ValidationError) -> SqltidyError {
    match error.kind {
        ErrorKind::EmptyInput => SqltidyError::EmptyInput,
        _ => SqltidyError::Unbalanced {
            line: error.line,
            column: error.column,
            message: error.message.clone(),
        },
    }
}

fn layout(sql: &str, options: &FormatterOptions) -> Result<String, SqltidyError> {
    let formatted = QueryFormatter::new(options).format(sql);
    if !options.fast {
        safety_check(sql, &formatted)?;
    }
    Ok(formatted)
}

/// Validate without any dialect-specific lint.
pub fn validate_sql(sql: &str) -> ValidationReport {
    Validator::new(None).validate(sql)
}

/// Validate, including the lint rules of `dialect`.
pub fn validate_sql_for(sql: &str, dialect: Dialect) -> ValidationReport {
    Validator::new(Some(dialect)).validate(sql)
}

pub fn detect_sql_dialect(sql: &str) -> Dialect {
    dialect::detect_dialect(sql)
}

/// Re-case the base keyword vocabulary in `text`.
pub fn format_keywords(text: &str, case: KeywordCase) -> String {
    case::apply_case(text, case, None)
}

/// Presentation tag for syntax highlighting; empty for non-keywords.
pub fn get_keyword_style(word: &str) -> &'static str {
    keywords::category(word).map_or("", |category| category.style())
}

/// Run the formatter (or validator) on a collection of files.
pub fn run(files: &[PathBuf], mode: &Mode) -> Report {
    let matching_paths = get_matching_paths(files, mode);
    let mut report = Report::new();
    debug!("processing {} file(s)", matching_paths.len());

    if mode.single_process || matching_paths.len() <= 1 {
        for path in &matching_paths {
            report.add(process_file(path, mode));
        }
        return report;
    }

    use rayon::prelude::*;

    match rayon::ThreadPoolBuilder::new()
        .num_threads(mode.threads)
        .build()
    {
        Ok(pool) => {
            let results: Vec<FileResult> = pool.install(|| {
                matching_paths
                    .par_iter()
                    .map(|path| process_file(path, mode))
                    .collect()
            });
            for result in results {
                report.add(result);
            }
        }
        Err(e) => {
            warn!("failed to build thread pool ({}), running sequentially", e);
            for path in &matching_paths {
                report.add(process_file(path, mode));
            }
        }
    }

    report
}

fn process_file(path: &Path, mode: &Mode) -> FileResult {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return FileResult::error(path.to_path_buf(), format!("Read error: {}", e)),
    };
    if mode.validate_only {
        validate_file(path, &source, mode)
    } else {
        format_file(path, &source, mode)
    }
}

fn diagnostics(errors: &[ValidationError], warnings: &[ValidationWarning]) -> Vec<Diagnostic> {
    errors
        .iter()
        .map(Diagnostic::from)
        .chain(warnings.iter().map(Diagnostic::from))
        .collect()
}

fn validate_file(path: &Path, source: &str, mode: &Mode) -> FileResult {
    let report = validate_sql_for(source, mode.options.dialect);
    let status = if report.valid {
        FileStatus::Unchanged
    } else {
        FileStatus::Diagnostics
    };
    FileResult::new(path.to_path_buf(), status)
        .with_diagnostics(diagnostics(&report.errors, &report.warnings))
}

/// Format a single file.
fn format_file(path: &Path, source: &str, mode: &Mode) -> FileResult {
    debug!("formatting {}", path.display());
    let (formatted, warnings) = match format_outcome(source, &mode.options) {
        FormatOutcome::Formatted {
            formatted,
            warnings,
            ..
        } => (formatted, warnings),
        FormatOutcome::DiagnosticsOnly { errors, warnings } => {
            return FileResult::new(path.to_path_buf(), FileStatus::Diagnostics)
                .with_diagnostics(diagnostics(&errors, &warnings));
        }
        FormatOutcome::Fatal { message } => {
            return FileResult::error(path.to_path_buf(), message);
        }
    };
    let warnings = diagnostics(&[], &warnings);

    if source == formatted {
        return FileResult::new(path.to_path_buf(), FileStatus::Unchanged).with_diagnostics(warnings);
    }

    if !mode.writes_files() {
        if mode.diff {
            print_diff(path, source, &formatted);
        }
        return FileResult::new(path.to_path_buf(), FileStatus::Changed).with_diagnostics(warnings);
    }

    match std::fs::write(path, &formatted) {
        Ok(_) => FileResult::new(path.to_path_buf(), FileStatus::Changed).with_diagnostics(warnings),
        Err(e) => FileResult::error(path.to_path_buf(), format!("Write error: {}", e)),
    }
}

/// Get all SQL file paths that match the given inputs.
pub fn get_matching_paths(paths: &[PathBuf], mode: &Mode) -> Vec<PathBuf> {
    let extensions = mode.sql_extensions();
    let exclude: Vec<glob::Pattern> = mode
        .exclude
        .iter()
        .filter_map(|pattern| match glob::Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("ignoring invalid exclude pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect();
    let mut result = HashSet::new();

    for path in paths {
        if path.is_file() {
            if is_sql_file(path, extensions) && !is_excluded(path, &exclude) {
                result.insert(path.clone());
            }
        } else if path.is_dir() {
            collect_sql_files(path, extensions, &exclude, &mut result);
        }
    }

    let mut sorted: Vec<PathBuf> = result.into_iter().collect();
    sorted.sort();
    sorted
}

/// Check if a file has a SQL extension.
fn is_sql_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn is_excluded(path: &Path, exclude: &[glob::Pattern]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    exclude
        .iter()
        .any(|pattern| pattern.matches(&name) || pattern.matches_path(path))
}

/// Recursively collect SQL files from a directory.
fn collect_sql_files(
    dir: &Path,
    extensions: &[&str],
    exclude: &[glob::Pattern],
    result: &mut HashSet<PathBuf>,
) {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("cannot read {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden || is_excluded(&path, exclude) {
            continue;
        }

        if path.is_dir() {
            collect_sql_files(&path, extensions, exclude, result);
        } else if is_sql_file(&path, extensions) {
            result.insert(path);
        }
    }
}

/// Comments removed, whitespace removed, lower-cased.
fn equivalence_key(text: &str) -> String {
    let (code, _) = comment::extract_comments(text);
    code.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Verify the formatted output only differs from the original in whitespace,
/// keyword case and comments.
fn safety_check(original: &str, formatted: &str) -> Result<(), SqltidyError> {
    let before = equivalence_key(original);
    let after = equivalence_key(formatted);
    if before == after {
        return Ok(());
    }

    let at = before
        .chars()
        .zip(after.chars())
        .take_while(|(a, b)| a == b)
        .count();
    let context: String = before.chars().skip(at.saturating_sub(10)).take(20).collect();
    Err(SqltidyError::Equivalence(format!(
        "formatted output is not equivalent to the input near '{}'",
        context
    )))
}

/// Print a diff between original and formatted content.
fn print_diff(path: &Path, original: &str, formatted: &str) {
    use similar::{ChangeTag, TextDiff};

    eprintln!("--- {}", path.display());
    eprintln!("+++ {}", path.display());

    let diff = TextDiff::from_lines(original, formatted);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        eprint!("{}{}", sign, change);
        if change.missing_newline() {
            eprintln!();
        }
    }
}
