use log::debug;
use memchr::memmem;

use crate::case;
use crate::comment::{self, Comment};
use crate::indenter::Indenter;
use crate::options::FormatterOptions;
use crate::splitter::LineSplitter;
use crate::string_utils::{line_end, skip_literal};

/// QueryFormatter runs the layout pipeline. Stage order matters: each stage
/// assumes the shape produced by the one before it.
///   1. Normalize line endings and tabs
///   2. Extract comments
///   3. Apply keyword case
///   4. Split into logical lines
///   5. Indent
///   6. Reinsert comments
///   7. Clean up spacing
pub struct QueryFormatter<'a> {
    options: &'a FormatterOptions,
}

impl<'a> QueryFormatter<'a> {
    pub fn new(options: &'a FormatterOptions) -> Self {
        Self { options }
    }

    /// Lay out already-validated SQL text.
    pub fn format(&self, sql: &str) -> String {
        let text = self.normalize(sql);
        let (text, comments) = self.extract_comments(&text);
        let text = self.apply_case(&text);
        let lines = self.split_lines(&text);
        let text = self.indent(&lines);
        let text = self.reinsert_comments(&text, &comments);
        self.cleanup(&text)
    }

    /// Stage 1: a single newline convention, tabs as two spaces.
    fn normalize(&self, sql: &str) -> String {
        sql.replace("\r\n", "\n").replace('\r', "\n").replace('\t', "  ")
    }

    /// Stage 2: later stages never see comment bodies.
    fn extract_comments(&self, text: &str) -> (String, Vec<Comment>) {
        let (stripped, comments) = comment::extract_comments(text);
        debug!("extracted {} comment(s)", comments.len());
        (stripped, comments)
    }

    /// Stage 3
    fn apply_case(&self, text: &str) -> String {
        case::apply_case(text, self.options.keyword_case, Some(self.options.dialect))
    }

    /// Stage 4
    fn split_lines(&self, text: &str) -> Vec<String> {
        let lines = LineSplitter::new().split(text);
        debug!("split into {} line(s)", lines.len());
        lines
    }

    /// Stage 5
    fn indent(&self, lines: &[String]) -> String {
        Indenter::new(self.options.indent_size).indent(lines)
    }

    /// Stage 6: only when comments are preserved.
    fn reinsert_comments(&self, text: &str, comments: &[Comment]) -> String {
        if !self.options.preserve_comments {
            return text.to_string();
        }
        comment::reinsert_comments(text, comments)
    }

    /// Stage 7: trailing whitespace, blank line runs, operator and comma spacing.
    /// The result ends with exactly one newline.
    fn cleanup(&self, text: &str) -> String {
        let spaced = space_operators(text);
        let mut result = String::with_capacity(spaced.len() + 1);
        let mut blank_run = 0;
        for line in comment::code_lines(&spaced).into_iter().map(str::trim_end) {
            if line.is_empty() {
                blank_run += 1;
                continue;
            }
            if blank_run > 0 && !result.is_empty() {
                result.push('\n');
            }
            blank_run = 0;
            result.push_str(line);
            result.push('\n');
        }
        result
    }
}

const COMPARISONS: &[&str] = &["=", "<", ">", "!=", "<>", "<=", ">="];

fn is_operator_byte(b: u8) -> bool {
    matches!(b, b'<' | b'>' | b'=' | b'!')
}

/// Put one space around comparison operators and after commas, and none before
/// commas, skipping literals and comments. Operators glued to `-`, `:` or `@`
/// (`->`, `:=`, `@>`, `<@`) are left as they are.
fn space_operators(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'[' => {
                let end = skip_literal(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = line_end(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = memmem::find(&bytes[i + 2..], b"*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
                out.push_str(&text[i..end]);
                i = end;
            }
            b if is_operator_byte(b) => {
                let end = i + bytes[i..].iter().take_while(|&&b| is_operator_byte(b)).count();
                let op = &text[i..end];
                let glued = matches!(out.chars().next_back(), Some('-' | ':' | '@'))
                    || bytes.get(end) == Some(&b'@');
                if !COMPARISONS.contains(&op) || glued {
                    out.push_str(op);
                    i = end;
                    continue;
                }
                let kept = out.trim_end_matches(' ').len();
                if kept > 0 && !out[..kept].ends_with('\n') {
                    out.truncate(kept);
                    out.push(' ');
                }
                out.push_str(op);
                i = push_single_space(bytes, end, &mut out);
            }
            b',' => {
                let kept = out.trim_end_matches(' ').len();
                if kept > 0 && !out[..kept].ends_with('\n') {
                    out.truncate(kept);
                }
                out.push(',');
                i = push_single_space(bytes, i + 1, &mut out);
            }
            _ => {
                let c = text[i..].chars().next().unwrap_or(' ');
                out.push(c);
                i += c.len_utf8();
            }
        }
    }
    out
}

/// Skip spaces from `i` and emit one, unless the line ends there.
fn push_single_space(bytes: &[u8], mut i: usize, out: &mut String) -> usize {
    while bytes.get(i) == Some(&b' ') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] != b'\n' {
        out.push(' ');
    }
    i
}
