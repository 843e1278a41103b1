use memchr::memmem;

use crate::string_utils::{line_end, skip_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    /// `-- ...` up to the end of the line.
    Line,
    /// `/* ... */`, possibly spanning lines.
    Block,
}

/// A SQL comment, extracted before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Byte offset of the comment marker in the source text.
    pub position: usize,
    pub text: String,
    pub kind: CommentKind,
    /// Number of non-whitespace code characters that precede the comment.
    pub anchor: usize,
}

impl Comment {
    pub fn is_block(&self) -> bool {
        self.kind == CommentKind::Block
    }
}

/// A located comment span: start, end (exclusive) and kind.
fn comment_spans(text: &str) -> Vec<(usize, usize, CommentKind)> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'[' => {
                i = skip_literal(bytes, i);
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = line_end(bytes, i);
                spans.push((i, end, CommentKind::Line));
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = memmem::find(&bytes[i + 2..], b"*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
                spans.push((i, end, CommentKind::Block));
                i = end;
            }
            _ => i += 1,
        }
    }
    spans
}

/// Split `text` into lines like `str::lines`, but only at newlines in plain code.
/// Newlines inside string literals, quoted identifiers and block comments stay
/// inside their line.
pub fn code_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'[' => i = skip_literal(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = memmem::find(&bytes[i + 2..], b"*/")
                    .map_or(bytes.len(), |offset| i + 2 + offset + 2);
            }
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&text[start..]);
    }
    lines
}

fn count_visible(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Remove all comments from `text`. Line comments leave their newline behind and
/// block comments are replaced by a single space so neighbouring tokens never fuse.
pub fn extract_comments(text: &str) -> (String, Vec<Comment>) {
    let mut stripped = String::with_capacity(text.len());
    let mut comments = Vec::new();
    let mut visible = 0;
    let mut last = 0;

    for (start, end, kind) in comment_spans(text) {
        let code = &text[last..start];
        visible += count_visible(code);
        stripped.push_str(code);
        if kind == CommentKind::Block {
            stripped.push(' ');
        }
        comments.push(Comment {
            position: start,
            text: text[start..end].trim_end().to_string(),
            kind,
            anchor: visible,
        });
        last = end;
    }
    stripped.push_str(&text[last..]);

    (stripped, comments)
}

/// Blank out comment bodies, keeping newlines so every remaining character keeps
/// its line and column.
pub fn mask_comments(text: &str) -> String {
    let mut masked = String::with_capacity(text.len());
    let mut last = 0;
    for (start, end, _) in comment_spans(text) {
        masked.push_str(&text[last..start]);
        masked.extend(
            text[start..end]
                .chars()
                .map(|c| if c == '\n' { '\n' } else { ' ' }),
        );
        last = end;
    }
    masked.push_str(&text[last..]);
    masked
}

/// Put extracted comments back into formatted text.
///
/// A line comment goes to the end of the line holding the last code character that
/// preceded it; further line comments anchored to the same line follow on their own
/// lines with the same indentation. Comments that preceded all code open the output.
/// Block comments are appended after the formatted text.
pub fn reinsert_comments(formatted: &str, comments: &[Comment]) -> String {
    if comments.is_empty() {
        return formatted.to_string();
    }

    let lines = code_lines(formatted);
    let mut attached: Vec<Vec<&Comment>> = vec![Vec::new(); lines.len()];
    let mut leading: Vec<&Comment> = Vec::new();

    let mut line_ends = Vec::with_capacity(lines.len());
    let mut running = 0;
    for line in &lines {
        running += count_visible(line);
        line_ends.push(running);
    }

    for comment in comments.iter().filter(|c| !c.is_block()) {
        if comment.anchor == 0 || lines.is_empty() {
            leading.push(comment);
            continue;
        }
        let target = line_ends
            .iter()
            .position(|&end| end >= comment.anchor)
            .unwrap_or(lines.len() - 1);
        attached[target].push(comment);
    }

    let mut result = String::with_capacity(formatted.len() + 64);
    for comment in leading {
        result.push_str(&comment.text);
        result.push('\n');
    }
    for (line, line_comments) in lines.iter().zip(&attached) {
        result.push_str(line);
        let indent: String = line.chars().take_while(|c| *c == ' ').collect();
        for (n, comment) in line_comments.iter().enumerate() {
            if n == 0 && !line.trim().is_empty() {
                result.push_str("  ");
            } else {
                result.push('\n');
                result.push_str(&indent);
            }
            result.push_str(&comment.text);
        }
        result.push('\n');
    }
    for comment in comments.iter().filter(|c| c.is_block()) {
        result.push_str(&comment.text);
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_line_and_block_comments() {
        let (stripped, comments) = extract_comments("SELECT a -- first\nFROM /* src */ t");
        assert_eq!(stripped, "SELECT a \nFROM   t");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "-- first");
        assert_eq!(comments[0].kind, CommentKind::Line);
        assert_eq!(comments[0].anchor, 7);
        assert_eq!(comments[1].text, "/* src */");
        assert!(comments[1].is_block());
        assert_eq!(comments[1].position, 23);
    }

    #[test]
    fn test_comment_markers_inside_strings_are_kept() {
        let sql = "SELECT '-- not a comment', \"/* nor this */\" FROM t";
        let (stripped, comments) = extract_comments(sql);
        assert_eq!(stripped, sql);
        assert!(comments.is_empty());
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let (stripped, comments) = extract_comments("SELECT 1 /* open");
        assert_eq!(stripped, "SELECT 1  ");
        assert_eq!(comments[0].text, "/* open");
    }

    #[test]
    fn test_mask_preserves_layout() {
        let sql = "SELECT 1 -- don't\nFROM t /* a\nb */ WHERE x";
        let masked = mask_comments(sql);
        assert_eq!(masked.lines().count(), sql.lines().count());
        assert!(!masked.contains("don't"));
        assert!(masked.ends_with("     WHERE x"));
    }

    #[test]
    fn test_code_lines_keep_multiline_literals_whole() {
        assert_eq!(
            code_lines("SELECT 'a\n\nb' AS x\nFROM t /* c\nd */\n-- it's\nWHERE y\n"),
            vec!["SELECT 'a\n\nb' AS x", "FROM t /* c\nd */", "-- it's", "WHERE y"]
        );
        assert_eq!(code_lines("a\n\nb"), vec!["a", "", "b"]);
        assert!(code_lines("").is_empty());
    }

    #[test]
    fn test_reinsert_keeps_multiline_literal_intact() {
        let (_, comments) = extract_comments("SELECT 'x\n\ny' AS v -- note\nFROM t");
        let out = reinsert_comments("SELECT 'x\n\ny' AS v\nFROM t\n", &comments);
        assert_eq!(out, "SELECT 'x\n\ny' AS v  -- note\nFROM t\n");
    }

    #[test]
    fn test_reinsert_line_comment_after_anchor_line() {
        let (_, comments) = extract_comments("SELECT a -- first\nFROM t");
        let out = reinsert_comments("SELECT a\nFROM t\n", &comments);
        assert_eq!(out, "SELECT a  -- first\nFROM t\n");
    }

    #[test]
    fn test_reinsert_leading_and_stacked_comments() {
        let (_, comments) =
            extract_comments("-- header\nSELECT a,\n  b -- one\n-- two\nFROM t /* tail */");
        let out = reinsert_comments("SELECT a, b\nFROM t\n", &comments);
        assert_eq!(
            out,
            "-- header\nSELECT a, b  -- one\n-- two\nFROM t\n/* tail */\n"
        );
    }
}
