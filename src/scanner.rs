//! Character-level classification of SQL text.
//!
//! A single left-to-right pass decides, for every byte offset, whether the cursor
//! is inside a quoted string, inside a `[...]` bracketed region, or in plain code,
//! and how many parentheses are open. Every other component consults this instead
//! of matching raw text, so keywords or delimiters inside literals are never
//! mistaken for structure.

/// Which delimiter family a balance check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Parenthesis,
    Quote,
}

/// A 1-based line/column location in the source text. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// Literal state at one point of the scan. At most one flag is set at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanState {
    pub in_single_quote: bool,
    pub in_double_quote: bool,
    pub in_square_bracket: bool,
    escaped: bool,
}

impl ScanState {
    pub fn in_quotes(&self) -> bool {
        self.in_single_quote || self.in_double_quote
    }

    /// Consume one character. Returns `true` when `c` is plain code, i.e. neither
    /// part of a literal nor one of its delimiters.
    pub fn advance(&mut self, c: char) -> bool {
        if self.escaped {
            self.escaped = false;
            return false;
        }
        if self.in_single_quote || self.in_double_quote {
            let quote = if self.in_single_quote { '\'' } else { '"' };
            if c == '\\' {
                self.escaped = true;
            } else if c == quote {
                self.in_single_quote = false;
                self.in_double_quote = false;
            }
            return false;
        }
        if self.in_square_bracket {
            if c == ']' {
                self.in_square_bracket = false;
            }
            return false;
        }
        match c {
            '\'' => self.in_single_quote = true,
            '"' => self.in_double_quote = true,
            '[' => self.in_square_bracket = true,
            _ => return true,
        }
        false
    }
}

/// Per-byte classification of a text.
#[derive(Debug, Clone)]
pub struct Classification {
    code: Vec<bool>,
    depth: Vec<usize>,
}

impl Classification {
    /// Whether the byte at `offset` is plain code. Offsets past the end are code.
    pub fn is_code(&self, offset: usize) -> bool {
        self.code.get(offset).copied().unwrap_or(true)
    }

    /// Number of open parentheses before `offset`, floored at zero.
    pub fn depth_at(&self, offset: usize) -> usize {
        match self.depth.get(offset) {
            Some(depth) => *depth,
            None => self.depth.last().copied().unwrap_or(0),
        }
    }
}

/// Classify every byte of `text`.
pub fn classify(text: &str) -> Classification {
    let mut code = vec![true; text.len()];
    let mut depth = vec![0; text.len()];
    let mut state = ScanState::default();
    let mut open = 0usize;

    for (offset, c) in text.char_indices() {
        let is_code = state.advance(c);
        for byte in offset..offset + c.len_utf8() {
            code[byte] = is_code;
            depth[byte] = open;
        }
        if is_code {
            match c {
                '(' => open += 1,
                ')' => open = open.saturating_sub(1),
                _ => {}
            }
        }
    }

    Classification { code, depth }
}

/// Whether `preceding` ends inside a quoted string, i.e. a word that follows it
/// would be part of a string literal.
pub fn is_inside_quotes(preceding: &str) -> bool {
    let mut state = ScanState::default();
    for c in preceding.chars() {
        state.advance(c);
    }
    state.in_quotes()
}

pub fn is_balanced(text: &str, kind: Delimiter) -> bool {
    locate_first_imbalance(text, kind).is_none()
}

/// Locate the offending delimiter when `text` is unbalanced.
///
/// For parentheses this is the first `)` that closes nothing, otherwise the last
/// opener left unmatched at the end of the text. For quotes it is the opening
/// quote of the string that is never closed.
pub fn locate_first_imbalance(text: &str, kind: Delimiter) -> Option<Position> {
    let mut state = ScanState::default();
    let mut open_parens: Vec<usize> = Vec::new();
    let mut quote_start = 0usize;

    for (offset, c) in text.char_indices() {
        let was_in_quotes = state.in_quotes();
        let is_code = state.advance(c);
        if !was_in_quotes && state.in_quotes() {
            quote_start = offset;
        }
        if kind == Delimiter::Parenthesis && is_code {
            match c {
                '(' => open_parens.push(offset),
                ')' => {
                    if open_parens.pop().is_none() {
                        return Some(position_of(text, offset));
                    }
                }
                _ => {}
            }
        }
    }

    match kind {
        Delimiter::Parenthesis => open_parens.last().map(|&offset| position_of(text, offset)),
        Delimiter::Quote => state.in_quotes().then(|| position_of(text, quote_start)),
    }
}

/// Line and column of a byte offset.
pub fn position_of(text: &str, offset: usize) -> Position {
    let offset = offset.min(text.len());
    let before = &text[..floor_char_boundary(text, offset)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    Position { line, column }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Split `text` into top-level statements at semicolons that are plain code.
/// Each entry carries the byte offset where the statement starts. Statements that
/// are only whitespace are dropped.
pub fn split_statements(text: &str) -> Vec<(usize, &str)> {
    let classification = classify(text);
    let mut statements = Vec::new();
    let mut start = 0;
    for (offset, byte) in text.bytes().enumerate() {
        if byte == b';' && classification.is_code(offset) {
            statements.push((start, &text[start..offset]));
            start = offset + 1;
        }
    }
    statements.push((start, &text[start..]));
    statements.retain(|(_, statement)| !statement.trim().is_empty());
    statements
}

/// Rebuild `text`, passing each maximal run of plain code through `rewrite` and
/// copying literals verbatim.
pub fn rewrite_code<F>(text: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> String,
{
    let classification = classify(text);
    let mut result = String::with_capacity(text.len());
    let mut run_start = 0;
    let mut run_is_code = true;

    for (offset, _) in text.char_indices() {
        let is_code = classification.is_code(offset);
        if is_code != run_is_code {
            let run = &text[run_start..offset];
            if run_is_code {
                result.push_str(&rewrite(run));
            } else {
                result.push_str(run);
            }
            run_start = offset;
            run_is_code = is_code;
        }
    }
    let run = &text[run_start..];
    if run_is_code {
        result.push_str(&rewrite(run));
    } else {
        result.push_str(run);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balanced_parentheses() {
        assert!(is_balanced("SELECT COUNT(*) FROM (SELECT 1) t", Delimiter::Parenthesis));
        assert!(!is_balanced("SELECT COUNT(* FROM t", Delimiter::Parenthesis));
        assert!(!is_balanced("SELECT 1)", Delimiter::Parenthesis));
    }

    #[test]
    fn test_parentheses_inside_literals_are_ignored() {
        assert!(is_balanced("SELECT ':)' FROM t", Delimiter::Parenthesis));
        assert!(is_balanced("SELECT [weird(name] FROM t", Delimiter::Parenthesis));
        assert!(is_balanced(
            "SELECT * FROM users WHERE id IN [1,2,3]",
            Delimiter::Parenthesis
        ));
    }

    #[test]
    fn test_quote_balance() {
        assert!(is_balanced("SELECT 'it''s' FROM t", Delimiter::Quote));
        assert!(is_balanced("SELECT 'it\\'s' FROM t", Delimiter::Quote));
        assert!(is_balanced("SELECT \"say 'hi'\" FROM t", Delimiter::Quote));
        assert!(!is_balanced("SELECT 'open FROM t", Delimiter::Quote));
    }

    #[test]
    fn test_locate_stray_closing_paren() {
        let sql = "SELECT a\nFROM t)\nWHERE (b = 1)";
        assert_eq!(
            locate_first_imbalance(sql, Delimiter::Parenthesis),
            Some(Position { line: 2, column: 7 })
        );
    }

    #[test]
    fn test_locate_last_unmatched_opener() {
        let sql = "SELECT (a\nFROM (t";
        assert_eq!(
            locate_first_imbalance(sql, Delimiter::Parenthesis),
            Some(Position { line: 2, column: 6 })
        );
    }

    #[test]
    fn test_locate_unterminated_quote() {
        let sql = "SELECT 'ok'\nFROM t WHERE name = 'bob";
        assert_eq!(
            locate_first_imbalance(sql, Delimiter::Quote),
            Some(Position { line: 2, column: 21 })
        );
    }

    #[test]
    fn test_is_inside_quotes() {
        assert!(is_inside_quotes("WHERE name = '"));
        assert!(is_inside_quotes("WHERE name = \"abc "));
        assert!(!is_inside_quotes("WHERE name = 'abc' AND "));
    }

    #[test]
    fn test_classification_depth_and_code() {
        let sql = "a ('(' b) c";
        let class = classify(sql);
        assert!(class.is_code(0));
        assert!(!class.is_code(4));
        assert_eq!(class.depth_at(7), 1);
        assert_eq!(class.depth_at(10), 0);
        assert!(class.is_code(sql.len()));
    }

    #[test]
    fn test_split_statements_ignores_quoted_semicolons() {
        let sql = "SELECT ';' FROM a; SELECT 2;  ";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], (0, "SELECT ';' FROM a"));
        assert_eq!(statements[1].1.trim(), "SELECT 2");
    }

    #[test]
    fn test_rewrite_code_leaves_literals_alone() {
        let out = rewrite_code("select 'select' from [select]", |run| run.to_uppercase());
        assert_eq!(out, "SELECT 'select' FROM [select]");
    }

    #[test]
    fn test_position_counts_characters() {
        assert_eq!(position_of("é(", 2), Position { line: 1, column: 2 });
    }
}
