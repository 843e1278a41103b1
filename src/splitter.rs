use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::scanner::{self, ScanState};

/// What separates the text on either side of a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Break {
    Line,
    BlankLine,
}

static CASE_PARTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:CASE|WHEN|ELSE|END)\b").unwrap());
static WINDOW: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bOVER\s*\(").unwrap());
static MULTI_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:GROUP\s+BY|ORDER\s+BY|(?:LEFT|RIGHT|FULL)(?:\s+OUTER)?\s+JOIN|INNER\s+JOIN|CROSS\s+JOIN|NATURAL\s+JOIN|UNION\s+ALL|INSERT\s+INTO|DELETE\s+FROM)\b",
    )
    .unwrap()
});
static SINGLE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:SELECT|FROM|WHERE|HAVING|LIMIT|OFFSET|VALUES|UPDATE|SET|JOIN|UNION|INTERSECT|EXCEPT|WITH|AND|OR|ON)\b",
    )
    .unwrap()
});
static BETWEEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bBETWEEN\b").unwrap());
static AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bAND\b").unwrap());
static BLOCK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A\s*(?:SELECT|WITH)\b").unwrap());
static NEXT_CTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\A\s*[A-Za-z_]\w*\s*(?:\([^)]*\)\s*)?AS\s*\(").unwrap()
});

/// Where line breaks may go, from one pass over the collapsed text.
struct Structure {
    /// Plain code outside any inline parenthesis.
    breakable: Vec<bool>,
    /// Offsets of `)` that close a subquery or CTE body.
    block_closers: Vec<usize>,
    semicolons: Vec<usize>,
    commas: Vec<usize>,
}

impl Structure {
    fn scan(text: &str) -> Self {
        let mut state = ScanState::default();
        // One entry per open parenthesis: whether it holds a subquery.
        let mut open: Vec<bool> = Vec::new();
        let mut structure = Structure {
            breakable: vec![false; text.len()],
            block_closers: Vec::new(),
            semicolons: Vec::new(),
            commas: Vec::new(),
        };

        for (offset, c) in text.char_indices() {
            if !state.advance(c) {
                continue;
            }
            structure.breakable[offset] = open.last().copied().unwrap_or(true);
            match c {
                '(' => open.push(BLOCK_START.is_match(&text[offset + 1..])),
                ')' => {
                    if open.pop() == Some(true) {
                        structure.block_closers.push(offset);
                    }
                }
                ';' => structure.semicolons.push(offset),
                ',' => structure.commas.push(offset),
                _ => {}
            }
        }
        structure
    }

    fn is_breakable(&self, offset: usize) -> bool {
        self.breakable.get(offset).copied().unwrap_or(false)
    }
}

/// LineSplitter turns one statement stream into logical lines. It collapses
/// whitespace, then marks breaks stage by stage: CASE expressions, window
/// functions, multi-word keywords, single-word keywords, subquery closers, CTE
/// definitions and statement ends. Breaks only land in plain code outside inline
/// parentheses, so function arguments and IN lists stay on one line.
#[derive(Debug, Default)]
pub struct LineSplitter;

impl LineSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Split `text` into trimmed logical lines. An empty string stands for a
    /// blank line between statements.
    pub fn split(&self, text: &str) -> Vec<String> {
        let text = collapse_whitespace(text);
        let structure = Structure::scan(&text);
        let mut breaks = BTreeMap::new();

        self.break_case_expressions(&text, &structure, &mut breaks);
        self.break_window_functions(&text, &structure, &mut breaks);
        let covered = self.break_multi_word_keywords(&text, &structure, &mut breaks);
        self.break_single_word_keywords(&text, &structure, &covered, &mut breaks);
        self.break_block_closers(&structure, &mut breaks);
        self.break_cte_definitions(&text, &structure, &mut breaks);
        self.break_statements(&text, &structure, &mut breaks);

        assemble(&text, &breaks)
    }

    fn break_case_expressions(
        &self,
        text: &str,
        structure: &Structure,
        breaks: &mut BTreeMap<usize, Break>,
    ) {
        for m in CASE_PARTS.find_iter(text) {
            if structure.is_breakable(m.start()) && !is_qualified(text, m.start()) {
                mark(breaks, m.start(), Break::Line);
            }
        }
    }

    fn break_window_functions(
        &self,
        text: &str,
        structure: &Structure,
        breaks: &mut BTreeMap<usize, Break>,
    ) {
        for m in WINDOW.find_iter(text) {
            if structure.is_breakable(m.start()) {
                mark(breaks, m.start(), Break::Line);
            }
        }
    }

    /// Returns the matched spans so the single-word pass leaves their inner
    /// words (the JOIN of LEFT JOIN, the FROM of DELETE FROM) alone.
    fn break_multi_word_keywords(
        &self,
        text: &str,
        structure: &Structure,
        breaks: &mut BTreeMap<usize, Break>,
    ) -> Vec<Range<usize>> {
        let mut covered = Vec::new();
        for m in MULTI_WORD.find_iter(text) {
            if structure.is_breakable(m.start()) && !is_qualified(text, m.start()) {
                mark(breaks, m.start(), Break::Line);
                covered.push(m.range());
            }
        }
        covered
    }

    fn break_single_word_keywords(
        &self,
        text: &str,
        structure: &Structure,
        covered: &[Range<usize>],
        breaks: &mut BTreeMap<usize, Break>,
    ) {
        let range_ands = between_ands(text, structure);
        for m in SINGLE_WORD.find_iter(text) {
            let start = m.start();
            if !structure.is_breakable(start)
                || is_qualified(text, start)
                || covered.iter().any(|span| span.contains(&start))
                || range_ands.contains(&start)
            {
                continue;
            }
            let word = m.as_str().to_ascii_uppercase();
            let previous = previous_word(text, start).to_ascii_uppercase();
            let keep_inline = match word.as_str() {
                "FROM" => previous == "DISTINCT",
                "UPDATE" => previous == "FOR" || previous == "KEY",
                "SET" => previous == "CHARACTER",
                "WITH" => !text[..start].trim_end().ends_with('('),
                _ => false,
            };
            if !keep_inline {
                mark(breaks, start, Break::Line);
            }
        }
    }

    fn break_block_closers(&self, structure: &Structure, breaks: &mut BTreeMap<usize, Break>) {
        for &offset in &structure.block_closers {
            mark(breaks, offset, Break::Line);
        }
    }

    /// `), next AS (` puts the next CTE name on a line of its own.
    fn break_cte_definitions(
        &self,
        text: &str,
        structure: &Structure,
        breaks: &mut BTreeMap<usize, Break>,
    ) {
        for &comma in &structure.commas {
            let before = text[..comma].trim_end();
            let closes_block = before.ends_with(')')
                && structure.block_closers.contains(&(before.len() - 1));
            if closes_block && NEXT_CTE.is_match(&text[comma + 1..]) {
                mark(breaks, comma + 1, Break::Line);
            }
        }
    }

    /// A run of semicolons ends one statement, after its last semicolon.
    fn break_statements(
        &self,
        text: &str,
        structure: &Structure,
        breaks: &mut BTreeMap<usize, Break>,
    ) {
        for &offset in &structure.semicolons {
            if !text[offset + 1..].trim_start().starts_with(';') {
                mark(breaks, offset + 1, Break::BlankLine);
            }
        }
    }
}

fn mark(breaks: &mut BTreeMap<usize, Break>, offset: usize, kind: Break) {
    breaks
        .entry(offset)
        .and_modify(|existing| *existing = (*existing).max(kind))
        .or_insert(kind);
}

/// Collapse every whitespace run outside literals to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    scanner::rewrite_code(text, |run| {
        let mut collapsed = String::with_capacity(run.len());
        let mut in_space = false;
        for c in run.chars() {
            if c.is_whitespace() {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(c);
                in_space = false;
            }
        }
        collapsed
    })
    .trim()
    .to_string()
}

/// A keyword-shaped word directly after `.`, `@`, `:` or `$` is a name.
fn is_qualified(text: &str, offset: usize) -> bool {
    matches!(
        text[..offset].chars().next_back(),
        Some('.' | '@' | ':' | '$' | '#')
    )
}

fn previous_word(text: &str, offset: usize) -> &str {
    let before = text[..offset].trim_end();
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        .last()
        .map_or(before.len(), |(i, _)| i);
    &before[start..]
}

/// Offsets of the AND that closes each `BETWEEN x AND y`.
fn between_ands(text: &str, structure: &Structure) -> Vec<usize> {
    BETWEEN
        .find_iter(text)
        .filter(|m| structure.is_breakable(m.start()))
        .filter_map(|m| {
            AND.find_iter(&text[m.end()..])
                .map(|and| m.end() + and.start())
                .find(|&offset| structure.is_breakable(offset))
        })
        .collect()
}

/// Cut `text` at every break and trim the pieces. Runs of breaks never produce
/// more than one blank line, and the output never starts with one.
fn assemble(text: &str, breaks: &BTreeMap<usize, Break>) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut start = 0;
    let mut preceding = Break::Line;
    let mut blank_pending = false;

    let ends = breaks
        .iter()
        .map(|(&offset, &kind)| (offset, kind))
        .chain(std::iter::once((text.len(), Break::Line)));
    for (offset, kind) in ends {
        let piece = text[start..offset].trim();
        blank_pending |= preceding == Break::BlankLine;
        if !piece.is_empty() {
            if blank_pending && !lines.is_empty() {
                lines.push(String::new());
            }
            blank_pending = false;
            lines.push(piece.to_string());
        }
        start = offset;
        preceding = kind;
    }
    lines
}
