//! Best-effort structural summary of a single SQL statement.
//!
//! There is no grammar here: each clause is located with a keyword regex, kept
//! only when the keyword sits in plain code at the nesting depth of the main
//! SELECT, and the clause body is cut at the next clause keyword of that depth.
//! Nested expressions are not resolved. The result feeds lint heuristics only.

use std::sync::LazyLock;

use regex::{Match, Regex};

use crate::keywords;
use crate::scanner::{self, Classification, ScanState};

/// Heuristic structural summary of one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedInfo {
    /// Table names, their aliases and CTE names.
    pub tables: Vec<String>,
    /// SELECT-list expressions with any alias removed.
    pub select_columns: Vec<String>,
    /// Aliases declared in the SELECT list.
    pub select_aliases: Vec<String>,
    pub group_by: Vec<String>,
    /// ORDER BY expressions without ASC/DESC.
    pub order_by: Vec<String>,
    pub has_group_by: bool,
    pub has_aggregate: bool,
}

static SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bSELECT\b(?:\s+(?:DISTINCT|ALL)\b)?(?:\s+TOP\s+\d+(?:\s+PERCENT)?\b)?")
        .unwrap()
});
static SELECT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:FROM|INTO|WHERE|GROUP\s+BY|HAVING|ORDER\s+BY|LIMIT|UNION|INTERSECT|EXCEPT)\b",
    )
    .unwrap()
});
static GROUP_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bGROUP\s+BY\b").unwrap());
static GROUP_BY_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:HAVING|ORDER\s+BY|LIMIT|OFFSET|WINDOW|FETCH|UNION|INTERSECT|EXCEPT)\b")
        .unwrap()
});
static ORDER_BY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bORDER\s+BY\b").unwrap());
static ORDER_BY_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:LIMIT|OFFSET|FETCH|FOR|UNION|INTERSECT|EXCEPT)\b").unwrap()
});
static ORDER_DIRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\s+(?:ASC|DESC))?(?:\s+NULLS\s+(?:FIRST|LAST))?\s*$").unwrap()
});
static AS_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)^(.*?)\s+AS\s+([\w`\x22\[\]]+)$").unwrap());
static BARE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*[\w)\]`\x22])\s+([A-Za-z_]\w*)$").unwrap());
static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:FROM|JOIN|UPDATE|INTO)\s+([A-Za-z_`\x22\[][\w.`\x22\]]*)").unwrap()
});
static TABLE_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A\s+(?:AS\s+)?([A-Za-z_]\w*)").unwrap());
static CTE_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bWITH\s+(?:RECURSIVE\s+)?([A-Za-z_]\w*)\s*(?:\([^)]*\)\s*)?AS\s*\(").unwrap()
});
static CTE_NEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\)\s*,\s*([A-Za-z_]\w*)\s*(?:\([^)]*\)\s*)?AS\s*\(").unwrap()
});
static AGGREGATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:COUNT|SUM|AVG|MIN|MAX)\s*\(").unwrap());
static WINDOW_CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bOVER\s*\(").unwrap());

/// Whether `expression` calls an aggregate function.
pub fn is_aggregate(expression: &str) -> bool {
    AGGREGATE.is_match(expression)
}

/// Whether `expression` is a window function call.
pub fn is_window_call(expression: &str) -> bool {
    WINDOW_CALL.is_match(expression)
}

/// Build the structural summary of `sql`.
pub fn extract(sql: &str) -> ParsedInfo {
    let classification = scanner::classify(sql);
    let mut info = ParsedInfo {
        tables: extract_tables(sql, &classification),
        has_aggregate: AGGREGATE
            .find_iter(sql)
            .any(|m| classification.is_code(m.start())),
        ..ParsedInfo::default()
    };

    let Some(select) = main_select(sql, &classification) else {
        return info;
    };
    let depth = classification.depth_at(select.start());

    let list_end = clause_end(sql, &classification, select.end(), depth, Some(&SELECT_END));
    for item in split_top_level(&sql[select.end()..list_end]) {
        let (expression, alias) = strip_alias(&item);
        if let Some(alias) = alias {
            info.select_aliases.push(alias);
        }
        info.select_columns.push(expression);
    }

    if let Some(group) = find_at_depth(&GROUP_BY, sql, &classification, select.end(), depth) {
        info.has_group_by = true;
        let end = clause_end(sql, &classification, group.end(), depth, Some(&GROUP_BY_END));
        info.group_by = split_top_level(&sql[group.end()..end]);
    }

    if let Some(order) = find_at_depth(&ORDER_BY, sql, &classification, select.end(), depth) {
        let end = clause_end(sql, &classification, order.end(), depth, Some(&ORDER_BY_END));
        info.order_by = split_top_level(&sql[order.end()..end])
            .into_iter()
            .map(|item| ORDER_DIRECTION.replace(&item, "").trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
    }

    info
}

/// The first SELECT at the shallowest nesting depth.
fn main_select<'t>(sql: &'t str, classification: &Classification) -> Option<Match<'t>> {
    let selects: Vec<Match<'t>> = SELECT
        .find_iter(sql)
        .filter(|m| classification.is_code(m.start()))
        .collect();
    let shallowest = selects
        .iter()
        .map(|m| classification.depth_at(m.start()))
        .min()?;
    selects
        .into_iter()
        .find(|m| classification.depth_at(m.start()) == shallowest)
}

fn find_at_depth<'t>(
    re: &Regex,
    sql: &'t str,
    classification: &Classification,
    from: usize,
    depth: usize,
) -> Option<Match<'t>> {
    let end = clause_end(sql, classification, from, depth, None);
    re.find_iter(sql).find(|m| {
        m.start() >= from
            && m.start() < end
            && classification.is_code(m.start())
            && classification.depth_at(m.start()) == depth
    })
}

/// End of a clause body starting at `from`: the first terminator keyword at
/// `depth`, the parenthesis closing the enclosing level, or the end of text.
fn clause_end(
    sql: &str,
    classification: &Classification,
    from: usize,
    depth: usize,
    terminators: Option<&Regex>,
) -> usize {
    let keyword = terminators
        .and_then(|re| {
            re.find_iter(sql).filter(|m| m.start() >= from).find(|m| {
                classification.is_code(m.start()) && classification.depth_at(m.start()) == depth
            })
        })
        .map_or(sql.len(), |m| m.start());
    let close = sql.as_bytes()[from..keyword]
        .iter()
        .enumerate()
        .find(|&(i, &b)| {
            b == b')'
                && classification.is_code(from + i)
                && classification.depth_at(from + i) == depth
                && depth > 0
        })
        .map_or(keyword, |(i, _)| from + i);
    close.min(keyword)
}

/// Split on commas outside parentheses and literals; items are trimmed and
/// whitespace-collapsed, empty items dropped.
pub fn split_top_level(list: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut state = ScanState::default();
    let mut depth = 0usize;
    let mut start = 0;

    for (offset, c) in list.char_indices() {
        if !state.advance(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&list[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    items.push(&list[start..]);

    items
        .into_iter()
        .map(|item| item.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|item| !item.is_empty())
        .collect()
}

/// Split a SELECT item into its expression and alias.
fn strip_alias(item: &str) -> (String, Option<String>) {
    if let Some(caps) = AS_ALIAS.captures(item) {
        return (caps[1].trim().to_string(), Some(unquote(&caps[2])));
    }
    if let Some(caps) = BARE_ALIAS.captures(item) {
        let alias = &caps[2];
        if !keywords::is_keyword(alias, None) && !caps[1].trim().is_empty() {
            return (caps[1].trim().to_string(), Some(alias.to_string()));
        }
    }
    (item.to_string(), None)
}

fn unquote(name: &str) -> String {
    name.trim_matches(|c| matches!(c, '`' | '"' | '[' | ']'))
        .to_string()
}

fn extract_tables(sql: &str, classification: &Classification) -> Vec<String> {
    let mut tables: Vec<String> = Vec::new();
    let mut push = |name: String| {
        if !name.is_empty() && !tables.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
            tables.push(name);
        }
    };

    for caps in CTE_FIRST.captures_iter(sql).chain(CTE_NEXT.captures_iter(sql)) {
        let name = &caps[1];
        let start = caps.get(0).map_or(0, |m| m.start());
        if classification.is_code(start) {
            push(name.to_string());
        }
    }

    for caps in TABLE.captures_iter(sql) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if !classification.is_code(whole.start()) {
            continue;
        }
        push(unquote(name.as_str()));
        // The alias is peeked at, not consumed, so `FROM a JOIN b` still sees `JOIN b`.
        if let Some(alias) = TABLE_ALIAS.captures(&sql[whole.end()..]).and_then(|c| c.get(1)) {
            if !keywords::is_keyword(alias.as_str(), None) {
                push(alias.as_str().to_string());
            }
        }
    }
    tables
}
