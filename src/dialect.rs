use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SqltidyError;
use crate::keywords;
use crate::scanner;

/// The supported SQL flavours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    MySql,
    PostgreSql,
    Sqlite,
    SqlServer,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::MySql,
        Dialect::PostgreSql,
        Dialect::Sqlite,
        Dialect::SqlServer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlserver",
        }
    }

    /// Whether `word` is a keyword in this dialect (base vocabulary included).
    pub fn is_keyword(self, word: &str) -> bool {
        keywords::is_keyword(word, Some(self))
    }

    /// Lint rules that only make sense for this dialect.
    pub fn lint_rules(self) -> &'static [LintRule] {
        match self {
            Self::MySql => &MYSQL_RULES,
            Self::PostgreSql => &POSTGRESQL_RULES,
            Self::Sqlite => &SQLITE_RULES,
            Self::SqlServer => &SQLSERVER_RULES,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = SqltidyError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        dialect_from_name(name)
    }
}

/// Create a dialect from a string name.
pub fn dialect_from_name(name: &str) -> Result<Dialect, SqltidyError> {
    match name.to_ascii_lowercase().as_str() {
        "mysql" => Ok(Dialect::MySql),
        "postgresql" | "postgres" => Ok(Dialect::PostgreSql),
        "sqlite" => Ok(Dialect::Sqlite),
        "sqlserver" | "mssql" | "tsql" => Ok(Dialect::SqlServer),
        _ => Err(SqltidyError::Config(format!("Unknown dialect: {}", name))),
    }
}

/// A dialect-specific lint: a pattern whose matches in plain code are reported
/// as advisory warnings.
pub struct LintRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub message: &'static str,
    /// Skip matches on a line that mentions JSON, where brackets are path syntax.
    pub exempt_json: bool,
}

impl LintRule {
    fn new(name: &'static str, pattern: &str, message: &'static str) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("Invalid regex for lint rule '{}': {}", name, e));
        Self {
            name,
            pattern,
            message,
            exempt_json: false,
        }
    }

    fn exempt_json(mut self) -> Self {
        self.exempt_json = true;
        self
    }

    /// Byte offsets of every match outside string literals.
    pub fn find(&self, sql: &str) -> Vec<usize> {
        self.pattern
            .find_iter(sql)
            .map(|m| m.start())
            .filter(|&start| !scanner::is_inside_quotes(&sql[..start]))
            .filter(|&start| {
                if !self.exempt_json {
                    return true;
                }
                let line_start = sql[..start].rfind('\n').map_or(0, |i| i + 1);
                !sql[line_start..start].to_ascii_uppercase().contains("JSON")
            })
            .collect()
    }
}

impl fmt::Debug for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LintRule")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

static MYSQL_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![
        LintRule::new(
            "mysql_bracketed_in_list",
            r"(?i)\bIN\s*\[",
            "Square brackets are not valid MySQL syntax for IN lists; use parentheses instead",
        ),
        LintRule::new(
            "mysql_bracketed_identifier",
            r"\[[A-Za-z_][\w ]*\]",
            "Square brackets are not valid MySQL syntax for identifiers; use backticks instead",
        )
        .exempt_json(),
    ]
});

static POSTGRESQL_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![LintRule::new(
        "postgresql_backtick_identifier",
        r"`[^`\n]*`",
        "Backtick-quoted identifiers are not valid PostgreSQL syntax; use double quotes instead",
    )]
});

static SQLITE_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![LintRule::new(
        "sqlite_ilike",
        r"(?i)\bILIKE\b",
        "ILIKE is not supported by SQLite; LIKE is already case-insensitive for ASCII text",
    )]
});

static SQLSERVER_RULES: LazyLock<Vec<LintRule>> = LazyLock::new(|| {
    vec![LintRule::new(
        "sqlserver_limit",
        r"(?i)\bLIMIT\s+\d+",
        "LIMIT is not valid SQL Server syntax; use TOP or OFFSET ... FETCH instead",
    )]
});

static TOP_BEFORE_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bTOP\b.+?\bFROM\b").unwrap());
static SQLITE_TELLTALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bPRAGMA|\bAUTOINCREMENT\b").unwrap());
static POSTGRESQL_TELLTALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:OFFSET|ILIKE|SERIAL)\b").unwrap());

/// Guess the dialect of `sql` from telltale tokens. Defaults to MySQL.
pub fn detect_dialect(sql: &str) -> Dialect {
    if TOP_BEFORE_FROM.is_match(sql) {
        Dialect::SqlServer
    } else if SQLITE_TELLTALE.is_match(sql) {
        Dialect::Sqlite
    } else if POSTGRESQL_TELLTALE.is_match(sql) {
        Dialect::PostgreSql
    } else {
        Dialect::MySql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_name() {
        assert_eq!(dialect_from_name("mysql").unwrap(), Dialect::MySql);
        assert_eq!(dialect_from_name("PostgreSQL").unwrap(), Dialect::PostgreSql);
        assert_eq!(dialect_from_name("postgres").unwrap(), Dialect::PostgreSql);
        assert_eq!(dialect_from_name("sqlite").unwrap(), Dialect::Sqlite);
        assert_eq!(dialect_from_name("sqlserver").unwrap(), Dialect::SqlServer);
        assert!(dialect_from_name("oracle").is_err());
    }

    #[test]
    fn test_name_round_trips_through_from_str() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect.name().parse::<Dialect>().unwrap(), dialect);
        }
    }

    #[test]
    fn test_detect_dialect() {
        assert_eq!(detect_dialect("SELECT TOP 10 * FROM users"), Dialect::SqlServer);
        assert_eq!(
            detect_dialect("SELECT * FROM pragma_table_info(users)"),
            Dialect::Sqlite
        );
        assert_eq!(
            detect_dialect("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT)"),
            Dialect::Sqlite
        );
        assert_eq!(
            detect_dialect("SELECT * FROM users WHERE name ILIKE 'a%'"),
            Dialect::PostgreSql
        );
        assert_eq!(detect_dialect("SELECT * FROM users"), Dialect::MySql);
    }

    #[test]
    fn test_mysql_rules_flag_brackets() {
        let rules = Dialect::MySql.lint_rules();
        let sql = "SELECT [name] FROM users WHERE id IN [1,2,3]";
        let hits: Vec<&str> = rules
            .iter()
            .filter(|rule| !rule.find(sql).is_empty())
            .map(|rule| rule.name)
            .collect();
        assert_eq!(hits, vec!["mysql_bracketed_in_list", "mysql_bracketed_identifier"]);
    }

    #[test]
    fn test_lint_skips_string_literals_and_json_paths() {
        let rules = Dialect::MySql.lint_rules();
        let quoted = "SELECT 'IN [1]' FROM users";
        assert!(rules.iter().all(|rule| rule.find(quoted).is_empty()));
        let json = "SELECT JSON_EXTRACT(doc, path)[items] FROM t";
        assert!(rules[1].find(json).is_empty());
    }

    #[test]
    fn test_sqlserver_rules_accept_brackets() {
        let sql = "SELECT * FROM users WHERE id IN [1,2,3]";
        assert!(Dialect::SqlServer
            .lint_rules()
            .iter()
            .all(|rule| rule.find(sql).is_empty()));
        assert_eq!(
            Dialect::SqlServer.lint_rules()[0]
                .find("SELECT * FROM t LIMIT 5")
                .len(),
            1
        );
    }
}
