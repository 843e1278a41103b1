//! Static keyword vocabularies.
//!
//! Every set stores upper-case words. The tables are built at compile time and
//! only ever read, so they can be shared freely between threads.

use phf::{phf_set, Set};

use crate::dialect::Dialect;

pub static CORE: Set<&'static str> = phf_set! {
    "SELECT", "FROM", "WHERE", "AS", "DISTINCT", "ALL", "INTO", "BY", "TOP", "WITH",
    "RECURSIVE", "ASC", "DESC", "NULLS", "FIRST", "LAST", "TRUE", "FALSE",
};

pub static JOINS: Set<&'static str> = phf_set! {
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "OUTER", "CROSS", "NATURAL", "ON", "USING",
};

pub static OPERATORS: Set<&'static str> = phf_set! {
    "AND", "OR", "NOT", "IN", "IS", "NULL", "LIKE", "BETWEEN", "EXISTS", "ANY", "SOME",
};

pub static FUNCTIONS: Set<&'static str> = phf_set! {
    "COUNT", "SUM", "AVG", "MIN", "MAX", "COALESCE", "NULLIF", "CAST", "CONVERT", "ROUND",
    "UPPER", "LOWER", "LENGTH", "SUBSTRING", "TRIM", "CONCAT", "NOW", "EXTRACT",
    "ROW_NUMBER", "RANK", "DENSE_RANK", "LAG", "LEAD", "OVER", "PARTITION",
    "CURRENT_DATE", "CURRENT_TIMESTAMP",
};

pub static CLAUSES: Set<&'static str> = phf_set! {
    "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "FETCH", "UNION", "INTERSECT", "EXCEPT",
    "CASE", "WHEN", "THEN", "ELSE", "END", "WINDOW", "ROWS", "RANGE", "PRECEDING",
    "FOLLOWING", "UNBOUNDED", "CURRENT", "ROW",
};

pub static DML: Set<&'static str> = phf_set! {
    "INSERT", "UPDATE", "DELETE", "VALUES", "SET", "MERGE", "RETURNING",
};

pub static DDL: Set<&'static str> = phf_set! {
    "CREATE", "ALTER", "DROP", "TRUNCATE", "TABLE", "INDEX", "VIEW", "DATABASE", "SCHEMA",
    "PRIMARY", "KEY", "FOREIGN", "REFERENCES", "CONSTRAINT", "DEFAULT", "UNIQUE", "CHECK",
    "ADD", "COLUMN", "CASCADE", "IF",
};

pub static TYPES: Set<&'static str> = phf_set! {
    "INT", "INTEGER", "BIGINT", "SMALLINT", "DECIMAL", "NUMERIC", "FLOAT", "REAL", "DOUBLE",
    "VARCHAR", "CHAR", "TEXT", "BOOLEAN", "DATE", "TIME", "TIMESTAMP", "INTERVAL", "JSON",
    "BLOB",
};

pub static MYSQL_EXTENSIONS: Set<&'static str> = phf_set! {
    "AUTO_INCREMENT", "ENGINE", "UNSIGNED", "SHOW", "DESCRIBE", "REPLACE", "IGNORE",
    "DUPLICATE", "STRAIGHT_JOIN", "REGEXP", "TINYINT", "MEDIUMINT", "LONGTEXT", "ENUM",
    "DATETIME",
};

pub static POSTGRESQL_EXTENSIONS: Set<&'static str> = phf_set! {
    "ILIKE", "SERIAL", "BIGSERIAL", "JSONB", "ARRAY", "LATERAL", "CONFLICT", "DO",
    "NOTHING", "BYTEA", "UUID", "SIMILAR",
};

pub static SQLITE_EXTENSIONS: Set<&'static str> = phf_set! {
    "PRAGMA", "AUTOINCREMENT", "VACUUM", "ATTACH", "DETACH", "GLOB", "WITHOUT", "ROWID",
    "REINDEX",
};

pub static SQLSERVER_EXTENSIONS: Set<&'static str> = phf_set! {
    "NVARCHAR", "IDENTITY", "GO", "EXEC", "DECLARE", "NOLOCK", "OUTPUT", "PIVOT",
    "UNPIVOT", "UNIQUEIDENTIFIER", "DATETIME2", "BIT",
};

/// Presentation category of a recognised keyword, used by highlighting callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordCategory {
    Core,
    Join,
    Operator,
    Function,
    Clause,
    Dml,
    Ddl,
    Type,
    Dialect,
}

impl KeywordCategory {
    pub fn style(self) -> &'static str {
        match self {
            Self::Core => "core keyword",
            Self::Join => "join",
            Self::Operator => "operator",
            Self::Function => "function",
            Self::Clause => "clause",
            Self::Dml => "dml",
            Self::Ddl => "ddl",
            Self::Type => "type",
            Self::Dialect => "dialect keyword",
        }
    }
}

static BASE_SETS: &[(&Set<&str>, KeywordCategory)] = &[
    (&CORE, KeywordCategory::Core),
    (&JOINS, KeywordCategory::Join),
    (&OPERATORS, KeywordCategory::Operator),
    (&FUNCTIONS, KeywordCategory::Function),
    (&CLAUSES, KeywordCategory::Clause),
    (&DML, KeywordCategory::Dml),
    (&DDL, KeywordCategory::Ddl),
    (&TYPES, KeywordCategory::Type),
];

/// Extension vocabulary for one dialect.
pub fn extensions(dialect: Dialect) -> &'static Set<&'static str> {
    match dialect {
        Dialect::MySql => &MYSQL_EXTENSIONS,
        Dialect::PostgreSql => &POSTGRESQL_EXTENSIONS,
        Dialect::Sqlite => &SQLITE_EXTENSIONS,
        Dialect::SqlServer => &SQLSERVER_EXTENSIONS,
    }
}

/// Category of `word` in the base vocabulary, if any. Case-insensitive.
pub fn category(word: &str) -> Option<KeywordCategory> {
    let upper = word.to_ascii_uppercase();
    BASE_SETS
        .iter()
        .find(|(set, _)| set.contains(upper.as_str()))
        .map(|(_, category)| *category)
        .or_else(|| {
            Dialect::ALL
                .iter()
                .any(|d| extensions(*d).contains(upper.as_str()))
                .then_some(KeywordCategory::Dialect)
        })
}

/// Whether `word` is a keyword for `dialect`. With no dialect only the base
/// vocabulary is consulted.
pub fn is_keyword(word: &str, dialect: Option<Dialect>) -> bool {
    let upper = word.to_ascii_uppercase();
    let word = upper.as_str();
    if BASE_SETS.iter().any(|(set, _)| set.contains(word)) {
        return true;
    }
    dialect.is_some_and(|d| extensions(d).contains(word))
}
