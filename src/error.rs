use thiserror::Error;

/// User-facing errors.
#[derive(Error, Debug)]
pub enum SqltidyError {
    #[error("sqltidy config error: {0}")]
    Config(String),

    #[error("SQL query is empty")]
    EmptyInput,

    #[error("{message} at line {line}, column {column}")]
    Unbalanced {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("sqltidy equivalence error: {0}")]
    Equivalence(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SqltidyError>;
