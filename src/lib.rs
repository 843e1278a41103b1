pub mod api;
pub mod case;
pub mod comment;
pub mod config;
pub mod dialect;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod indenter;
pub mod keywords;
pub mod mode;
pub mod options;
pub mod report;
pub mod result;
pub mod scanner;
pub mod splitter;
mod string_utils;
pub mod validator;

// Re-export the main public API
pub use api::{
    detect_sql_dialect, format_keywords, format_outcome, format_sql, get_keyword_style,
    get_matching_paths, run, validate_sql, validate_sql_for,
};
pub use config::load_config;
pub use dialect::Dialect;
pub use error::{Result, SqltidyError};
pub use mode::Mode;
pub use options::{FormatterOptions, KeywordCase};
pub use result::{FormatOutcome, FormatResult};
pub use validator::{ValidationError, ValidationReport, ValidationWarning};
