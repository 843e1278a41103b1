use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::SqltidyError;
use crate::mode::Mode;

const CONFIG_FILE: &str = "sqltidy.toml";
const PYPROJECT_FILE: &str = "pyproject.toml";

const KNOWN_KEYS: &[&str] = &[
    "dialect",
    "indent_size",
    "keyword_case",
    "lines_between_queries",
    "max_line_length",
    "preserve_comments",
    "exclude",
];

/// Load sqltidy configuration from `sqltidy.toml` or the `[tool.sqltidy]`
/// table of a `pyproject.toml`. Searches parent directories of the inputs if no
/// config path is given.
pub fn load_config(files: &[PathBuf], config_path: Option<&Path>) -> Result<Mode, SqltidyError> {
    let mut mode = Mode::default();

    let config_file = match config_path {
        Some(path) => {
            if path.exists() {
                Some(path.to_path_buf())
            } else {
                return Err(SqltidyError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }
        None => find_config_file(files),
    };

    if let Some(path) = config_file {
        debug!("loading config from {}", path.display());
        let raw = load_config_from_path(&path)?;
        apply_config(&mut mode, &raw)?;
    }

    Ok(mode)
}

/// Search the parent directories of the given files, nearest first.
fn find_config_file(files: &[PathBuf]) -> Option<PathBuf> {
    for parent in get_common_parents(files) {
        for name in [CONFIG_FILE, PYPROJECT_FILE] {
            let config = parent.join(name);
            if config.exists() {
                return Some(config);
            }
        }
    }
    None
}

/// Get the parent directories of the given file paths, ordered from most
/// specific to least specific.
fn get_common_parents(files: &[PathBuf]) -> Vec<PathBuf> {
    let mut parents = Vec::new();

    for file in files {
        let parent = if file.is_dir() {
            file.clone()
        } else {
            file.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        };
        let parent = parent.canonicalize().unwrap_or(parent);

        let mut current = Some(parent.as_path());
        while let Some(dir) = current {
            let dir_buf = dir.to_path_buf();
            if !parents.contains(&dir_buf) {
                parents.push(dir_buf);
            }
            current = dir.parent();
        }
    }

    parents
}

/// Load and parse a TOML config file into its sqltidy table.
fn load_config_from_path(path: &Path) -> Result<HashMap<String, toml::Value>, SqltidyError> {
    let content = std::fs::read_to_string(path)?;
    let parsed: toml::Value = toml::from_str(&content)?;

    let is_pyproject = path
        .file_name()
        .map(|n| n == PYPROJECT_FILE)
        .unwrap_or(false);
    let section = if is_pyproject {
        parsed.get("tool").and_then(|t| t.get("sqltidy"))
    } else {
        Some(&parsed)
    };

    match section {
        Some(toml::Value::Table(table)) => Ok(table
            .iter()
            .map(|(k, v)| (k.to_lowercase().replace('-', "_"), v.clone()))
            .collect()),
        _ => Ok(HashMap::new()),
    }
}

fn expect_str<'v>(key: &str, value: &'v toml::Value) -> Result<&'v str, SqltidyError> {
    value
        .as_str()
        .ok_or_else(|| SqltidyError::Config(format!("{} must be a string", key)))
}

fn expect_count(key: &str, value: &toml::Value) -> Result<usize, SqltidyError> {
    value
        .as_integer()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| SqltidyError::Config(format!("{} must be a non-negative integer", key)))
}

/// Apply configuration values to a Mode.
fn apply_config(mode: &mut Mode, config: &HashMap<String, toml::Value>) -> Result<(), SqltidyError> {
    for key in config.keys() {
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(SqltidyError::Config(format!("Unknown config option: {}", key)));
        }
    }

    let options = &mut mode.options;
    if let Some(value) = config.get("dialect") {
        options.dialect = expect_str("dialect", value)?.parse()?;
    }
    if let Some(value) = config.get("indent_size") {
        options.indent_size = expect_count("indent_size", value)?;
    }
    if let Some(value) = config.get("keyword_case") {
        options.keyword_case = expect_str("keyword_case", value)?.parse()?;
    }
    if let Some(value) = config.get("lines_between_queries") {
        options.lines_between_queries = expect_count("lines_between_queries", value)?;
    }
    if let Some(value) = config.get("max_line_length") {
        options.max_line_length = expect_count("max_line_length", value)?;
    }
    if let Some(value) = config.get("preserve_comments") {
        options.preserve_comments = value
            .as_bool()
            .ok_or_else(|| SqltidyError::Config("preserve_comments must be a boolean".into()))?;
    }
    if let Some(value) = config.get("exclude") {
        let patterns = value
            .as_array()
            .ok_or_else(|| SqltidyError::Config("exclude must be an array of globs".into()))?;
        mode.exclude = patterns
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect();
    }

    mode.options.validate()
}
