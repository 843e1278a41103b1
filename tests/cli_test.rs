//! CLI integration tests for the sqltidy binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper: get a Command for the sqltidy binary.
fn sqltidy() -> Command {
    let mut cmd = Command::cargo_bin("sqltidy").expect("binary should exist");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper: create a temp directory with the given SQL files.
fn setup_temp_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().expect("create temp dir");
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }
    dir
}

// ─── Preformatted files (should be left unchanged) ───

#[test]
fn test_preformatted_file_unchanged() {
    let dir = setup_temp_dir(&[("query.sql", "SELECT 1\n")]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 unchanged"));
}

#[test]
fn test_preformatted_check_mode_passes() {
    let dir = setup_temp_dir(&[("query.sql", "SELECT 1\n")]);
    sqltidy().arg("--check").arg(dir.path()).assert().success();
}

#[test]
fn test_quiet_mode_prints_no_summary() {
    let dir = setup_temp_dir(&[("query.sql", "SELECT 1\n")]);
    sqltidy()
        .arg("--quiet")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

// ─── Unformatted files (should be reformatted) ───

#[test]
fn test_unformatted_file_reformatted() {
    let dir = setup_temp_dir(&[("query.sql", "select a,b from t where a=1\n")]);
    sqltidy()
        .arg("--verbose")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("reformatted"));

    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, "SELECT a, b\nFROM t\nWHERE a = 1\n");
}

#[test]
fn test_unformatted_check_mode_fails() {
    let dir = setup_temp_dir(&[("query.sql", "select 1\n")]);
    sqltidy()
        .arg("--check")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("1 reformatted"));

    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, "select 1\n");
}

#[test]
fn test_unformatted_diff_mode_shows_diff() {
    let dir = setup_temp_dir(&[("query.sql", "select 1\n")]);
    sqltidy()
        .arg("--diff")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("-select 1"))
        .stderr(predicate::str::contains("+SELECT 1"));

    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, "select 1\n");
}

#[test]
fn test_cli_flags_change_layout() {
    let dir = setup_temp_dir(&[("query.sql", "SELECT a FROM t WHERE a = 1 AND b = 2\n")]);
    sqltidy()
        .args(["--keyword-case", "lowercase", "--indent", "4"])
        .arg(dir.path())
        .assert()
        .success();

    let content = fs::read_to_string(dir.path().join("query.sql")).unwrap();
    assert_eq!(content, "select a\nfrom t\nwhere a = 1\n    and b = 2\n");
}

// ─── File discovery ───

#[test]
fn test_recursive_discovery_skips_hidden_and_other_extensions() {
    let dir = setup_temp_dir(&[
        ("a.sql", "select 1\n"),
        ("nested/b.ddl", "select 2\n"),
        (".hidden/c.sql", "select 3\n"),
        ("notes.txt", "select 4\n"),
    ]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("2 file(s) processed"));

    assert_eq!(
        fs::read_to_string(dir.path().join(".hidden/c.sql")).unwrap(),
        "select 3\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "select 4\n"
    );
}

#[test]
fn test_exclude_pattern() {
    let dir = setup_temp_dir(&[("keep.sql", "select 1\n"), ("skip_me.sql", "select 2\n")]);
    sqltidy()
        .args(["--exclude", "skip_*"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 file(s) processed"));

    assert_eq!(
        fs::read_to_string(dir.path().join("skip_me.sql")).unwrap(),
        "select 2\n"
    );
}

#[test]
fn test_many_files_in_parallel() {
    let files: Vec<(String, String)> = (0..12)
        .map(|n| (format!("q{:02}.sql", n), format!("select {} from t\n", n)))
        .collect();
    let refs: Vec<(&str, &str)> = files
        .iter()
        .map(|(name, content)| (name.as_str(), content.as_str()))
        .collect();
    let dir = setup_temp_dir(&refs);

    sqltidy()
        .args(["--threads", "2"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("12 file(s) processed, 12 reformatted"));

    assert_eq!(
        fs::read_to_string(dir.path().join("q07.sql")).unwrap(),
        "SELECT 7\nFROM t\n"
    );
}

// ─── Problems ───

#[test]
fn test_structural_problems_leave_file_alone() {
    let dir = setup_temp_dir(&[("bad.sql", "SELCT id\nFORM users\n")]);
    sqltidy()
        .arg("--no-color")
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown keyword 'FORM'. Did you mean 'FROM'?"))
        .stderr(predicate::str::contains("1 with problems"));

    assert_eq!(
        fs::read_to_string(dir.path().join("bad.sql")).unwrap(),
        "SELCT id\nFORM users\n"
    );
}

#[test]
fn test_fatal_input_is_an_error() {
    let dir = setup_temp_dir(&[("broken.sql", "SELECT (1\n")]);
    sqltidy()
        .arg("--no-color")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unmatched parentheses at line 1, column 8"));
}

#[test]
fn test_validate_mode_reports_without_writing() {
    let dir = setup_temp_dir(&[
        ("good.sql", "select id from users\n"),
        ("bad.sql", "SELECT email, COUNT(*) FROM users GROUP BY status\n"),
    ]);
    sqltidy()
        .args(["--validate", "--no-color"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Column 'email' must be included in GROUP BY clause",
        ));

    assert_eq!(
        fs::read_to_string(dir.path().join("good.sql")).unwrap(),
        "select id from users\n"
    );
}

// ─── stdin ───

#[test]
fn test_stdin_formatting() {
    sqltidy()
        .arg("-")
        .write_stdin("select a from t")
        .assert()
        .success()
        .stdout("SELECT a\nFROM t\n");
}

#[test]
fn test_stdin_dialect_warning_goes_to_stderr() {
    sqltidy()
        .args(["--dialect", "mysql", "-"])
        .write_stdin("SELECT * FROM users WHERE id IN [1,2,3]")
        .assert()
        .success()
        .stdout("SELECT *\nFROM users\nWHERE id IN [1,2,3]\n")
        .stderr(predicate::str::contains("Square brackets are not valid MySQL syntax"));
}

#[test]
fn test_stdin_detect_dialect() {
    sqltidy()
        .args(["--detect-dialect", "-"])
        .write_stdin("SELECT TOP 5 * FROM users")
        .assert()
        .success()
        .stdout("sqlserver\n");
}

#[test]
fn test_stdin_validate_prints_report() {
    sqltidy()
        .args(["--validate", "-"])
        .write_stdin("SELCT id FROM users")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"valid\": false"))
        .stdout(predicate::str::contains("Did you mean 'SELECT'?"));
}

#[test]
fn test_stdin_diagnostics_json() {
    sqltidy()
        .arg("-")
        .write_stdin("SELECT id FROM users WHERE name LIKE john")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("LIKE pattern must be"));
}

#[test]
fn test_stdin_fatal() {
    sqltidy()
        .arg("-")
        .write_stdin("   ")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SQL query is empty"));
}

// ─── Configuration ───

#[test]
fn test_config_file_is_discovered() {
    let dir = setup_temp_dir(&[
        ("sqltidy.toml", "keyword_case = \"lowercase\"\n"),
        ("query.sql", "SELECT a FROM t\n"),
    ]);
    sqltidy().arg(dir.path()).assert().success();

    assert_eq!(
        fs::read_to_string(dir.path().join("query.sql")).unwrap(),
        "select a\nfrom t\n"
    );
}

#[test]
fn test_cli_flag_overrides_config() {
    let dir = setup_temp_dir(&[("sqltidy.toml", "keyword_case = \"lowercase\"\n")]);
    sqltidy()
        .current_dir(dir.path())
        .args(["--keyword-case", "uppercase", "-"])
        .write_stdin("select a from t")
        .assert()
        .success()
        .stdout("SELECT a\nFROM t\n");
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = setup_temp_dir(&[
        ("sqltidy.toml", "line_length = 100\n"),
        ("query.sql", "select 1\n"),
    ]);
    sqltidy()
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("Unknown config option: line_length"));
}

#[test]
fn test_invalid_dialect_flag_is_rejected() {
    sqltidy()
        .args(["--dialect", "oracle", "-"])
        .write_stdin("select 1")
        .assert()
        .failure();
}
