use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::Parser;

use sqltidy::report::{FileStatus, Report};
use sqltidy::{Dialect, FormatOutcome, FormatResult, KeywordCase, Mode};

/// sqltidy - A dialect-aware SQL formatter and validator.
#[derive(Parser, Debug)]
#[command(name = "sqltidy", version, about)]
struct Cli {
    /// Files or directories to format. Use "-" to read from stdin.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// SQL dialect: mysql, postgresql, sqlite, sqlserver.
    #[arg(short = 'd', long)]
    dialect: Option<Dialect>,

    /// Spaces per indent level.
    #[arg(short = 'i', long)]
    indent: Option<usize>,

    /// Keyword case: uppercase, lowercase, unchanged.
    #[arg(long)]
    keyword_case: Option<KeywordCase>,

    /// Drop comments from the output.
    #[arg(long)]
    no_comments: bool,

    /// Check formatting without writing changes.
    #[arg(long)]
    check: bool,

    /// Show formatting diff.
    #[arg(long)]
    diff: bool,

    /// Only validate; report problems without formatting.
    #[arg(long)]
    validate: bool,

    /// Print the detected dialect of each input.
    #[arg(long)]
    detect_dialect: bool,

    /// Skip the equivalence check on formatted output (faster).
    #[arg(long)]
    fast: bool,

    /// Glob patterns to exclude.
    #[arg(long)]
    exclude: Vec<String>,

    /// Number of threads for parallel processing (0 = all cores).
    #[arg(short = 't', long, default_value_t = 0)]
    threads: usize,

    /// Disable multi-threaded processing.
    #[arg(long)]
    single_process: bool,

    /// Path to config file (sqltidy.toml or pyproject.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only).
    #[arg(short, long)]
    quiet: bool,

    /// Disable color output.
    #[arg(long)]
    no_color: bool,

    /// Force color output.
    #[arg(long)]
    force_color: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match try_main(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}

fn try_main(cli: Cli) -> anyhow::Result<i32> {
    let is_stdin = cli.files.len() == 1 && cli.files[0].to_string_lossy() == "-";

    let base_mode = sqltidy::load_config(&cli.files, cli.config.as_deref())
        .context("Configuration error")?;
    let mode = build_mode(&cli, base_mode);

    if is_stdin {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("Error reading stdin")?;
        return run_stdin(&source, &cli, &mode);
    }

    if cli.detect_dialect {
        for path in sqltidy::get_matching_paths(&cli.files, &mode) {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Error reading {}", path.display()))?;
            println!("{}: {}", path.display(), sqltidy::detect_sql_dialect(&source));
        }
        return Ok(0);
    }

    let report = sqltidy::run(&cli.files, &mode);

    if !mode.quiet {
        print_verbose_results(&report, &mode);
        eprintln!("{}", report.summary());
    }
    report
        .print_problems(mode.color_choice())
        .context("Error writing diagnostics")?;

    if report.has_errors() {
        Ok(2)
    } else if report.has_diagnostics() || (mode.check && report.has_changes()) {
        Ok(1)
    } else {
        Ok(0)
    }
}

/// CLI flags win over config file values.
fn build_mode(cli: &Cli, base: Mode) -> Mode {
    let mut options = base.options;
    if let Some(dialect) = cli.dialect {
        options.dialect = dialect;
    }
    if let Some(indent) = cli.indent {
        options.indent_size = indent;
    }
    if let Some(case) = cli.keyword_case {
        options.keyword_case = case;
    }
    options.preserve_comments &= !cli.no_comments;
    options.fast = cli.fast;

    Mode {
        options,
        check: cli.check,
        diff: cli.diff,
        validate_only: cli.validate,
        exclude: if cli.exclude.is_empty() {
            base.exclude
        } else {
            cli.exclude.clone()
        },
        verbose: cli.verbose,
        quiet: cli.quiet,
        no_color: cli.no_color,
        force_color: cli.force_color,
        threads: cli.threads,
        single_process: cli.single_process,
    }
}

fn run_stdin(source: &str, cli: &Cli, mode: &Mode) -> anyhow::Result<i32> {
    if cli.detect_dialect {
        println!("{}", sqltidy::detect_sql_dialect(source));
        return Ok(0);
    }

    if mode.validate_only {
        let report = sqltidy::validate_sql_for(source, mode.options.dialect);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if report.valid { 0 } else { 1 });
    }

    match sqltidy::format_outcome(source, &mode.options) {
        FormatOutcome::Formatted {
            formatted,
            warnings,
            ..
        } => {
            if !mode.quiet {
                for warning in &warnings {
                    eprintln!("warning: line {}: {}", warning.line, warning.message);
                }
            }
            if mode.check {
                return Ok(if formatted == source { 0 } else { 1 });
            }
            print!("{}", formatted);
            Ok(0)
        }
        outcome @ FormatOutcome::DiagnosticsOnly { .. } => {
            let result = FormatResult::from(outcome);
            println!("{}", result.warning.unwrap_or_default());
            Ok(1)
        }
        FormatOutcome::Fatal { message } => {
            eprintln!("Error: {}", message);
            Ok(2)
        }
    }
}

fn print_verbose_results(report: &Report, mode: &Mode) {
    if !mode.verbose {
        return;
    }
    for result in &report.results {
        match result.status {
            FileStatus::Changed if mode.writes_files() => {
                eprintln!("reformatted {}", result.path.display());
            }
            FileStatus::Changed => {
                eprintln!("would reformat {}", result.path.display());
            }
            FileStatus::Diagnostics => {
                eprintln!("problems found in {}", result.path.display());
            }
            FileStatus::Error | FileStatus::Unchanged => {}
        }
    }
}
