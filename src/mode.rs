use termcolor::ColorChoice;

use crate::options::FormatterOptions;

/// Mode holds everything a file run needs: the formatter options plus how
/// results are reported and applied.
#[derive(Debug, Clone, Default)]
pub struct Mode {
    pub options: FormatterOptions,

    /// Report files that would change without writing them.
    pub check: bool,

    /// Print a unified diff for files that would change.
    pub diff: bool,

    /// Only run the validator; never format.
    pub validate_only: bool,

    /// Glob patterns matched against file and directory names.
    pub exclude: Vec<String>,

    pub verbose: bool,

    pub quiet: bool,

    pub no_color: bool,

    pub force_color: bool,

    /// Number of threads for parallel processing (0 = all cores).
    pub threads: usize,

    pub single_process: bool,
}

impl Mode {
    /// Whether color output is enabled.
    pub fn color(&self) -> bool {
        if self.force_color {
            return true;
        }
        if self.no_color {
            return false;
        }
        std::env::var_os("NO_COLOR").is_none()
    }

    pub fn color_choice(&self) -> ColorChoice {
        match (self.force_color, self.color()) {
            (true, _) => ColorChoice::Always,
            (false, true) => ColorChoice::Auto,
            (false, false) => ColorChoice::Never,
        }
    }

    /// Files are rewritten only outside check, diff and validate runs.
    pub fn writes_files(&self) -> bool {
        !self.check && !self.diff && !self.validate_only
    }

    /// SQL file extensions to process.
    pub fn sql_extensions(&self) -> &[&str] {
        &["sql", "ddl", "dml"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_default_mode() {
        let mode = Mode::default();
        assert_eq!(mode.options.dialect, Dialect::MySql);
        assert_eq!(mode.options.indent_size, 2);
        assert!(!mode.check);
        assert!(!mode.diff);
        assert!(!mode.validate_only);
        assert!(mode.writes_files());
    }

    #[test]
    fn test_color_logic() {
        let mut mode = Mode::default();
        mode.no_color = true;
        assert!(!mode.color());
        assert_eq!(mode.color_choice(), ColorChoice::Never);

        mode.force_color = true;
        assert!(mode.color()); // force_color overrides no_color
        assert_eq!(mode.color_choice(), ColorChoice::Always);
    }

    #[test]
    fn test_check_and_validate_do_not_write() {
        let mut mode = Mode::default();
        mode.check = true;
        assert!(!mode.writes_files());

        let mut mode = Mode::default();
        mode.validate_only = true;
        assert!(!mode.writes_files());
    }
}
