use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::converge::{PipelineError, ScanRule, DEFAULT_FORMATTER};

/// Default deadline for a merge, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(about = "Merge the Go source files of a directory into a single file")]
#[command(
    version,
    long_about = "Merges the top-level Go source files of one package into a single, \
gofmt-formatted file.\n\nSubdirectories are not merged and test files (_test.go) are \
skipped unless their package is selected with --pkg. Identifiers that collide across \
files are not resolved."
)]
pub struct Cli {
    /// Directory containing the Go files to merge
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// File to write the merged code to (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File names or regular expressions to exclude (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Only merge files declaring these packages, test packages included (comma-separated)
    #[arg(short, long = "pkg", value_delimiter = ',')]
    pub packages: Vec<String>,

    /// Number of parser workers (0 = one per CPU, at most 32)
    #[arg(short, long, default_value_t = 0)]
    pub workers: usize,

    /// Seconds before the operation is cancelled (0 = no limit)
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Formatter program fed the merged source on stdin
    #[arg(long, default_value = DEFAULT_FORMATTER)]
    pub formatter: PathBuf,

    /// Emit the merged source without running a formatter
    #[arg(long, conflicts_with = "formatter")]
    pub no_format: bool,

    /// Print merge statistics as JSON to stderr
    #[arg(long)]
    pub stats: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidExclude`] if an exclude entry does not
    /// compile as a regular expression.
    pub fn scan_rule(&self) -> Result<ScanRule, PipelineError> {
        Ok(ScanRule::new()
            .with_excludes(&self.exclude)?
            .with_packages(&self.packages))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["converge"]);
        assert_eq!(cli.dir, PathBuf::from("."));
        assert!(cli.output.is_none());
        assert_eq!(cli.workers, 0);
        assert_eq!(cli.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cli.formatter, PathBuf::from("gofmt"));
        assert!(!cli.no_format);
    }

    #[test]
    fn test_comma_separated_lists() {
        let cli = Cli::parse_from([
            "converge",
            "-d",
            "pkg/util",
            "-e",
            "file1.go,gen_.*\\.go",
            "--pkg",
            "util,util_test",
            "-w",
            "4",
            "-o",
            "merged.go",
        ]);

        assert_eq!(cli.exclude, vec!["file1.go", "gen_.*\\.go"]);
        assert_eq!(cli.packages, vec!["util", "util_test"]);
        assert_eq!(cli.workers, 4);
        assert_eq!(cli.output, Some(PathBuf::from("merged.go")));

        let rule = cli.scan_rule().unwrap();
        assert_eq!(rule.excludes.len(), 2);
        assert!(rule.allows_package("util_test"));
    }

    #[test]
    fn test_invalid_exclude_fails_before_merging() {
        let cli = Cli::parse_from(["converge", "-e", "gen_,[unclosed"]);
        assert!(matches!(
            cli.scan_rule(),
            Err(PipelineError::InvalidExclude { .. })
        ));
    }

    #[test]
    fn test_no_format_conflicts_with_formatter() {
        let result = Cli::try_parse_from(["converge", "--no-format", "--formatter", "gofumpt"]);
        assert!(result.is_err());
    }
}
