//! File selection rules for the directory scanner.

use regex::Regex;
use std::collections::BTreeSet;

use crate::converge::pipeline::PipelineError;

/// Suffix of Go source files.
pub const GO_EXTENSION: &str = ".go";

/// Suffix of Go test files.
pub const GO_TEST_SUFFIX: &str = "_test.go";

/// A file name exclusion: the exact name, or any name the regular expression
/// matches somewhere (`gen_` excludes `gen_models.go`).
#[derive(Debug, Clone)]
pub struct ExcludePattern {
    raw: String,
    regex: Regex,
}

impl ExcludePattern {
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidExclude`] if `raw` is not a valid
    /// regular expression.
    pub fn new(raw: &str) -> Result<Self, PipelineError> {
        let regex = Regex::new(raw).map_err(|source| PipelineError::InvalidExclude {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, name: &str) -> bool {
        name == self.raw || self.regex.is_match(name)
    }
}

/// Outcome of checking a file name against a [`ScanRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameVerdict {
    Rejected,
    Accepted,
    /// Eligibility depends on the package clause inside the file.
    NeedsPackage,
}

/// Which directory entries are merged.
///
/// Immutable once a merge starts.
#[derive(Debug, Clone)]
pub struct ScanRule {
    /// Required file name suffix (default: `.go`)
    pub extension: String,

    /// Suffix that marks a test file (default: `_test.go`)
    pub test_suffix: String,

    /// Whether test files are merged without a package allow-set
    pub include_tests: bool,

    /// File name exclusions, applied before anything else
    pub excludes: Vec<ExcludePattern>,

    /// When non-empty, only files declaring one of these packages are merged
    pub packages: BTreeSet<String>,
}

impl Default for ScanRule {
    fn default() -> Self {
        Self {
            extension: GO_EXTENSION.to_string(),
            test_suffix: GO_TEST_SUFFIX.to_string(),
            include_tests: false,
            excludes: Vec::new(),
            packages: BTreeSet::new(),
        }
    }
}

impl ScanRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds exclusions. Empty and duplicate entries are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidExclude`] for the first entry that does
    /// not compile.
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for raw in excludes {
            let raw = raw.as_ref().trim();
            if raw.is_empty() || self.excludes.iter().any(|e| e.as_str() == raw) {
                continue;
            }
            self.excludes.push(ExcludePattern::new(raw)?);
        }
        Ok(self)
    }

    /// Restricts merging to files declaring one of `packages`.
    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.packages.extend(
            packages
                .into_iter()
                .map(|p| p.as_ref().trim().to_string())
                .filter(|p| !p.is_empty()),
        );
        self
    }

    pub fn with_tests(mut self, include: bool) -> Self {
        self.include_tests = include;
        self
    }

    /// Checks everything that can be decided from the file name alone.
    pub fn check_name(&self, name: &str) -> NameVerdict {
        if !name.ends_with(&self.extension) {
            return NameVerdict::Rejected;
        }
        if self.excludes.iter().any(|e| e.matches(name)) {
            return NameVerdict::Rejected;
        }
        if !self.packages.is_empty() {
            return NameVerdict::NeedsPackage;
        }
        if !self.include_tests && name.ends_with(&self.test_suffix) {
            return NameVerdict::Rejected;
        }
        NameVerdict::Accepted
    }

    pub fn allows_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule() {
        let rule = ScanRule::new();
        assert_eq!(rule.check_name("main.go"), NameVerdict::Accepted);
        assert_eq!(rule.check_name("main_test.go"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("notes.txt"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("go"), NameVerdict::Rejected);
    }

    #[test]
    fn test_include_tests_flag() {
        let rule = ScanRule::new().with_tests(true);
        assert_eq!(rule.check_name("main_test.go"), NameVerdict::Accepted);
    }

    #[test]
    fn test_exclude_exact_and_regex() {
        let rule = ScanRule::new()
            .with_excludes(["file1.go", "gen_", "", "gen_"])
            .unwrap();
        assert_eq!(rule.excludes.len(), 2);

        assert_eq!(rule.check_name("file1.go"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("myfile1.go"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("gen_models.go"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("file2.go"), NameVerdict::Accepted);
    }

    #[test]
    fn test_exact_name_matches_when_regex_does_not() {
        let pattern = ExcludePattern::new("a+.go").unwrap();
        assert!(pattern.matches("a+.go"));
        assert!(pattern.matches("aa_go"));
        assert!(!pattern.matches("b.go"));
    }

    #[test]
    fn test_invalid_exclude_is_rejected() {
        match ScanRule::new().with_excludes(["file1.go", "[unclosed"]) {
            Err(PipelineError::InvalidExclude { pattern, .. }) => assert_eq!(pattern, "[unclosed"),
            other => panic!("expected invalid exclude, got {:?}", other),
        }
    }

    #[test]
    fn test_package_allow_set_defers_to_clause() {
        let rule = ScanRule::new()
            .with_packages(["main_test", " "])
            .with_excludes(["skip_test.go"])
            .unwrap();

        assert_eq!(rule.packages.len(), 1);
        assert_eq!(rule.check_name("main_test.go"), NameVerdict::NeedsPackage);
        assert_eq!(rule.check_name("skip_test.go"), NameVerdict::Rejected);
        assert_eq!(rule.check_name("README.md"), NameVerdict::Rejected);
        assert!(rule.allows_package("main_test"));
        assert!(!rule.allows_package("main"));
    }
}
