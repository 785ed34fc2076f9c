//! Line-by-line classification of Go source.
//!
//! Classification is a two-state machine driven one line at a time with no
//! lookahead. It only recognises what it needs to split a file into package
//! clause, imports and everything else; anything it does not understand is
//! passed through as code.

/// Token that opens a package clause.
pub const PACKAGE_TOKEN: &str = "package ";

/// Token that opens a parenthesised import block.
pub const IMPORT_BLOCK_START: &str = "import (";

/// Token that introduces a single-line import.
pub const IMPORT_TOKEN: &str = "import ";

/// Line that closes an import block.
pub const IMPORT_BLOCK_END: &str = ")";

/// Where the classifier currently is within a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierState {
    #[default]
    Coding,
    Importing,
}

/// What the caller should do with a classified line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAction<'a> {
    SetPackageName(&'a str),
    AddImport(&'a str),
    /// An import block just closed.
    StartCode,
    AppendCode(&'a str),
    Skip,
}

/// Classifies one line given the current state.
///
/// Rules are checked in priority order; the first match wins.
pub fn classify(state: ClassifierState, line: &str) -> (ClassifierState, LineAction<'_>) {
    if let Some(rest) = line.strip_prefix(PACKAGE_TOKEN) {
        return (
            ClassifierState::Coding,
            LineAction::SetPackageName(package_name(rest)),
        );
    }

    if line.starts_with(IMPORT_BLOCK_START) {
        return (ClassifierState::Importing, LineAction::Skip);
    }

    if let Some(clause) = line.strip_prefix(IMPORT_TOKEN) {
        return (state, LineAction::AddImport(clause.trim()));
    }

    match state {
        ClassifierState::Importing if line.trim() == IMPORT_BLOCK_END => {
            (ClassifierState::Coding, LineAction::StartCode)
        }
        ClassifierState::Importing if line.trim().is_empty() => (state, LineAction::Skip),
        ClassifierState::Importing => (state, LineAction::AddImport(line.trim())),
        ClassifierState::Coding => (state, LineAction::AppendCode(line)),
    }
}

/// First word after the package token, ignoring trailing comments.
fn package_name(rest: &str) -> &str {
    rest.split_whitespace().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClassifierState::{Coding, Importing};

    #[test]
    fn test_package_clause() {
        assert_eq!(
            classify(Coding, "package main"),
            (Coding, LineAction::SetPackageName("main"))
        );
        assert_eq!(
            classify(Importing, "package util // import \"x/util\""),
            (Coding, LineAction::SetPackageName("util"))
        );
    }

    #[test]
    fn test_import_block() {
        let (state, action) = classify(Coding, "import (");
        assert_eq!((state, action), (Importing, LineAction::Skip));

        assert_eq!(
            classify(state, "\t\"fmt\""),
            (Importing, LineAction::AddImport("\"fmt\""))
        );
        assert_eq!(
            classify(state, "\tstr \"strings\""),
            (Importing, LineAction::AddImport("str \"strings\""))
        );
        assert_eq!(classify(state, ""), (Importing, LineAction::Skip));
        assert_eq!(classify(state, ")"), (Coding, LineAction::StartCode));
    }

    #[test]
    fn test_single_line_imports() {
        assert_eq!(
            classify(Coding, "import \"os\""),
            (Coding, LineAction::AddImport("\"os\""))
        );
        assert_eq!(
            classify(Coding, "import f \"fmt\""),
            (Coding, LineAction::AddImport("f \"fmt\""))
        );
    }

    #[test]
    fn test_closing_paren_outside_imports_is_code() {
        assert_eq!(classify(Coding, ")"), (Coding, LineAction::AppendCode(")")));
    }

    #[test]
    fn test_unrecognised_lines_fall_back_to_code() {
        assert_eq!(
            classify(Coding, "import(\"fmt\")"),
            (Coding, LineAction::AppendCode("import(\"fmt\")"))
        );
        assert_eq!(
            classify(Coding, "  package inner"),
            (Coding, LineAction::AppendCode("  package inner"))
        );
        assert_eq!(classify(Coding, ""), (Coding, LineAction::AppendCode("")));
    }
}
