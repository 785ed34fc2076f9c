use serde::Serialize;
use std::collections::BTreeSet;

/// In-memory view of a Go source file: its package name, the set of import
/// clauses it needs and the remaining code lines.
///
/// The same type holds a single file's partial result and the accumulating
/// merge result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Declared package name; the first non-empty name merged in wins.
    pub package_name: String,

    /// Import clauses (e.g. `"fmt"`, `f "fmt"`), deduplicated and kept sorted.
    pub imports: BTreeSet<String>,

    /// Code lines in merge order, without line terminators.
    pub code: Vec<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_package_name(&mut self, name: &str) {
        self.package_name = name.to_string();
    }

    pub fn add_import(&mut self, clause: &str) {
        let clause = clause.trim();
        if !clause.is_empty() {
            self.imports.insert(clause.to_string());
        }
    }

    pub fn append_code(&mut self, line: &str) {
        self.code.push(line.to_string());
    }

    /// Folds a partial document into this one: the package name is set only
    /// if still empty, imports are unioned and code lines appended.
    pub fn merge(&mut self, other: Document) {
        if self.package_name.is_empty() {
            self.package_name = other.package_name;
        }
        self.imports.extend(other.imports);
        self.code.extend(other.code);
    }

    /// True when nothing has been merged in.
    pub fn is_empty(&self) -> bool {
        self.package_name.is_empty() && self.imports.is_empty() && self.code.is_empty()
    }

    /// Code lines joined with a trailing newline after every line.
    pub fn code_text(&self) -> String {
        let mut text = String::with_capacity(self.code.iter().map(|l| l.len() + 1).sum());
        for line in &self.code {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}
