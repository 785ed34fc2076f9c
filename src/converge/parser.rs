//! Per-file parsing into a partial [`Document`].

use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::converge::classifier::{classify, ClassifierState, LineAction};
use crate::converge::pipeline::PipelineError;
use crate::model::Document;

/// Accumulates classified lines of a single file.
#[derive(Debug, Default)]
pub struct FileParser {
    state: ClassifierState,
    doc: Document,
}

impl FileParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) {
        let (state, action) = classify(self.state, line);
        self.state = state;

        match action {
            LineAction::SetPackageName(name) => self.doc.set_package_name(name),
            LineAction::AddImport(clause) => self.doc.add_import(clause),
            LineAction::AppendCode(code) => self.doc.append_code(code),
            LineAction::StartCode | LineAction::Skip => {}
        }
    }

    pub fn finish(self) -> Document {
        self.doc
    }
}

/// Parses in-memory source text. Line terminators (`\n` or `\r\n`) are stripped.
pub fn parse_source(source: &str) -> Document {
    let mut parser = FileParser::new();
    for line in source.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Reads and parses the file at `path`.
///
/// # Errors
///
/// Returns [`PipelineError::Parse`] if the file cannot be opened or a line
/// cannot be read (including invalid UTF-8). No partial document is returned.
pub async fn parse_file(path: &Path) -> Result<Document, PipelineError> {
    let parse_err = |source| PipelineError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).await.map_err(parse_err)?;
    let mut lines = BufReader::new(file).lines();
    let mut parser = FileParser::new();

    while let Some(line) = lines.next_line().await.map_err(parse_err)? {
        parser.feed(&line);
    }

    let doc = parser.finish();
    debug!(
        path = %path.display(),
        package = %doc.package_name,
        imports = doc.imports.len(),
        lines = doc.code.len(),
        "Parsed file"
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_source_splits_sections() {
        let doc = parse_source(
            "package main\n\nimport (\n\t\"fmt\"\n\n\t\"os\"\n)\n\nfunc main() {\n\tfmt.Println(os.Args)\n}\n",
        );

        assert_eq!(doc.package_name, "main");
        let imports: Vec<_> = doc.imports.iter().map(String::as_str).collect();
        assert_eq!(imports, vec!["\"fmt\"", "\"os\""]);
        assert_eq!(
            doc.code,
            vec!["", "", "func main() {", "\tfmt.Println(os.Args)", "}"]
        );
    }

    #[test]
    fn test_parse_source_without_package_clause() {
        let doc = parse_source("func helper() {}");
        assert!(doc.package_name.is_empty());
        assert_eq!(doc.code, vec!["func helper() {}"]);
    }

    #[test]
    fn test_parse_source_strips_carriage_returns() {
        let doc = parse_source("package main\r\nimport \"fmt\"\r\nvar x = 1\r\n");
        assert_eq!(doc.package_name, "main");
        assert!(doc.imports.contains("\"fmt\""));
        assert_eq!(doc.code, vec!["var x = 1"]);
    }

    #[tokio::test]
    async fn test_parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.go");
        std::fs::write(&path, "package main\nimport \"os\"\nfunc main() { os.Exit(0) }").unwrap();

        let doc = parse_file(&path).await.unwrap();
        assert_eq!(doc.package_name, "main");
        assert!(doc.imports.contains("\"os\""));
        assert_eq!(doc.code, vec!["func main() { os.Exit(0) }"]);
    }

    #[tokio::test]
    async fn test_parse_file_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.go");

        match parse_file(&path).await {
            Err(PipelineError::Parse { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parse_file_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.go");
        std::fs::write(&path, [b'p', 0xff, 0xfe, b'\n']).unwrap();

        assert!(matches!(
            parse_file(&path).await,
            Err(PipelineError::Parse { .. })
        ));
    }
}
