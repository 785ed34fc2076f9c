//! Serialization of a merged [`Document`] back into Go source.

use crate::model::Document;
use crate::traits::{FormatError, SourceFormatter};

/// Builds the unformatted source text: package clause, import block, code.
///
/// An empty document renders to an empty string.
pub fn render_source(doc: &Document) -> String {
    if doc.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str("package ");
    out.push_str(&doc.package_name);
    out.push_str("\n\n");
    out.push_str(&render_imports(doc));
    out.push_str(&doc.code_text());
    out
}

fn render_imports(doc: &Document) -> String {
    match doc.imports.len() {
        0 => String::new(),
        1 => doc
            .imports
            .iter()
            .map(|imp| format!("import {}\n", imp))
            .collect(),
        _ => {
            let mut block = String::from("import (\n");
            for imp in &doc.imports {
                block.push('\t');
                block.push_str(imp);
                block.push('\n');
            }
            block.push_str(")\n");
            block
        }
    }
}

/// Renders the document and runs it through `formatter`.
///
/// # Errors
///
/// Returns the formatter's [`FormatError`] unchanged; nothing is retried.
pub async fn render<F>(doc: &Document, formatter: &F) -> Result<Vec<u8>, FormatError>
where
    F: SourceFormatter + ?Sized,
{
    let source = render_source(doc);
    if source.is_empty() {
        return Ok(Vec::new());
    }
    formatter.format(source.as_bytes()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converge::formatters::Passthrough;

    fn doc(imports: &[&str], code: &[&str]) -> Document {
        let mut d = Document::new();
        d.set_package_name("main");
        for imp in imports {
            d.add_import(imp);
        }
        for line in code {
            d.append_code(line);
        }
        d
    }

    #[test]
    fn test_render_without_imports() {
        let d = doc(&[], &["func main() {}"]);
        assert_eq!(render_source(&d), "package main\n\nfunc main() {}\n");
    }

    #[test]
    fn test_render_single_import() {
        let d = doc(&["\"fmt\""], &["func main() { fmt.Println() }"]);
        assert_eq!(
            render_source(&d),
            "package main\n\nimport \"fmt\"\nfunc main() { fmt.Println() }\n"
        );
    }

    #[test]
    fn test_render_import_block_is_sorted() {
        let d = doc(&["\"os\"", "\"fmt\"", "\"os\""], &[]);
        assert_eq!(
            render_source(&d),
            "package main\n\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n"
        );
    }

    #[tokio::test]
    async fn test_render_empty_document_skips_formatter() {
        let out = render(&Document::new(), &Passthrough).await.unwrap();
        assert!(out.is_empty());
    }
}
