use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("failed to run formatter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("formatter `{program}` rejected the merged source: {message}")]
    Rejected { program: String, message: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Canonical source formatter applied to the merged output.
#[async_trait]
pub trait SourceFormatter: Send + Sync {
    /// Returns the formatter name used in logs (e.g., "gofmt").
    fn name(&self) -> &str;

    /// Formats unformatted source text, or rejects it when it does not parse.
    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError>;
}
