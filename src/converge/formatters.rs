//! [`SourceFormatter`] implementations.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::traits::{FormatError, SourceFormatter};

/// Program used when no formatter is configured.
pub const DEFAULT_FORMATTER: &str = "gofmt";

/// Runs an external gofmt-compatible program (`gofmt`, `gofumpt`, ...) that
/// reads source on stdin and writes the formatted result to stdout.
#[derive(Debug, Clone)]
pub struct Gofmt {
    program: PathBuf,
    name: String,
}

impl Default for Gofmt {
    fn default() -> Self {
        Self::with_program(DEFAULT_FORMATTER)
    }
}

impl Gofmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program.display().to_string();
        Self { program, name }
    }
}

#[async_trait]
impl SourceFormatter for Gofmt {
    fn name(&self) -> &str {
        &self.name
    }

    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FormatError::Spawn {
                program: self.name.clone(),
                source,
            })?;

        // Feed stdin concurrently so a large output cannot fill the pipe and stall us.
        let mut stdin = child.stdin.take().ok_or_else(|| {
            FormatError::IoError(std::io::Error::other("formatter stdin unavailable"))
        })?;
        let input = source.to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;
        match writer.await {
            Ok(Ok(())) => {}
            // A rejected source may close stdin early; the exit status says why.
            Ok(Err(e)) if output.status.success() => return Err(FormatError::IoError(e)),
            Ok(Err(_)) => {}
            Err(e) => return Err(FormatError::IoError(std::io::Error::other(e))),
        }

        if !output.status.success() {
            let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(formatter = %self.name, status = %output.status, "Formatter rejected source");
            return Err(FormatError::Rejected {
                program: self.name.clone(),
                message,
            });
        }

        Ok(output.stdout)
    }
}

/// Returns the source unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

#[async_trait]
impl SourceFormatter for Passthrough {
    fn name(&self) -> &str {
        "passthrough"
    }

    async fn format(&self, source: &[u8]) -> Result<Vec<u8>, FormatError> {
        Ok(source.to_vec())
    }
}
