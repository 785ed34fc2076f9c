//! The `converge` command: path resolution and output handling around a
//! [`Converger`].

use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::converge::{CancelToken, Convergence, Converger, PipelineError};
use crate::traits::SourceFormatter;

/// Runs a merge for one source directory and writes the result either to a
/// destination file or to a caller-supplied writer.
pub struct ConvergeCommand<F>
where
    F: SourceFormatter,
{
    converger: Converger<F>,
    dir: PathBuf,
    dst: Option<PathBuf>,
}

impl<F> ConvergeCommand<F>
where
    F: SourceFormatter,
{
    pub fn new(converger: Converger<F>, dir: impl Into<PathBuf>) -> Self {
        Self {
            converger,
            dir: dir.into(),
            dst: None,
        }
    }

    /// Writes to `dst` instead of the writer passed to [`run`](Self::run).
    pub fn with_destination(mut self, dst: impl Into<PathBuf>) -> Self {
        self.dst = Some(dst.into());
        self
    }

    /// Resolves paths, prepares the destination, merges and writes.
    ///
    /// The destination file is created (truncated) before merging starts, but
    /// bytes are written only after the merge and formatting succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for invalid paths, any merge failure or a
    /// failed write.
    pub async fn run<W>(
        &self,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> Result<Convergence, PipelineError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let dir = absolute(&self.dir)?;
        debug!(dir = %dir.display(), "Resolved source directory");

        let mut file = match &self.dst {
            Some(dst) => {
                let dst = absolute(dst)?;
                validate_destination(&dst).await?;
                Some((tokio::fs::File::create(&dst).await?, dst))
            }
            None => None,
        };

        let merged = self.converger.converge(&dir, cancel).await?;

        match file.as_mut() {
            Some((file, dst)) => {
                file.write_all(&merged.output).await?;
                file.flush().await?;
                info!(
                    dir = %dir.display(),
                    dst = %dst.display(),
                    bytes = merged.output.len(),
                    "Wrote merged source"
                );
            }
            None => {
                writer.write_all(&merged.output).await?;
                writer.flush().await?;
            }
        }

        Ok(merged)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, PipelineError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

async fn validate_destination(dst: &Path) -> Result<(), PipelineError> {
    match tokio::fs::metadata(dst).await {
        Ok(meta) if meta.is_dir() => Err(PipelineError::InvalidDestination {
            path: dst.to_path_buf(),
            reason: "is a directory".to_string(),
        }),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipelineError::InvalidDestination {
            path: dst.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
