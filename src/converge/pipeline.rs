//! Merge pipeline coordinator.
//!
//! This module provides the [`Converger`] that merges every eligible Go file
//! of one directory:
//! - One scanner task producing paths into a bounded queue
//! - A [`WorkerPool`] of parsers consuming that queue
//! - A single aggregator folding partial documents into the result
//! - Rendering through a [`SourceFormatter`]
//!
//! The pipeline is all or nothing: the first failure anywhere stops every
//! task and is the only error reported. Output is produced in memory and
//! handed back only after a fully successful render.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use crate::converge::render::render;
use crate::converge::rules::ScanRule;
use crate::converge::scanner::Scanner;
use crate::converge::signal::{CancelToken, Signals};
use crate::executor::WorkerPool;
use crate::model::Document;
use crate::traits::{FormatError, SourceFormatter};

// ============================================================================
// Pipeline Types
// ============================================================================

/// Statistics about a merge.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Number of files merged
    pub files_merged: usize,

    /// Distinct import clauses in the output
    pub imports: usize,

    /// Code lines carried over
    pub code_lines: usize,

    /// Size of the formatted output (bytes)
    pub output_bytes: usize,

    /// Time spent scanning, parsing and aggregating (milliseconds)
    pub merge_duration_ms: u64,

    /// Time spent rendering and formatting (milliseconds)
    pub format_duration_ms: u64,

    /// Total time for the whole operation (milliseconds)
    pub total_duration_ms: u64,
}

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct Convergence {
    /// The merged document before rendering
    pub document: Document,

    /// Formatted source; empty when no file was eligible
    pub output: Vec<u8>,

    pub stats: MergeStats,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that can end a merge. Exactly one is reported per failed run.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Source path missing or not a directory
    #[error("Invalid source directory '{}': {reason}", path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// Destination path unusable (e.g. a directory)
    #[error("Invalid destination '{}': {reason}", path.display())]
    InvalidDestination { path: PathBuf, reason: String },

    /// An exclude entry is not a valid regular expression
    #[error("Invalid exclude pattern '{pattern}': {source}")]
    InvalidExclude {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Directory enumeration failed
    #[error("Failed to scan '{}': {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be read
    #[error("Failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The merged source was rejected by the formatter
    #[error("Failed to format merged source: {0}")]
    Format(#[from] FormatError),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation exceeded its deadline
    #[error("Operation timed out after {timeout_secs}s")]
    TimedOut { timeout_secs: u64 },

    /// Writing the output failed
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl PipelineError {
    /// True for explicit cancellation and deadline expiry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut { .. })
    }
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Merges the Go files of a directory into one formatted source file.
///
/// # Ordering
///
/// With more than one worker, code from different files is appended in the
/// order workers finish, not in directory order. Use `with_workers(1)` when a
/// reproducible code order matters. Imports are always sorted.
///
/// # Example
///
/// ```ignore
/// use converge::converge::{CancelToken, Converger, Gofmt, ScanRule};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let converger = Converger::new(Gofmt::new())
///         .with_rule(ScanRule::new().with_excludes(["zz_generated.go"])?)
///         .with_timeout(Duration::from_secs(15));
///
///     let merged = converger.converge("./pkg".as_ref(), &CancelToken::new()).await?;
///     println!("{}", String::from_utf8_lossy(&merged.output));
///     Ok(())
/// }
/// ```
pub struct Converger<F>
where
    F: SourceFormatter,
{
    formatter: F,

    rule: ScanRule,

    /// Number of parser workers
    workers: usize,

    /// Deadline for the whole operation (default: none)
    timeout: Option<Duration>,
}

impl<F> Converger<F>
where
    F: SourceFormatter,
{
    /// Creates a converger with the default scan rule, one worker per CPU
    /// (capped) and no deadline.
    pub fn new(formatter: F) -> Self {
        Self {
            formatter,
            rule: ScanRule::default(),
            workers: WorkerPool::new(0).workers(),
            timeout: None,
        }
    }

    /// Sets the worker count; `0` selects the default.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = WorkerPool::new(workers).workers();
        self
    }

    pub fn with_rule(mut self, rule: ScanRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the deadline for the whole operation. A zero duration disables it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Merges every eligible file in `dir` and formats the result.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if:
    /// - `dir` does not exist or is not a directory
    /// - Enumerating the directory or reading a file fails
    /// - The formatter rejects the merged source
    /// - `cancel` fires or the deadline passes before completion
    #[instrument(skip(self, dir, cancel), fields(dir = %dir.display(), workers = self.workers))]
    pub async fn converge(
        &self,
        dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Convergence, PipelineError> {
        validate_source(dir).await?;

        let run = self.run(dir, cancel);
        match self.timeout {
            Some(limit) => timeout(limit, run).await.map_err(|_| {
                info!(timeout_secs = limit.as_secs(), "Merge timed out");
                PipelineError::TimedOut {
                    timeout_secs: limit.as_secs(),
                }
            })?,
            None => run.await,
        }
    }

    async fn run(&self, dir: &Path, cancel: &CancelToken) -> Result<Convergence, PipelineError> {
        let start = Instant::now();
        let mut stats = MergeStats::default();

        // ====================================================================
        // Stage 1: Scan, parse and aggregate
        // ====================================================================

        let (document, files_merged) = self.merge(dir, cancel).await?;

        stats.files_merged = files_merged;
        stats.imports = document.imports.len();
        stats.code_lines = document.code.len();
        stats.merge_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            files = stats.files_merged,
            imports = stats.imports,
            duration_ms = stats.merge_duration_ms,
            "Merge completed"
        );

        // ====================================================================
        // Stage 2: Render and format
        // ====================================================================

        let format_start = Instant::now();
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            output = render(&document, &self.formatter) => output?,
        };

        stats.output_bytes = output.len();
        stats.format_duration_ms = format_start.elapsed().as_millis() as u64;
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            formatter = self.formatter.name(),
            bytes = stats.output_bytes,
            duration_ms = stats.format_duration_ms,
            "Formatting completed"
        );

        Ok(Convergence {
            document,
            output,
            stats,
        })
    }

    /// Runs the scanner, the worker pool and the aggregator.
    async fn merge(
        &self,
        dir: &Path,
        cancel: &CancelToken,
    ) -> Result<(Document, usize), PipelineError> {
        let (path_tx, path_rx) = mpsc::channel::<PathBuf>(self.workers);
        let (result_tx, result_rx) = mpsc::unbounded_channel::<Document>();
        let (failure_tx, failure_rx) = mpsc::channel::<PipelineError>(1);

        // Tripped by the first failure, and on every exit from this function
        // (including the future being dropped on timeout).
        let abort = CancelToken::new();
        let _teardown = abort.clone().drop_guard();
        let signals = Signals::new(cancel.clone(), abort, failure_tx);

        let pool = WorkerPool::new(self.workers);
        debug!(workers = pool.workers(), "Starting workers");
        let _workers = pool.spawn(path_rx, result_tx, signals.clone());

        let scanner = Scanner::new(self.rule.clone());
        let root = dir.to_path_buf();
        let producer = tokio::spawn(async move { scanner.produce(root, path_tx, signals).await });

        let outcome = aggregate(result_rx, failure_rx, cancel).await;
        if outcome.is_err() {
            producer.abort();
        }
        outcome
    }
}

/// Folds partial documents into one until every worker is done.
///
/// Returns as soon as the caller cancels or the first failure arrives; it
/// does not wait for the remaining tasks to wind down.
pub(crate) async fn aggregate(
    mut results: mpsc::UnboundedReceiver<Document>,
    mut failures: mpsc::Receiver<PipelineError>,
    cancel: &CancelToken,
) -> Result<(Document, usize), PipelineError> {
    let mut merged = Document::new();
    let mut files = 0usize;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            Some(err) = failures.recv() => return Err(err),
            doc = results.recv() => match doc {
                Some(doc) => {
                    merged.merge(doc);
                    files += 1;
                }
                None => break,
            },
        }
    }

    // A failure recorded just before the last worker exited still wins.
    if let Ok(err) = failures.try_recv() {
        return Err(err);
    }

    Ok((merged, files))
}

async fn validate_source(dir: &Path) -> Result<(), PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidSource {
        path: dir.to_path_buf(),
        reason,
    };

    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(invalid("not a directory".to_string())),
        Err(e) => Err(invalid(e.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
