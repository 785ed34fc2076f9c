//! Directory scanner: the producer side of the pipeline.
//!
//! Only direct entries of the source directory are considered; directories
//! are skipped, never descended into. Entries are visited in file name order.

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, instrument};

use crate::converge::classifier::PACKAGE_TOKEN;
use crate::converge::pipeline::PipelineError;
use crate::converge::rules::{NameVerdict, ScanRule};
use crate::converge::signal::Signals;

/// Enumerates eligible files of one directory according to a [`ScanRule`].
#[derive(Debug, Clone)]
pub struct Scanner {
    rule: ScanRule,
}

impl Scanner {
    pub fn new(rule: ScanRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> &ScanRule {
        &self.rule
    }

    /// Collects every eligible path in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Scan`] on the first I/O failure.
    pub async fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let mut eligible = Vec::new();
        for path in candidates(dir, &self.rule).await? {
            if self.is_eligible(&path).await? {
                eligible.push(path);
            }
        }
        Ok(eligible)
    }

    /// Streams eligible paths into `paths` until the directory is exhausted,
    /// a failure occurs or the pipeline is stopped. Dropping `paths` on return
    /// closes the channel for the workers.
    #[instrument(skip(self, dir, paths, signals), fields(dir = %dir.display()))]
    pub(crate) async fn produce(
        &self,
        dir: PathBuf,
        paths: mpsc::Sender<PathBuf>,
        signals: Signals,
    ) {
        let entries = match candidates(&dir, &self.rule).await {
            Ok(entries) => entries,
            Err(e) => return signals.fail(e),
        };

        let mut sent = 0usize;
        for path in entries {
            if signals.is_stopped() {
                debug!("Scanner stopped early");
                return;
            }

            match self.is_eligible(&path).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(path = %path.display(), "Skipping file");
                    continue;
                }
                Err(e) => return signals.fail(e),
            }

            debug!(path = %path.display(), "Queueing file");
            tokio::select! {
                _ = signals.stopped() => return,
                res = paths.send(path) => {
                    if res.is_err() {
                        return;
                    }
                    sent += 1;
                }
            }
        }

        debug!(files = sent, "Scan complete");
    }

    async fn is_eligible(&self, path: &Path) -> Result<bool, PipelineError> {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(false);
        };

        match self.rule.check_name(name) {
            NameVerdict::Rejected => Ok(false),
            NameVerdict::Accepted => Ok(true),
            NameVerdict::NeedsPackage => {
                let package = read_package_clause(path).await?;
                Ok(package.is_some_and(|p| self.rule.allows_package(&p)))
            }
        }
    }
}

/// Regular files directly inside `dir` whose names `rule` does not reject,
/// sorted by name.
///
/// Symlinks are followed, but only for names that could be merged; a broken
/// link behind such a name is a scan failure.
async fn candidates(dir: &Path, rule: &ScanRule) -> Result<Vec<PathBuf>, PipelineError> {
    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(scan_error(dir))?;
    let mut files = Vec::new();

    while let Some(entry) = read_dir.next_entry().await.map_err(scan_error(dir))? {
        let name = entry.file_name();
        let wanted = name
            .to_str()
            .is_some_and(|name| rule.check_name(name) != NameVerdict::Rejected);
        if !wanted {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type().await.map_err(scan_error(&path))?;
        let is_file = if file_type.is_symlink() {
            tokio::fs::metadata(&path)
                .await
                .map_err(scan_error(&path))?
                .is_file()
        } else {
            file_type.is_file()
        };
        if is_file {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Reads only as much of the file as needed to find its package clause.
///
/// # Errors
///
/// Returns [`PipelineError::Scan`] if the file cannot be read.
pub async fn read_package_clause(path: &Path) -> Result<Option<String>, PipelineError> {
    let file = File::open(path).await.map_err(scan_error(path))?;
    let mut lines = BufReader::new(file).lines();
    let mut header = PackageClause::default();

    while let Some(line) = lines.next_line().await.map_err(scan_error(path))? {
        match header.feed(&line) {
            ClauseStep::Continue => {}
            ClauseStep::Found(name) => return Ok(Some(name)),
            ClauseStep::Missing => return Ok(None),
        }
    }
    Ok(None)
}

fn scan_error(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError {
    let path = path.to_path_buf();
    move |source| PipelineError::Scan { path, source }
}

#[derive(Debug, PartialEq, Eq)]
enum ClauseStep {
    Continue,
    Found(String),
    Missing,
}

/// Skips blank lines and comments until the package clause.
#[derive(Debug, Default)]
struct PackageClause {
    in_block_comment: bool,
}

impl PackageClause {
    fn feed(&mut self, line: &str) -> ClauseStep {
        let mut rest = line.trim();

        loop {
            if self.in_block_comment {
                match rest.find("*/") {
                    Some(end) => {
                        self.in_block_comment = false;
                        rest = rest[end + 2..].trim_start();
                    }
                    None => return ClauseStep::Continue,
                }
            } else if let Some(after) = rest.strip_prefix("/*") {
                self.in_block_comment = true;
                rest = after;
            } else {
                break;
            }
        }

        if rest.is_empty() || rest.starts_with("//") {
            return ClauseStep::Continue;
        }

        match rest.strip_prefix(PACKAGE_TOKEN) {
            Some(decl) => match decl.split_whitespace().next() {
                Some(name) => ClauseStep::Found(name.to_string()),
                None => ClauseStep::Missing,
            },
            None => ClauseStep::Missing,
        }
    }
}
