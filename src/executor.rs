use crate::converge::parser::parse_file;
use crate::converge::signal::Signals;
use crate::model::Document;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

/// Upper bound on the default worker count.
pub const MAX_WORKERS: usize = 32;

/// Default worker count: one per CPU, capped at [`MAX_WORKERS`].
pub fn default_workers() -> usize {
    num_cpus::get().clamp(1, MAX_WORKERS)
}

/// Fixed-size pool of file parsing consumers.
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    /// Creates a pool; `0` selects [`default_workers`].
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            default_workers()
        } else {
            workers
        };
        Self { workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Starts the consumers. Each one takes paths until the channel closes,
    /// parses them and forwards the documents to `results`.
    ///
    /// Dropping the returned set aborts any consumer still running.
    pub(crate) fn spawn(
        &self,
        paths: mpsc::Receiver<PathBuf>,
        results: mpsc::UnboundedSender<Document>,
        signals: Signals,
    ) -> JoinSet<()> {
        let paths = Arc::new(Mutex::new(paths));
        let mut set = JoinSet::new();

        for id in 0..self.workers {
            let consumer = Consumer {
                id,
                paths: Arc::clone(&paths),
                results: results.clone(),
                signals: signals.clone(),
            };
            set.spawn(consumer.run());
        }

        set
    }
}

struct Consumer {
    id: usize,
    paths: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
    results: mpsc::UnboundedSender<Document>,
    signals: Signals,
}

impl Consumer {
    #[instrument(skip(self), fields(worker = self.id))]
    async fn run(self) {
        let mut parsed = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.signals.stopped() => None,
                path = async { self.paths.lock().await.recv().await } => path,
            };
            let Some(path) = next else {
                break;
            };

            let result = tokio::select! {
                biased;
                _ = self.signals.stopped() => break,
                result = parse_file(&path) => result,
            };

            match result {
                Ok(doc) => {
                    if self.results.send(doc).is_err() {
                        break;
                    }
                    parsed += 1;
                }
                Err(e) => {
                    // All or nothing: one bad file stops the whole merge.
                    self.signals.fail(e);
                    break;
                }
            }
        }

        debug!(files = parsed, "Worker finished");
    }
}
