//! Cancellation and first-failure signalling shared by pipeline tasks.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::converge::pipeline::PipelineError;

/// Cloneable cancellation flag shared by the caller and every pipeline task.
///
/// Once cancelled it stays cancelled; every clone observes the same flag.
pub type CancelToken = CancellationToken;

/// Signals handed to the scanner and every worker.
///
/// `cancel` is the caller's token; `abort` is tripped by the first failure
/// (or by the pipeline tearing down) so every task stops consuming.
#[derive(Debug, Clone)]
pub(crate) struct Signals {
    cancel: CancelToken,
    abort: CancelToken,
    failures: mpsc::Sender<PipelineError>,
}

impl Signals {
    pub(crate) fn new(
        cancel: CancelToken,
        abort: CancelToken,
        failures: mpsc::Sender<PipelineError>,
    ) -> Self {
        Self {
            cancel,
            abort,
            failures,
        }
    }

    /// Records a failure and stops the pipeline. Only the first failure is
    /// kept; later ones are dropped.
    pub(crate) fn fail(&self, err: PipelineError) {
        if let Err(rejected) = self.failures.try_send(err) {
            debug!(error = %rejected.into_inner(), "Dropping secondary failure");
        }
        self.abort.cancel();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.abort.is_cancelled()
    }

    /// Completes when either the caller cancels or the pipeline aborts.
    pub(crate) async fn stopped(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.abort.cancelled() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_first_failure_wins() {
        let (tx, mut rx) = mpsc::channel(1);
        let signals = Signals::new(CancelToken::new(), CancelToken::new(), tx);

        signals.fail(PipelineError::Cancelled);
        signals.fail(PipelineError::TimedOut { timeout_secs: 1 });

        assert!(signals.is_stopped());
        assert!(matches!(rx.recv().await, Some(PipelineError::Cancelled)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stopped_by_caller_or_teardown() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancelToken::new();
        let by_caller = Signals::new(cancel.clone(), CancelToken::new(), tx.clone());
        cancel.cancel();
        tokio::time::timeout(Duration::from_millis(100), by_caller.stopped())
            .await
            .expect("caller cancellation stops the pipeline");

        let abort = CancelToken::new();
        let by_teardown = Signals::new(CancelToken::new(), abort.clone(), tx);
        assert!(!by_teardown.is_stopped());
        drop(abort.drop_guard());
        assert!(by_teardown.is_stopped());
    }
}
