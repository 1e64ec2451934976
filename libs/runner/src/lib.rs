//! Process-wide lifecycle supervisor — spec.md §4.11, generalized from
//! `bins/server/src/cmd/serve.rs`'s signal-wait / cancel / drain / abort
//! shutdown sequence into a reusable [`Runner`] any binary in this
//! workspace can build on.

use std::future::Future;
use std::time::Duration;

use endpoint_api::EndpointError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the [`CancellationToken`] and task handles for one run of a
/// process. Construct it, [`spawn`](Runner::spawn) the endpoints/brokers
/// that make up the program, then hand it to
/// [`run_until_shutdown`](Runner::run_until_shutdown).
pub struct Runner {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    drain_timeout: Duration,
}

impl Runner {
    /// `drain_timeout` is how long shutdown waits for spawned tasks to
    /// finish on their own before aborting whatever is left, mirroring
    /// `serve.rs`'s fixed 5-second grace period.
    pub fn new(drain_timeout: Duration) -> Self {
        Self { token: CancellationToken::new(), handles: Vec::new(), drain_timeout }
    }

    /// A clone of the shutdown token, to thread into spawned tasks so they
    /// can observe cancellation cooperatively.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawns `task` under supervision. A task that returns `Err` or
    /// panics is logged and requests shutdown of every other spawned
    /// task, generalizing the teacher's per-connection
    /// `tracing::error!`-then-continue handlers into a process-wide
    /// "one failure brings the loop down" policy — spec.md's "global
    /// exception handler".
    pub fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), EndpointError>> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            match task.await {
                Ok(()) => {}
                Err(e) => {
                    tracing::error!(task = name, error = ?e, "task failed, requesting shutdown");
                    token.cancel();
                }
            }
        });
        self.handles.push(handle);
    }

    /// Waits for SIGINT/SIGTERM or for a supervised task to cancel the
    /// token, then awaits `finalizer`, drains spawned tasks for up to
    /// `drain_timeout`, and aborts anything still running before
    /// returning. Cancellation of the drained tasks (`JoinError::
    /// is_cancelled`) is expected and absorbed rather than surfaced.
    pub async fn run_until_shutdown<Fin>(mut self, finalizer: Option<Fin>) -> Result<(), EndpointError>
    where
        Fin: Future<Output = ()>,
    {
        wait_for_shutdown_signal(&self.token).await?;
        tracing::info!("shutting down");
        self.token.cancel();

        if let Some(fin) = finalizer {
            fin.await;
        }

        tokio::time::sleep(self.drain_timeout).await;

        for handle in &self.handles {
            if !handle.is_finished() {
                handle.abort();
            }
        }
        for handle in self.handles {
            let _ = handle.await;
        }

        tracing::info!("shutdown complete");
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(token: &CancellationToken) -> Result<(), EndpointError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
        _ = token.cancelled() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(token: &CancellationToken) -> Result<(), EndpointError> {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = token.cancelled() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn failing_task_cancels_token_and_shutdown_drains() {
        let mut runner = Runner::new(Duration::from_millis(50));
        let token = runner.token();
        let finalized = Arc::new(AtomicUsize::new(0));

        runner.spawn("failing", async { Err(EndpointError::Cancelled) });

        let other_token = token.clone();
        runner.spawn("cooperative", async move {
            other_token.cancelled().await;
            Ok(())
        });

        let finalized_clone = finalized.clone();
        let finalizer = async move {
            finalized_clone.store(1, Ordering::SeqCst);
        };

        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(1)) => panic!("token never cancelled"),
        }

        runner.run_until_shutdown(Some(finalizer)).await.unwrap();
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_finalizer_is_accepted() {
        let mut runner = Runner::new(Duration::from_millis(10));
        let token = runner.token();
        runner.spawn("quick", async { Ok(()) });
        token.cancel();
        runner.run_until_shutdown::<std::future::Ready<()>>(None).await.unwrap();
    }
}
