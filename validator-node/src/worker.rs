//! Pipeline worker thread.
//!
//! The pipeline blocks on the work queue and on HTTP verification calls,
//! so it runs on a dedicated OS thread instead of the async runtime. The
//! queue, notifier and verification client are all built on that thread.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use popv_chain::{
    ChainBuilder, DefaultValidationPipeline, HttpVerificationClient, ParityPredicate,
    PipelineError, PipelineMetrics, QueueError, RedisBlockNotifier, RedisWorkQueue,
    ValidatorConfig, VerifyError,
};

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to set up work queue: {0}")]
    Queue(#[from] QueueError),
    #[error("failed to set up verification client: {0}")]
    Verifier(#[from] VerifyError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("pipeline worker panicked")]
    Panicked,
}

/// Handle to a running pipeline worker.
pub struct WorkerHandle {
    thread: JoinHandle<()>,
    done: oneshot::Receiver<Result<(), WorkerError>>,
}

/// Starts the validation pipeline on its own thread.
///
/// The worker cancels `stop` when it exits, for whatever reason, so the
/// rest of the node shuts down with it.
pub fn spawn(
    cfg: ValidatorConfig,
    chain: ChainBuilder,
    metrics: Option<PipelineMetrics>,
    stop: CancellationToken,
) -> std::io::Result<WorkerHandle> {
    spawn_with(stop, move |stop| run_pipeline(cfg, chain, metrics, stop))
}

fn spawn_with<F>(stop: CancellationToken, work: F) -> std::io::Result<WorkerHandle>
where
    F: FnOnce(&CancellationToken) -> Result<(), WorkerError> + Send + 'static,
{
    let (done_tx, done) = oneshot::channel();

    let thread = thread::Builder::new()
        .name("popv-pipeline".to_string())
        .spawn(move || {
            // Cancels on every exit path, unwinding included.
            let _cancel = stop.clone().drop_guard();
            let result = work(&stop);
            if let Err(e) = &result {
                error!(error = %e, "validation pipeline terminated");
            }
            let _ = done_tx.send(result);
        })?;

    Ok(WorkerHandle { thread, done })
}

fn run_pipeline(
    cfg: ValidatorConfig,
    chain: ChainBuilder,
    metrics: Option<PipelineMetrics>,
    stop: &CancellationToken,
) -> Result<(), WorkerError> {
    let queue = RedisWorkQueue::connect(&cfg.queue.redis_url, cfg.queue.connect_timeout)?;
    let notifier = RedisBlockNotifier::connect(&cfg.queue.redis_url, cfg.queue.connect_timeout)?;
    let verifier = HttpVerificationClient::new(
        cfg.verifier.signature_url.clone(),
        cfg.verifier.proof_url.clone(),
        cfg.verifier.timeout,
    )?;

    info!(
        redis = %cfg.queue.redis_url,
        signature_service = %cfg.verifier.signature_url,
        proof_service = %cfg.verifier.proof_url,
        "pipeline worker starting"
    );

    let mut pipeline = DefaultValidationPipeline::new(
        cfg.pipeline,
        queue,
        verifier,
        ParityPredicate,
        notifier,
        chain,
    );
    if let Some(metrics) = metrics {
        pipeline = pipeline.with_metrics(metrics);
    }

    pipeline.run(stop)?;
    Ok(())
}

impl WorkerHandle {
    /// Waits up to `timeout` for the worker to finish.
    ///
    /// Returns `None` if it is still running; the thread is then left
    /// detached and dies with the process.
    pub async fn join(self, timeout: Duration) -> Option<Result<(), WorkerError>> {
        let WorkerHandle { thread, done } = self;

        let result = match tokio::time::timeout(timeout, done).await {
            Ok(Ok(result)) => result,
            // The sender only drops unsent if the thread unwound.
            Ok(Err(_)) => Err(WorkerError::Panicked),
            Err(_) => return None,
        };

        // The worker has already signalled completion, so this is brief,
        // but it still blocks.
        let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finished_worker_is_joined_and_cancels_stop() {
        let stop = CancellationToken::new();
        let handle = spawn_with(stop.clone(), |_| Ok(())).unwrap();

        let result = handle.join(Duration::from_secs(5)).await;

        assert!(matches!(result, Some(Ok(()))));
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn worker_error_is_returned() {
        let stop = CancellationToken::new();
        let handle = spawn_with(stop.clone(), |_| {
            Err(WorkerError::Queue(QueueError::Unavailable("down".into())))
        })
        .unwrap();

        let result = handle.join(Duration::from_secs(5)).await;

        assert!(matches!(result, Some(Err(WorkerError::Queue(_)))));
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn panicking_worker_still_cancels_stop() {
        let stop = CancellationToken::new();
        let handle = spawn_with(stop.clone(), |_| panic!("setup exploded")).unwrap();

        let result = handle.join(Duration::from_secs(5)).await;

        assert!(matches!(result, Some(Err(WorkerError::Panicked))));
        assert!(stop.is_cancelled());
    }

    #[tokio::test]
    async fn join_gives_up_on_a_worker_that_ignores_stop() {
        let stop = CancellationToken::new();
        let handle = spawn_with(stop.clone(), |_| {
            thread::sleep(Duration::from_secs(2));
            Ok(())
        })
        .unwrap();
        stop.cancel();

        assert!(handle.join(Duration::from_millis(100)).await.is_none());
    }
}
