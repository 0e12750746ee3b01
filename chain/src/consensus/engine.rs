//! Validation pipeline orchestration.
//!
//! The pipeline wires together:
//!
//! - a [`WorkQueue`] supplying pending transactions,
//! - a [`VerificationClient`] for signature and proof checks,
//! - a [`ConsensusPredicate`] applied once the cryptographic checks pass,
//! - a [`BlockNotifier`] announcing appended blocks, and
//! - the [`ChainBuilder`] it owns as the chain's only writer.
//!
//! Each iteration takes one transaction through
//! `WaitingForItem → VerifyingSignature → VerifyingProof →
//! ApplyingConsensus → Appending`. The first failing check rejects the
//! transaction and nothing later in the sequence can overturn that.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::metrics::PipelineMetrics;
use crate::queue::{BlockNotifier, QueueError, WorkQueue};
use crate::storage::ChainBuilder;
use crate::types::{Block, Transaction};
use crate::validation::{VerificationClient, VerificationResult};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::state::{IterationOutcome, PipelineState, RejectReason};
use super::validator::ConsensusPredicate;

/// Granularity at which pauses notice a stop request.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Single-consumer validation loop.
///
/// This struct is generic over:
///
/// - `Q`: work queue implementing [`WorkQueue`],
/// - `V`: verification client implementing [`VerificationClient`],
/// - `C`: consensus rule implementing [`ConsensusPredicate`],
/// - `N`: block notifier implementing [`BlockNotifier`].
pub struct ValidationPipeline<Q, V, C, N> {
    config: PipelineConfig,
    queue: Q,
    verifier: V,
    predicate: C,
    notifier: N,
    chain: ChainBuilder,
    state: PipelineState,
    consecutive_queue_failures: u32,
    last_queue_error: Option<QueueError>,
    items_consumed: u64,
    metrics: Option<PipelineMetrics>,
}

impl<Q, V, C, N> ValidationPipeline<Q, V, C, N>
where
    Q: WorkQueue,
    V: VerificationClient,
    C: ConsensusPredicate,
    N: BlockNotifier,
{
    /// Creates a pipeline that appends to `chain`.
    pub fn new(
        config: PipelineConfig,
        queue: Q,
        verifier: V,
        predicate: C,
        notifier: N,
        chain: ChainBuilder,
    ) -> Self {
        Self {
            config,
            queue,
            verifier,
            predicate,
            notifier,
            chain,
            state: PipelineState::WaitingForItem,
            consecutive_queue_failures: 0,
            last_queue_error: None,
            items_consumed: 0,
            metrics: None,
        }
    }

    /// Records Prometheus metrics while processing.
    pub fn with_metrics(mut self, metrics: PipelineMetrics) -> Self {
        metrics.chain_length.set(self.chain.len() as i64);
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The chain built so far.
    pub fn chain(&self) -> &ChainBuilder {
        &self.chain
    }

    /// Consumes the pipeline, handing back its chain.
    pub fn into_chain(self) -> ChainBuilder {
        self.chain
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Number of queue failures since the queue last answered.
    pub fn consecutive_queue_failures(&self) -> u32 {
        self.consecutive_queue_failures
    }

    /// Queue items [`run`](Self::run) has taken, whatever became of them.
    pub fn items_consumed(&self) -> u64 {
        self.items_consumed
    }

    /// Runs one iteration: dequeue with the configured timeout, then
    /// verify and settle whatever arrived.
    pub fn process_next(&mut self) -> IterationOutcome {
        self.state = PipelineState::WaitingForItem;

        let dequeued = self
            .queue
            .dequeue_blocking(&self.config.queue_name, self.config.dequeue_timeout);

        match dequeued {
            Ok(None) => {
                self.queue_answered();
                IterationOutcome::Idle
            }
            Ok(Some(tx)) => {
                self.queue_answered();
                if let Some(m) = &self.metrics {
                    m.transactions_dequeued.inc();
                }
                self.process_transaction(tx)
            }
            Err(QueueError::Malformed(reason)) => {
                self.queue_answered();
                warn!(%reason, "discarding malformed queue message");
                if let Some(m) = &self.metrics {
                    m.malformed_messages.inc();
                }
                IterationOutcome::Malformed(reason)
            }
            Err(e) => {
                self.state = PipelineState::Disconnected;
                self.consecutive_queue_failures = self.consecutive_queue_failures.saturating_add(1);
                error!(
                    error = %e,
                    attempt = self.consecutive_queue_failures,
                    "work queue unavailable, backing off"
                );
                if let Some(m) = &self.metrics {
                    m.queue_unavailable.inc();
                }
                let message = e.to_string();
                self.last_queue_error = Some(e);
                IterationOutcome::Disconnected(message)
            }
        }
    }

    /// Verifies `tx` and, if every check passes, appends it as a new block.
    pub fn process_transaction(&mut self, tx: Transaction) -> IterationOutcome {
        let started = Instant::now();

        let outcome = match self.evaluate(&tx) {
            Ok(()) => {
                self.state = PipelineState::Appending;
                let block = self.chain.append(tx);
                info!(
                    block_number = block.block_number,
                    hash = %block.hash,
                    data = block.transaction().map_or("N/A", Transaction::label),
                    "appended block"
                );
                if let Some(m) = &self.metrics {
                    m.blocks_appended.inc();
                    m.chain_length.set(self.chain.len() as i64);
                }
                self.notify(&block);
                IterationOutcome::Accepted(block)
            }
            Err(reason) => {
                info!(%reason, data = tx.label(), "rejected transaction");
                if let Some(m) = &self.metrics {
                    m.transactions_rejected
                        .with_label_values(&[reason.as_str()])
                        .inc();
                }
                IterationOutcome::Rejected(reason)
            }
        };

        if let Some(m) = &self.metrics {
            m.transaction_processing_seconds
                .observe(started.elapsed().as_secs_f64());
        }
        self.state = PipelineState::WaitingForItem;
        outcome
    }

    /// Runs the checks in order, stopping at the first failure.
    fn evaluate(&mut self, tx: &Transaction) -> Result<(), RejectReason> {
        self.state = PipelineState::VerifyingSignature;
        let material = tx
            .signature_material()
            .ok_or(RejectReason::MissingSignatureMaterial)?;

        match self.verifier.verify_signature(
            material.signed_data,
            material.original_data,
            material.public_key,
        ) {
            VerificationResult::Valid => {}
            VerificationResult::Invalid => return Err(RejectReason::SignatureInvalid),
            VerificationResult::Unreachable => {
                self.record_unreachable("signature");
                return Err(RejectReason::SignatureUnreachable);
            }
        }

        if let Some(proof) = tx.proof() {
            self.state = PipelineState::VerifyingProof;
            match self.verifier.verify_proof(proof, material.original_data) {
                VerificationResult::Valid => {}
                VerificationResult::Invalid => return Err(RejectReason::ProofInvalid),
                VerificationResult::Unreachable => {
                    self.record_unreachable("proof");
                    return Err(RejectReason::ProofUnreachable);
                }
            }
        } else {
            debug!(data = tx.label(), "no proof attached");
        }

        self.state = PipelineState::ApplyingConsensus;
        if !self.predicate.accepts(tx) {
            return Err(RejectReason::ConsensusRejected);
        }

        Ok(())
    }

    fn notify(&mut self, block: &Block) {
        if let Err(e) = self.notifier.publish(&self.config.notify_channel, block) {
            warn!(
                error = %e,
                block_number = block.block_number,
                "failed to publish block notification"
            );
            if let Some(m) = &self.metrics {
                m.notify_failures.inc();
            }
        }
    }

    fn record_unreachable(&self, check: &str) {
        if let Some(m) = &self.metrics {
            m.verification_unreachable.with_label_values(&[check]).inc();
        }
    }

    fn queue_answered(&mut self) {
        if self.consecutive_queue_failures > 0 {
            info!(
                failures = self.consecutive_queue_failures,
                "work queue reachable again"
            );
        }
        self.consecutive_queue_failures = 0;
        self.last_queue_error = None;
    }

    /// Runs the loop until `stop` is cancelled.
    ///
    /// The token is checked before each iteration, so an in-flight
    /// transaction always settles before the loop exits. Pauses between
    /// iterations wake up early on cancellation.
    ///
    /// Panics inside an iteration are caught, logged and survived. The
    /// loop only fails if the queue stays unreachable for more than
    /// [`PipelineConfig::max_consecutive_queue_failures`] attempts.
    pub fn run(&mut self, stop: &CancellationToken) -> Result<(), PipelineError> {
        info!(
            validator_id = self.chain.validator_id(),
            queue = %self.config.queue_name,
            "validation pipeline started"
        );

        while !stop.is_cancelled() {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.process_next())) {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(%message, "unexpected error while processing transaction");
                    self.state = PipelineState::WaitingForItem;
                    IterationOutcome::Failed(message)
                }
            };
            if outcome.consumed_item() {
                self.items_consumed += 1;
            }

            match outcome {
                IterationOutcome::Disconnected(_) => {
                    let attempts = self.consecutive_queue_failures;
                    if self
                        .config
                        .max_consecutive_queue_failures
                        .is_some_and(|max| attempts >= max)
                    {
                        let last_error = self.last_queue_error.take().unwrap_or_else(|| {
                            QueueError::Unavailable("no error recorded".to_string())
                        });
                        error!(attempts, "giving up on work queue");
                        return Err(PipelineError::QueueUnavailable {
                            attempts,
                            last_error,
                        });
                    }
                    pause(stop, self.config.retry_delay);
                }
                _ => pause(stop, self.config.iteration_pause),
            }
        }

        info!(
            chain_length = self.chain.len(),
            items_consumed = self.items_consumed,
            "validation pipeline stopped"
        );
        Ok(())
    }
}

/// Sleeps for `total`, returning early once `stop` is cancelled.
fn pause(stop: &CancellationToken, total: Duration) {
    let deadline = Instant::now() + total;
    while !stop.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(PAUSE_SLICE));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
