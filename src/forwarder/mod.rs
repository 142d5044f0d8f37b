//! The forwarder engine.
//!
//! The [`Forwarder`] is the handle producers hold: it admits payloads
//! under the configured caps, stages them (memory or disk spill), and
//! queues them for the single dispatch worker. Construct one explicitly
//! and share it by reference or `Arc` — there is deliberately no global
//! instance.
//!
//! # Lifecycle
//!
//! ```text
//! new → (enqueue ...) → start → (enqueue ...) → shutdown
//! ```
//!
//! Enqueueing before `start` is allowed; elements wait in the queue until
//! the worker comes up.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use forward_engine::{Forwarder, ForwarderConfig, NoopTransport};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let forwarder = Forwarder::new(ForwarderConfig::default(), Arc::new(NoopTransport));
//! forwarder.start().await;
//! forwarder.enqueue(b"payload".to_vec()).await.unwrap();
//! forwarder.shutdown().await;
//! # }
//! ```

mod worker;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::accounting::{SizeAccountant, StoreStatus};
use crate::config::ForwarderConfig;
use crate::element::SendElement;
use crate::metrics;
use crate::staging::StagingStore;
use crate::transport::Transport;

/// Why an admission failed.
///
/// Both variants mean the payload was **not** admitted and no state was
/// left behind; they differ only in cause. `QueueFull` is the engine's
/// backpressure signal — callers must apply their own policy (drop, shed
/// load, retry later) rather than treat it as a glitch.
#[derive(Error, Debug)]
pub enum EnqueueError {
    /// Neither tier has capacity for a payload of this size.
    #[error("queue is full")]
    QueueFull,
    /// Spilling to disk failed; the reservation was rolled back.
    #[error("failed to stage payload: {0}")]
    Staging(#[from] std::io::Error),
    /// The forwarder has been shut down.
    #[error("forwarder is shut down")]
    Closed,
}

/// Point-in-time dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStats {
    pub enqueued: u64,
    pub rejected: u64,
    pub dispatched: u64,
    pub failed: u64,
}

#[derive(Default)]
pub(crate) struct StatsInner {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    dispatched: AtomicU64,
    failed: AtomicU64,
}

impl StatsInner {
    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Tiered-buffer asynchronous forwarder.
///
/// Many producers may call [`enqueue`](Self::enqueue) concurrently;
/// exactly one background worker drains the queue FIFO through the
/// injected [`Transport`]. The two byte caps are the hard ceiling on
/// accepted-but-unsent data; admission past them fails fast with
/// [`EnqueueError::QueueFull`] instead of queueing unboundedly.
pub struct Forwarder {
    accountant: Arc<SizeAccountant>,
    staging: StagingStore,
    transport: Arc<dyn Transport>,
    queue_tx: mpsc::UnboundedSender<SendElement>,
    queue_rx: Mutex<Option<mpsc::UnboundedReceiver<SendElement>>>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_grace: Duration,
    stats: Arc<StatsInner>,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig, transport: Arc<dyn Transport>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            accountant: Arc::new(SizeAccountant::new(
                config.max_in_memory_bytes,
                config.max_on_disk_bytes,
            )),
            staging: StagingStore::new(config.spool_dir()),
            transport,
            queue_tx,
            queue_rx: Mutex::new(Some(queue_rx)),
            shutdown_tx,
            worker: Mutex::new(None),
            shutdown_grace: Duration::from_millis(config.shutdown_grace_ms),
            stats: Arc::new(StatsInner::default()),
        }
    }

    /// Admit one payload.
    ///
    /// Never blocks on the queue: the payload is either staged immediately
    /// or rejected immediately. On success exactly one reservation (and,
    /// for the disk tier, exactly one spill file) exists until the worker
    /// releases the element after its single dispatch attempt.
    pub async fn enqueue(&self, payload: Vec<u8>) -> Result<(), EnqueueError> {
        let size = payload.len() as u64;
        let status = self.accountant.classify_and_reserve(size);
        if status == StoreStatus::Full {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            metrics::record_rejected("full");
            return Err(EnqueueError::QueueFull);
        }

        let element = match self.staging.materialize(payload, status, &self.accountant).await {
            Ok(element) => element,
            Err(error) => {
                // The reservation (and any partial spill file) was already
                // rolled back inside materialize.
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                metrics::record_rejected("staging");
                return Err(EnqueueError::Staging(error));
            }
        };

        let tier = element.tier();
        if self.queue_tx.send(element).is_err() {
            // Worker gone and receiver dropped; the element we just moved
            // into send() was dropped with it, releasing the reservation.
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(EnqueueError::Closed);
        }

        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        metrics::record_enqueued(tier, size);
        metrics::set_staged_bytes(self.accountant.in_memory_bytes(), self.accountant.on_disk_bytes());
        debug!(bytes = size, tier = metrics::tier_label(tier), "payload staged");
        Ok(())
    }

    /// Bytes currently staged in memory.
    pub fn current_in_memory_size(&self) -> u64 {
        self.accountant.in_memory_bytes()
    }

    /// Bytes currently spilled to disk.
    pub fn current_on_disk_size(&self) -> u64 {
        self.accountant.on_disk_bytes()
    }

    /// Diagnostic access to the classifier.
    ///
    /// **Side-effecting**: an `InMemory`/`OnDisk` answer has reserved
    /// `candidate_size` bytes that nothing will ever release, exactly like
    /// the admission path minus the element. This mirrors the engine's
    /// historical behavior; use [`preview_tier`](Self::preview_tier) when
    /// you only want to look.
    pub fn classify_and_reserve(&self, candidate_size: u64) -> StoreStatus {
        self.accountant.classify_and_reserve(candidate_size)
    }

    /// Pure preview of which tier would admit `candidate_size` right now.
    pub fn preview_tier(&self, candidate_size: u64) -> StoreStatus {
        self.accountant.preview_tier(candidate_size)
    }

    /// Snapshot of the dispatch counters.
    pub fn stats(&self) -> ForwarderStats {
        ForwarderStats {
            enqueued: self.stats.enqueued.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            dispatched: self.stats.dispatched.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }
}
