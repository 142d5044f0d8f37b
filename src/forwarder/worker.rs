// Licensed under the AGPL-3.0 (https://www.gnu.org/licenses/agpl-3.0.html).

//! Dispatch worker: the single consumer of the staged-element queue.
//!
//! One dedicated task pops elements in FIFO order, hands each to the
//! transport, and releases it unconditionally afterwards (success and
//! failure share the drop path). Single-consumer dispatch keeps ordering
//! trivial and bounds outbound sends to one at a time.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::accounting::SizeAccountant;
use crate::element::SendElement;
use crate::metrics;
use crate::transport::Transport;

use super::{Forwarder, StatsInner};

impl Forwarder {
    /// Launch the dispatch worker. Idempotent; a second call is a no-op.
    pub async fn start(&self) {
        let mut slot = self.queue_rx.lock().await;
        let Some(queue_rx) = slot.take() else {
            warn!("forwarder already started");
            return;
        };

        let transport = Arc::clone(&self.transport);
        let accountant = Arc::clone(&self.accountant);
        let stats = Arc::clone(&self.stats);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(dispatch_loop(
            queue_rx,
            shutdown_rx,
            transport,
            accountant,
            stats,
        ));
        *self.worker.lock().await = Some(handle);
        debug!("dispatch worker started");
    }

    /// Graceful shutdown.
    ///
    /// Signals the worker to stop picking up new elements, waits up to the
    /// configured grace period for an in-flight send to finish (cooperative
    /// only — the send is not preempted within the grace window), then
    /// cancels the worker. Every element still staged at that point is
    /// released and its spill file removed on a best-effort basis, so no
    /// temp file outlives shutdown.
    pub async fn shutdown(&self) {
        info!("shutting down forwarder");
        let _ = self.shutdown_tx.send(true);

        if let Some(mut handle) = self.worker.lock().await.take() {
            if tokio::time::timeout(self.shutdown_grace, &mut handle).await.is_err() {
                warn!(
                    grace_ms = self.shutdown_grace.as_millis() as u64,
                    "in-flight send did not finish within grace period, cancelling worker"
                );
                handle.abort();
                // Await the cancellation so the in-flight element's drop
                // (release + unlink) has run before we return.
                let _ = handle.await;
            }
        }

        // Never started (or started twice): drop the receiver ourselves so
        // queued elements are swept here instead of leaking.
        drop(self.queue_rx.lock().await.take());

        metrics::set_staged_bytes(self.accountant.in_memory_bytes(), self.accountant.on_disk_bytes());
        info!(
            in_memory = self.accountant.in_memory_bytes(),
            on_disk = self.accountant.on_disk_bytes(),
            "forwarder shut down"
        );
    }
}

async fn dispatch_loop(
    mut queue_rx: mpsc::UnboundedReceiver<SendElement>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    transport: Arc<dyn Transport>,
    accountant: Arc<SizeAccountant>,
    stats: Arc<StatsInner>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            next = queue_rx.recv() => match next {
                Some(element) => dispatch_one(&transport, &accountant, &stats, element).await,
                None => break, // all senders gone
            },
        }
    }
    // Dropping queue_rx here releases everything still queued: counters
    // return to zero and spill files are unlinked via SendElement::drop.
    debug!("dispatch worker exited");
}

async fn dispatch_one(
    transport: &Arc<dyn Transport>,
    accountant: &Arc<SizeAccountant>,
    stats: &Arc<StatsInner>,
    element: SendElement,
) {
    let size = element.size_bytes();
    let started = Instant::now();

    match transport.send(&element).await {
        Ok(()) => {
            stats.record_dispatched();
            metrics::record_dispatch("success");
            debug!(bytes = size, "element dispatched");
        }
        Err(error) => {
            // Terminal for this element: at-most-once delivery. Redelivery
            // is a wrapper's job (see RetryingTransport), not the worker's.
            stats.record_failed();
            metrics::record_dispatch("error");
            warn!(bytes = size, error = %error, "dispatch failed, dropping element");
        }
    }
    metrics::record_dispatch_latency(started.elapsed());

    drop(element); // release: counter decrement + spill unlink
    metrics::set_staged_bytes(accountant.in_memory_bytes(), accountant.on_disk_bytes());
}
