// Licensed under the AGPL-3.0 (https://www.gnu.org/licenses/agpl-3.0.html).

//! Metrics instrumentation for the forwarder.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `forwarder_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for sizes
//!
//! # Labels
//! - `tier`: memory, disk
//! - `reason`: full, staging
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::Duration;

use crate::accounting::Tier;

pub(crate) fn tier_label(tier: Tier) -> &'static str {
    match tier {
        Tier::Memory => "memory",
        Tier::Disk => "disk",
    }
}

/// Record a successfully admitted payload.
pub fn record_enqueued(tier: Tier, bytes: u64) {
    counter!("forwarder_enqueued_total", "tier" => tier_label(tier)).increment(1);
    counter!("forwarder_enqueued_bytes_total", "tier" => tier_label(tier)).increment(bytes);
}

/// Record a rejected admission (`reason`: "full" or "staging").
pub fn record_rejected(reason: &'static str) {
    counter!("forwarder_rejected_total", "reason" => reason).increment(1);
}

/// Record a dispatch attempt outcome (`status`: "success" or "error").
pub fn record_dispatch(status: &'static str) {
    counter!("forwarder_dispatch_total", "status" => status).increment(1);
}

/// Record how long one transport send took.
pub fn record_dispatch_latency(duration: Duration) {
    histogram!("forwarder_dispatch_seconds").record(duration.as_secs_f64());
}

/// Set the current staged byte gauges for both tiers.
pub fn set_staged_bytes(in_memory: u64, on_disk: u64) {
    gauge!("forwarder_in_memory_bytes").set(in_memory as f64);
    gauge!("forwarder_on_disk_bytes").set(on_disk as f64);
}
