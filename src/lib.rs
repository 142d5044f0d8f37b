//! # Forward Engine
//!
//! A tiered-buffer asynchronous forwarder: many producers hand opaque
//! payloads to one engine, which stages them under hard byte caps and
//! drains them through a pluggable transport.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Admission Layer                       │
//! │  • Producers call enqueue() concurrently                    │
//! │  • classify_and_reserve: one atomic check-and-reserve       │
//! │  • QueueFull is the backpressure signal (never blocks)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Staging Tiers                         │
//! │  • Memory tier: fast path, capped in bytes                  │
//! │  • Disk tier: bounded overflow, one spill file per element  │
//! │  • Both tiers share a single FIFO queue                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Dispatch Worker                        │
//! │  • One task, strict FIFO, at-most-once per element          │
//! │  • Transport::send, then unconditional release              │
//! │  • Spill files unlinked on release and on shutdown sweep    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use forward_engine::{Forwarder, ForwarderConfig, HttpTransport};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ForwarderConfig {
//!         max_in_memory_bytes: 2 * 1024 * 1024,
//!         max_on_disk_bytes: 16 * 1024 * 1024,
//!         ..Default::default()
//!     };
//!     let transport = Arc::new(HttpTransport::new("http://localhost:8081/ingest"));
//!
//!     let forwarder = Forwarder::new(config, transport);
//!     forwarder.start().await;
//!
//!     if let Err(e) = forwarder.enqueue(b"encoded batch".to_vec()).await {
//!         // Backpressure: drop, shed load, or try again later.
//!         eprintln!("rejected: {e}");
//!     }
//!
//!     forwarder.shutdown().await;
//! }
//! ```
//!
//! ## Features
//!
//! - **Tiered Buffering**: memory first, bounded disk spillover second
//! - **Hard Caps**: the two byte caps bound all accepted-but-unsent data
//! - **Backpressure**: admission fails fast instead of queueing unboundedly
//! - **FIFO Dispatch**: elements leave in the order they were admitted
//! - **Deterministic Release**: RAII ties counters and spill files to
//!   element lifetime, on success, failure, and shutdown alike
//! - **Pluggable Transport**: HTTP, no-op, or anything implementing
//!   [`Transport`]; retry layers on top via [`RetryingTransport`]
//!
//! ## Modules
//!
//! - [`forwarder`]: the [`Forwarder`] handle and dispatch worker
//! - [`accounting`]: tier capacity accounting
//! - [`element`]: the staged [`SendElement`] unit
//! - [`staging`]: memory/disk materialization
//! - [`transport`]: the [`Transport`] seam and provided implementations
//! - [`retry`]: backoff decorator around a transport
//! - [`metrics`]: `metrics`-crate instrumentation helpers

pub mod accounting;
pub mod config;
pub mod element;
pub mod forwarder;
pub mod metrics;
pub mod retry;
pub mod staging;
pub mod transport;

pub use accounting::{SizeAccountant, StoreStatus, Tier};
pub use config::ForwarderConfig;
pub use element::SendElement;
pub use forwarder::{EnqueueError, Forwarder, ForwarderStats};
pub use retry::{RetryConfig, RetryingTransport};
pub use transport::http::HttpTransport;
pub use transport::{NoopTransport, Transport, TransportError};
