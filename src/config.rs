//! Configuration for the forwarder.
//!
//! # Example
//!
//! ```
//! use forward_engine::ForwarderConfig;
//!
//! // Minimal config (uses defaults)
//! let config = ForwarderConfig::default();
//! assert_eq!(config.max_in_memory_bytes, 8 * 1024 * 1024); // 8 MB
//!
//! // Full config
//! let config = ForwarderConfig {
//!     max_in_memory_bytes: 2 * 1024 * 1024,
//!     max_on_disk_bytes: 64 * 1024 * 1024,
//!     spool_dir: Some("/var/spool/forwarder".into()),
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;
use serde::Deserialize;

/// Configuration for the forwarder.
///
/// The two byte caps are the only parameters intrinsic to the engine:
/// together they bound the total amount of accepted-but-unsent data.
/// Batching and retry knobs live in the layers around the engine, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwarderConfig {
    /// Hard cap on staged in-memory payload bytes (default: 8 MB)
    #[serde(default = "default_max_in_memory_bytes")]
    pub max_in_memory_bytes: u64,

    /// Hard cap on payload bytes spilled to disk (default: 64 MB)
    #[serde(default = "default_max_on_disk_bytes")]
    pub max_on_disk_bytes: u64,

    /// Scratch directory for spill files (default: the OS temp dir)
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,

    /// Grace period for an in-flight send during shutdown, in milliseconds
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_max_in_memory_bytes() -> u64 { 8 * 1024 * 1024 } // 8 MB
fn default_max_on_disk_bytes() -> u64 { 64 * 1024 * 1024 } // 64 MB
fn default_shutdown_grace_ms() -> u64 { 5_000 }

impl ForwarderConfig {
    /// Resolve the spool directory, falling back to the OS temp dir.
    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            max_in_memory_bytes: default_max_in_memory_bytes(),
            max_on_disk_bytes: default_max_on_disk_bytes(),
            spool_dir: None,
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}
