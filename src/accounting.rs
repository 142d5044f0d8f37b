// Licensed under the AGPL-3.0 (https://www.gnu.org/licenses/agpl-3.0.html).

//! Capacity accounting for the two staging tiers.
//!
//! The [`SizeAccountant`] tracks how many payload bytes are currently
//! staged in memory and spilled to disk, and decides which tier (if any)
//! can admit a new payload. Classification and reservation are one atomic
//! operation: two concurrent callers can never both pass a capacity check
//! that only one of them can satisfy.
//!
//! # Example
//!
//! ```
//! use forward_engine::{SizeAccountant, StoreStatus};
//!
//! const MB: u64 = 1024 * 1024;
//! let accountant = SizeAccountant::new(2 * MB, 10 * MB);
//!
//! assert_eq!(accountant.classify_and_reserve(MB), StoreStatus::InMemory);
//! assert_eq!(accountant.classify_and_reserve(7 * MB), StoreStatus::OnDisk);
//! assert_eq!(accountant.in_memory_bytes() + accountant.on_disk_bytes(), 8 * MB);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Outcome of a classification attempt.
///
/// `InMemory` and `OnDisk` carry a live reservation; `Full` carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// Admitted into the in-memory tier; the memory counter was reserved.
    InMemory,
    /// Admitted into the disk-spill tier; the disk counter was reserved.
    OnDisk,
    /// Neither tier has capacity; nothing was reserved.
    Full,
}

/// Staging tier of an admitted payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Memory,
    Disk,
}

/// Byte counters for in-flight staged payloads.
///
/// Both counters are only ever moved by `classify_and_reserve` (up) and
/// `release` (down), so `in_memory_bytes <= max_in_memory` and
/// `on_disk_bytes <= max_on_disk` hold at every observation point.
pub struct SizeAccountant {
    max_in_memory: u64,
    max_on_disk: u64,
    in_memory: AtomicU64,
    on_disk: AtomicU64,
}

impl SizeAccountant {
    pub fn new(max_in_memory: u64, max_on_disk: u64) -> Self {
        Self {
            max_in_memory,
            max_on_disk,
            in_memory: AtomicU64::new(0),
            on_disk: AtomicU64::new(0),
        }
    }

    /// Classify a candidate payload size and reserve capacity for it.
    ///
    /// Memory is the fast path; disk is a bounded overflow cushion. The
    /// check and the reservation are a single compare-and-swap per tier,
    /// so no interleaving of concurrent callers can push either counter
    /// over its cap.
    ///
    /// **This call is never side-effect-free.** A `InMemory`/`OnDisk`
    /// return has already reserved `candidate_size` bytes against the
    /// corresponding cap, and the reservation is only returned by a
    /// matching [`release`](Self::release) (normally driven by dropping
    /// the staged element). Use [`preview_tier`](Self::preview_tier) for a
    /// non-mutating check.
    pub fn classify_and_reserve(&self, candidate_size: u64) -> StoreStatus {
        if self.try_reserve(&self.in_memory, self.max_in_memory, candidate_size) {
            StoreStatus::InMemory
        } else if self.try_reserve(&self.on_disk, self.max_on_disk, candidate_size) {
            StoreStatus::OnDisk
        } else {
            StoreStatus::Full
        }
    }

    /// Non-mutating counterpart of [`classify_and_reserve`](Self::classify_and_reserve).
    ///
    /// Reports which tier *would* admit the candidate right now, without
    /// reserving anything. The answer is a racy snapshot: a concurrent
    /// reservation can invalidate it before the caller acts on it.
    pub fn preview_tier(&self, candidate_size: u64) -> StoreStatus {
        let in_memory = self.in_memory.load(Ordering::Acquire);
        let on_disk = self.on_disk.load(Ordering::Acquire);
        if Self::fits(in_memory, candidate_size, self.max_in_memory) {
            StoreStatus::InMemory
        } else if Self::fits(on_disk, candidate_size, self.max_on_disk) {
            StoreStatus::OnDisk
        } else {
            StoreStatus::Full
        }
    }

    /// Return a previously reserved size to its tier.
    ///
    /// Saturates at zero: an over-release is a caller bug, but wrapping
    /// the counter to the top of the range would permanently jam
    /// admission, so it is clamped and logged instead.
    pub fn release(&self, tier: Tier, size: u64) {
        let counter = match tier {
            Tier::Memory => &self.in_memory,
            Tier::Disk => &self.on_disk,
        };
        let result = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            Some(current.saturating_sub(size))
        });
        if let Ok(previous) = result {
            if previous < size {
                tracing::error!(tier = ?tier, reserved = previous, released = size,
                    "released more than was reserved, clamping counter to zero");
            }
        }
    }

    /// Bytes currently staged in memory.
    pub fn in_memory_bytes(&self) -> u64 {
        self.in_memory.load(Ordering::Acquire)
    }

    /// Bytes currently spilled to disk.
    pub fn on_disk_bytes(&self) -> u64 {
        self.on_disk.load(Ordering::Acquire)
    }

    fn try_reserve(&self, counter: &AtomicU64, cap: u64, size: u64) -> bool {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if Self::fits(current, size, cap) {
                    Some(current + size)
                } else {
                    None
                }
            })
            .is_ok()
    }

    // checked_add guards the degenerate size > u64::MAX - current case
    fn fits(current: u64, size: u64, cap: u64) -> bool {
        matches!(current.checked_add(size), Some(next) if next <= cap)
    }
}
