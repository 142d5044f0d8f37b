// Licensed under the AGPL-3.0 (https://www.gnu.org/licenses/agpl-3.0.html).

//! The staged, pending-dispatch unit of data.
//!
//! A [`SendElement`] owns its payload (an in-memory buffer or a spill file
//! on disk) together with the capacity reservation made when it was
//! admitted. Ownership transfers hand-to-hand — producer during staging,
//! queue while pending, worker during dispatch — so no per-element locking
//! is needed.
//!
//! Release is RAII: dropping the element returns the reservation to the
//! [`SizeAccountant`] and unlinks the spill file (best effort). This is
//! what makes release unconditional — a transport error, a worker panic,
//! or a shutdown sweep all end in the same drop. An element is never
//! resurrected after release.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::accounting::{SizeAccountant, Tier};

enum Payload {
    Memory(Vec<u8>),
    Disk(PathBuf),
}

/// One staged payload awaiting dispatch.
pub struct SendElement {
    size_bytes: u64,
    payload: Payload,
    accountant: Arc<SizeAccountant>,
}

impl SendElement {
    pub(crate) fn in_memory(buffer: Vec<u8>, accountant: Arc<SizeAccountant>) -> Self {
        Self {
            size_bytes: buffer.len() as u64,
            payload: Payload::Memory(buffer),
            accountant,
        }
    }

    /// Wrap a spill file. The element takes ownership of the file at
    /// `path` and of a `size_bytes` disk reservation; both are returned
    /// on drop, whether or not the file was ever fully written.
    pub(crate) fn on_disk(path: PathBuf, size_bytes: u64, accountant: Arc<SizeAccountant>) -> Self {
        Self {
            size_bytes,
            payload: Payload::Disk(path),
            accountant,
        }
    }

    /// Reserved payload size in bytes, fixed at admission.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Which tier this element was admitted into.
    pub fn tier(&self) -> Tier {
        match self.payload {
            Payload::Memory(_) => Tier::Memory,
            Payload::Disk(_) => Tier::Disk,
        }
    }

    /// The full payload bytes, read from disk for spilled elements.
    pub async fn payload(&self) -> io::Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Memory(buffer) => Ok(Cow::Borrowed(buffer)),
            Payload::Disk(path) => Ok(Cow::Owned(tokio::fs::read(path).await?)),
        }
    }

    /// Path of the backing spill file, for transports that stream from
    /// disk instead of buffering via [`payload`](Self::payload).
    pub fn spill_path(&self) -> Option<&Path> {
        match &self.payload {
            Payload::Memory(_) => None,
            Payload::Disk(path) => Some(path),
        }
    }
}

impl Drop for SendElement {
    fn drop(&mut self) {
        match &self.payload {
            Payload::Memory(_) => self.accountant.release(Tier::Memory, self.size_bytes),
            Payload::Disk(path) => {
                self.accountant.release(Tier::Disk, self.size_bytes);
                // Unlink failures are logged and swallowed; they must never
                // stall the dispatch loop or the shutdown sweep. NotFound is
                // expected when staging failed before the file was created.
                if let Err(e) = std::fs::remove_file(path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "failed to remove spill file");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for SendElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendElement")
            .field("size_bytes", &self.size_bytes)
            .field("tier", &self.tier())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::StoreStatus;

    fn accountant(max_memory: u64, max_disk: u64) -> Arc<SizeAccountant> {
        Arc::new(SizeAccountant::new(max_memory, max_disk))
    }

    #[tokio::test]
    async fn memory_element_exposes_payload() {
        let accountant = accountant(1024, 0);
        assert_eq!(accountant.classify_and_reserve(5), StoreStatus::InMemory);
        let element = SendElement::in_memory(b"hello".to_vec(), Arc::clone(&accountant));
        assert_eq!(element.tier(), Tier::Memory);
        assert_eq!(element.size_bytes(), 5);
        assert!(element.spill_path().is_none());
        assert_eq!(element.payload().await.unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn drop_releases_memory_reservation() {
        let accountant = accountant(1024, 0);
        accountant.classify_and_reserve(5);
        let element = SendElement::in_memory(b"hello".to_vec(), Arc::clone(&accountant));
        assert_eq!(accountant.in_memory_bytes(), 5);
        drop(element);
        assert_eq!(accountant.in_memory_bytes(), 0);
    }

    #[tokio::test]
    async fn drop_releases_disk_reservation_and_unlinks_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("element.spool");
        tokio::fs::write(&path, b"spilled").await.unwrap();

        let accountant = accountant(0, 1024);
        assert_eq!(accountant.classify_and_reserve(7), StoreStatus::OnDisk);
        let element = SendElement::on_disk(path.clone(), 7, Arc::clone(&accountant));
        assert_eq!(element.tier(), Tier::Disk);
        assert_eq!(element.payload().await.unwrap().as_ref(), b"spilled");
        assert_eq!(element.spill_path(), Some(path.as_path()));

        drop(element);
        assert_eq!(accountant.on_disk_bytes(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_without_backing_file_still_releases() {
        // A failed spill drops the element before its file ever existed;
        // the reservation must come back all the same.
        let accountant = accountant(0, 1024);
        assert_eq!(accountant.classify_and_reserve(7), StoreStatus::OnDisk);
        let element = SendElement::on_disk(
            PathBuf::from("/nonexistent/spool/fwd-0-0.spool"),
            7,
            Arc::clone(&accountant),
        );
        drop(element);
        assert_eq!(accountant.on_disk_bytes(), 0);
    }
}
