//! Payload materialization: memory buffers and disk spill files.
//!
//! The [`StagingStore`] turns an admitted payload into a [`SendElement`].
//! Memory-tier payloads are wrapped directly; disk-tier payloads are
//! written fully and durably to a uniquely named file under the spool
//! directory. A failed spill write never leaks: the partially written
//! file and the disk reservation both travel with the element being
//! dropped.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::accounting::{SizeAccountant, StoreStatus};
use crate::element::SendElement;

/// Materializes admitted payloads under a spool directory.
pub struct StagingStore {
    spool_dir: PathBuf,
    sequence: AtomicU64,
}

impl StagingStore {
    pub fn new(spool_dir: PathBuf) -> Self {
        Self {
            spool_dir,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn spool_dir(&self) -> &PathBuf {
        &self.spool_dir
    }

    /// Materialize an admitted payload as a [`SendElement`].
    ///
    /// `status` must be the (reserving) classification the payload was
    /// admitted under; the returned element owns that reservation. On a
    /// spill-write error the partial file is removed and the reservation
    /// rolled back before the error is returned.
    ///
    /// # Panics
    ///
    /// Panics if called with [`StoreStatus::Full`] — a rejected payload
    /// has no reservation to wrap.
    pub async fn materialize(
        &self,
        payload: Vec<u8>,
        status: StoreStatus,
        accountant: &Arc<SizeAccountant>,
    ) -> io::Result<SendElement> {
        match status {
            StoreStatus::InMemory => Ok(SendElement::in_memory(payload, Arc::clone(accountant))),
            StoreStatus::OnDisk => self.spill(payload, accountant).await,
            StoreStatus::Full => unreachable!("cannot materialize a rejected payload"),
        }
    }

    async fn spill(&self, payload: Vec<u8>, accountant: &Arc<SizeAccountant>) -> io::Result<SendElement> {
        let path = self.next_spill_path();

        // The element owns the reservation and the (possibly partial) file
        // from this point on; dropping it on any error below rolls both
        // back, so callers never release manually.
        let element = SendElement::on_disk(path.clone(), payload.len() as u64, Arc::clone(accountant));

        tokio::fs::create_dir_all(&self.spool_dir).await?;
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&payload).await?;
        file.sync_all().await?;

        debug!(path = %path.display(), bytes = payload.len(), "payload spilled to disk");
        Ok(element)
    }

    fn next_spill_path(&self) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.spool_dir
            .join(format!("fwd-{}-{}.spool", std::process::id(), sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    fn accountant() -> Arc<SizeAccountant> {
        Arc::new(SizeAccountant::new(MB, MB))
    }

    #[tokio::test]
    async fn spill_writes_payload_to_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingStore::new(dir.path().to_path_buf());
        // No memory tier, so the reservations land on disk to match the
        // disk-tier materialization below.
        let accountant = Arc::new(SizeAccountant::new(0, MB));

        assert_eq!(accountant.classify_and_reserve(3), StoreStatus::OnDisk);
        assert_eq!(accountant.classify_and_reserve(3), StoreStatus::OnDisk);
        let first = staging
            .materialize(b"one".to_vec(), StoreStatus::OnDisk, &accountant)
            .await
            .unwrap();
        let second = staging
            .materialize(b"two".to_vec(), StoreStatus::OnDisk, &accountant)
            .await
            .unwrap();

        assert_ne!(first.spill_path(), second.spill_path());
        assert_eq!(first.payload().await.unwrap().as_ref(), b"one");
        assert_eq!(second.payload().await.unwrap().as_ref(), b"two");
        assert_eq!(accountant.on_disk_bytes(), 6);

        drop(first);
        drop(second);
        assert_eq!(accountant.on_disk_bytes(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn memory_materialization_touches_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingStore::new(dir.path().to_path_buf());
        let accountant = accountant();

        accountant.classify_and_reserve(5);
        let element = staging
            .materialize(b"bytes".to_vec(), StoreStatus::InMemory, &accountant)
            .await
            .unwrap();
        assert!(element.spill_path().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_spill_rolls_back_reservation() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the spool directory should be makes create_dir_all fail.
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, b"x").unwrap();

        let staging = StagingStore::new(blocked.clone());
        let accountant = Arc::new(SizeAccountant::new(0, MB));
        assert_eq!(accountant.classify_and_reserve(512), StoreStatus::OnDisk);

        let result = staging
            .materialize(vec![0u8; 512], StoreStatus::OnDisk, &accountant)
            .await;
        assert!(result.is_err());
        assert_eq!(accountant.on_disk_bytes(), 0);
        assert_eq!(std::fs::read(&blocked).unwrap(), b"x");
    }
}
