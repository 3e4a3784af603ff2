//! Per-document version number allocation.
//!
//! Each document has a durable counter holding the highest number ever
//! handed out. It is independent of which snapshots still exist, so deleting
//! a snapshot can never cause its number to be issued again.
//!
//! Writers of the same document are serialized by an in-process lock. The
//! snapshot key itself is inserted with insert-if-absent semantics, so a
//! writer in another process sharing the storage shows up as a collision and
//! the candidate number is advanced. A snapshot stored by a create that never
//! reached its counter commit is skipped with [`Reservation::skip`].

use crate::{SnapshotError, SnapshotResult};
use folio_storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Idle lock entries are swept once the table grows past this.
const LOCK_SWEEP_THRESHOLD: usize = 1024;

/// Durable counter state for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceState {
    /// Highest version number ever allocated.
    pub last_allocated: u64,
}

fn sequence_key(document_id: &str) -> [&str; 2] {
    ["sequences", document_id]
}

/// Allocates version numbers without gaps or duplicates.
pub struct SequenceAllocator<S> {
    storage: Arc<S>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    max_attempts: u32,
}

impl<S: Storage> SequenceAllocator<S> {
    pub fn new(storage: Arc<S>, max_attempts: u32) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Acquire the writer lock for a document.
    ///
    /// Different documents never contend.
    pub async fn lock(&self, document_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // The table only maps names to locks, so a poisoned guard is
            // still consistent.
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            if locks.len() > LOCK_SWEEP_THRESHOLD {
                locks.retain(|_, l| Arc::strong_count(l) > 1);
            }
            locks
                .entry(document_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Highest number ever allocated for the document (0 if none).
    pub async fn last_allocated(&self, document_id: &str) -> SnapshotResult<u64> {
        let state: Option<SequenceState> = self.storage.read(&sequence_key(document_id)).await?;
        Ok(state.unwrap_or_default().last_allocated)
    }

    /// The number the next snapshot of the document would receive.
    pub async fn next(&self, document_id: &str) -> SnapshotResult<u64> {
        Ok(self.last_allocated(document_id).await? + 1)
    }

    /// Lock the document and propose its next number.
    ///
    /// The lock is held until the reservation is dropped, so the caller
    /// persists the snapshot and commits the number as one unit.
    pub async fn reserve(&self, document_id: &str) -> SnapshotResult<Reservation<'_, S>> {
        let guard = self.lock(document_id).await;
        let number = self.next(document_id).await?;
        debug!(document_id, number, "Reserved version number");

        Ok(Reservation {
            storage: &self.storage,
            document_id: document_id.to_string(),
            number,
            attempts: 1,
            max_attempts: self.max_attempts,
            _guard: guard,
        })
    }

    /// Raise the counter to at least `number`.
    ///
    /// Callers must hold the document lock.
    pub(crate) async fn raise_to(&self, document_id: &str, number: u64) -> SnapshotResult<()> {
        raise(self.storage.as_ref(), document_id, number).await
    }
}

async fn raise<S: Storage>(storage: &S, document_id: &str, number: u64) -> SnapshotResult<()> {
    storage
        .update(&sequence_key(document_id), |state: &mut SequenceState| {
            state.last_allocated = state.last_allocated.max(number);
        })
        .await?;
    Ok(())
}

/// A proposed version number, held under the document's writer lock.
pub struct Reservation<'a, S> {
    storage: &'a Arc<S>,
    document_id: String,
    number: u64,
    attempts: u32,
    max_attempts: u32,
    _guard: OwnedMutexGuard<()>,
}

impl<S: Storage> Reservation<'_, S> {
    /// The currently proposed number.
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// The proposed number turned out to be taken; move to the next one.
    ///
    /// Fails with `Conflict` once the attempt budget is spent.
    pub fn collided(&mut self) -> SnapshotResult<u64> {
        warn!(
            document_id = %self.document_id,
            number = self.number,
            attempt = self.attempts,
            "Version number already taken"
        );
        if self.attempts >= self.max_attempts {
            return Err(SnapshotError::Conflict {
                document_id: self.document_id.clone(),
                attempts: self.attempts,
            });
        }
        self.attempts += 1;
        self.number += 1;
        Ok(self.number)
    }

    /// Move past a number already held by a stored snapshot whose create
    /// never committed the counter. Does not spend an attempt.
    pub fn skip(&mut self) -> u64 {
        debug!(
            document_id = %self.document_id,
            number = self.number,
            "Skipping number of uncommitted snapshot"
        );
        self.number += 1;
        self.number
    }

    /// Record the number as used. The lock is still held afterwards.
    pub async fn commit(&self) -> SnapshotResult<()> {
        raise(self.storage.as_ref(), &self.document_id, self.number).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_storage::MemoryStorage;
    use std::time::Duration;

    fn allocator(max_attempts: u32) -> SequenceAllocator<MemoryStorage> {
        SequenceAllocator::new(Arc::new(MemoryStorage::new()), max_attempts)
    }

    #[tokio::test]
    async fn test_first_number_is_one() {
        let allocator = allocator(3);
        assert_eq!(allocator.last_allocated("doc").await.unwrap(), 0);
        assert_eq!(allocator.next("doc").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_commit_advances_counter() {
        let allocator = allocator(3);
        {
            let reservation = allocator.reserve("doc").await.unwrap();
            assert_eq!(reservation.number(), 1);
            reservation.commit().await.unwrap();
        }
        let reservation = allocator.reserve("doc").await.unwrap();
        assert_eq!(reservation.number(), 2);
    }

    #[tokio::test]
    async fn test_uncommitted_reservation_is_reissued() {
        let allocator = allocator(3);
        drop(allocator.reserve("doc").await.unwrap());
        assert_eq!(allocator.reserve("doc").await.unwrap().number(), 1);
    }

    #[tokio::test]
    async fn test_collisions_exhaust_into_conflict() {
        let allocator = allocator(2);
        let mut reservation = allocator.reserve("doc").await.unwrap();
        assert_eq!(reservation.collided().unwrap(), 2);
        let err = reservation.collided().unwrap_err();
        assert!(matches!(err, SnapshotError::Conflict { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_skip_does_not_spend_attempts() {
        let allocator = allocator(1);
        let mut reservation = allocator.reserve("doc").await.unwrap();
        assert_eq!(reservation.skip(), 2);
        assert_eq!(reservation.skip(), 3);
        assert!(reservation.collided().is_err());
        assert_eq!(reservation.number(), 3);
    }

    #[tokio::test]
    async fn test_raise_never_lowers() {
        let allocator = allocator(3);
        allocator.raise_to("doc", 5).await.unwrap();
        allocator.raise_to("doc", 2).await.unwrap();
        assert_eq!(allocator.last_allocated("doc").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_lock_serializes_same_document() {
        let allocator = Arc::new(allocator(3));
        let guard = allocator.lock("doc").await;

        let contender = {
            let allocator = allocator.clone();
            tokio::spawn(async move {
                let _guard = allocator.lock("doc").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different document is not blocked
        let other = tokio::time::timeout(Duration::from_secs(1), allocator.lock("other")).await;
        assert!(other.is_ok());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }
}
