//! Thread-safe wrapper around [`Sketch`].
//!
//! `ConcurrentSketch` guards a single inner [`Sketch`] with a
//! [`parking_lot::RwLock`]: adds and merges take the writer side, `count`
//! and snapshotting take the reader side. `count_additions` is tracked in
//! an [`AtomicU64`] incremented before the writer lock is acquired, so the
//! counter stays monotonically correct even when many threads race to add
//! concurrently (a thread that loses the lock race still gets its
//! increment recorded immediately, rather than after the store mutation).
//!
//! Merging two wrapped sketches needs both writer locks at once. Rather
//! than always locking `self` then `other` (which deadlocks if another
//! thread merges the same pair in the opposite order), each wrapper is
//! assigned a process-wide monotonic id at construction and locks are
//! always acquired lowest-id-first.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::error::HllError;
use crate::hash::{default_hash, HashFn};
use crate::sketch::Sketch;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A readers-writer-locked [`Sketch`], safe to share across threads behind
/// an `Arc`.
pub struct ConcurrentSketch {
    id: u64,
    count_additions: AtomicU64,
    inner: RwLock<Option<Sketch>>,
}

impl ConcurrentSketch {
    pub fn new(b: u32, direct_counting: bool) -> Result<Self, HllError> {
        Self::with_hash(b, direct_counting, default_hash())
    }

    pub fn with_hash(b: u32, direct_counting: bool, hash: HashFn) -> Result<Self, HllError> {
        let sketch = Sketch::with_hash(b, direct_counting, hash)?;
        Ok(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            count_additions: AtomicU64::new(0),
            inner: RwLock::new(Some(sketch)),
        })
    }

    /// Adds `bytes`. Increments the atomic counter before taking the
    /// writer lock, then mutates the store under the lock. Returns
    /// `HllError::Disposed` if the sketch has been disposed.
    pub fn add(&self, bytes: &[u8]) -> Result<bool, HllError> {
        self.count_additions.fetch_add(1, Ordering::Relaxed);

        let mut guard = self.inner.write();
        let sketch = guard.as_mut().ok_or(HllError::Disposed)?;
        let h = sketch.hash_bytes(bytes);
        Ok(sketch.mutate_store(h))
    }

    /// Returns the current cardinality estimate. Readers may run
    /// concurrently with each other, only excluded by an in-flight `add`
    /// or `merge`.
    pub fn count(&self) -> Result<u64, HllError> {
        let guard = self.inner.read();
        let sketch = guard.as_ref().ok_or(HllError::Disposed)?;
        Ok(sketch.count())
    }

    /// The number of `add` calls observed so far, including calls that
    /// did not change the underlying store. Not part of the wire format
    /// and not reset by `merge`/`dispose`.
    pub fn count_additions(&self) -> u64 {
        self.count_additions.load(Ordering::Relaxed)
    }

    /// Merges `other` into `self` in place. Locks are acquired in
    /// ascending id order so that two threads merging the same pair of
    /// sketches in opposite directions cannot deadlock; merging a wrapper
    /// with itself takes the lock once.
    pub fn merge(&self, other: &Self) -> Result<(), HllError> {
        if self.id == other.id {
            // Union with self is idempotent; nothing to do, and taking the
            // write lock twice here would deadlock against parking_lot's
            // non-reentrant RwLock.
            let guard = self.inner.read();
            guard.as_ref().ok_or(HllError::Disposed)?;
            return Ok(());
        }

        let result = if self.id < other.id {
            let mut left = self.inner.write();
            let right = other.inner.read();
            Self::merge_locked(&mut left, &right)
        } else {
            let right = other.inner.read();
            let mut left = self.inner.write();
            Self::merge_locked(&mut left, &right)
        };
        result?;

        // The wrapper's own counter is authoritative, not the
        // inner Sketch's plain field, so it is combined here rather than
        // inside merge_locked.
        self.count_additions
            .fetch_add(other.count_additions.load(Ordering::Relaxed), Ordering::Relaxed);

        Ok(())
    }

    fn merge_locked(left: &mut Option<Sketch>, right: &Option<Sketch>) -> Result<(), HllError> {
        let left_sketch = left.as_mut().ok_or(HllError::Disposed)?;
        let right_sketch = right.as_ref().ok_or(HllError::Disposed)?;

        left_sketch
            .precision()
            .settings_check(&right_sketch.precision())?;

        left_sketch.merge_store(&right_sketch.store);

        Ok(())
    }

    /// Returns a detached, unlocked copy of the current sketch state.
    /// Useful for serialization or for building a merge result without
    /// holding the lock for the duration of the encode. The wrapper's
    /// atomic counter is the authoritative `count_additions`, not the
    /// inner sketch's own field (which `add`/`merge` never touch here), so
    /// it is stamped onto the snapshot before returning it.
    pub fn clone_snapshot(&self) -> Result<Sketch, HllError> {
        let guard = self.inner.read();
        let mut snapshot = guard.as_ref().cloned().ok_or(HllError::Disposed)?;
        snapshot.count_additions = self.count_additions();
        Ok(snapshot)
    }

    /// Releases the inner sketch, freeing its memory. Idempotent: disposing
    /// an already-disposed sketch is a no-op rather than an error, since
    /// disposal has no observable side effect to fail twice.
    pub fn dispose(&self) {
        let mut guard = self.inner.write();
        *guard = None;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.read().is_none()
    }
}

impl std::fmt::Debug for ConcurrentSketch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentSketch")
            .field("id", &self.id)
            .field("count_additions", &self.count_additions())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
