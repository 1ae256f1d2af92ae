//! Snapshot views
//!
//! A [`Snapshot`] is a set of table indices captured at one version. As
//! long as the table still carries that version the view is coherent:
//! records can be copied out, iterated, deleted or updated through it. The
//! moment the table moves on — any insert, any other view's mutation, a
//! re-sort — every operation on the snapshot fails with the staleness
//! error instead of ever serving stale data.
//!
//! The one deliberate exception: a snapshot's *own* successful `delete` or
//! `update` advances its captured version in lock-step with the table, so
//! the iterate-and-mutate pattern (`while snap.len() > 0 { snap.delete(0)?;
//! }`) works without re-querying.

use crate::table::Shared;
use sheaf_core::{Result, SheafError};
use std::sync::Arc;

/// An indexed view over a subset of a table, pinned to the version it was
/// captured at.
///
/// Snapshots are not internally synchronized; share one across threads
/// only behind external synchronization. The underlying table is kept
/// alive by the snapshot's shared handle.
pub struct Snapshot<E> {
    shared: Arc<Shared<E>>,
    indices: Vec<usize>,
    version: u64,
}

impl<E> std::fmt::Debug for Snapshot<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("indices", &self.indices)
            .field("version", &self.version)
            .finish()
    }
}

impl<E> Snapshot<E> {
    pub(crate) fn new(shared: Arc<Shared<E>>, indices: Vec<usize>, version: u64) -> Self {
        Snapshot {
            shared,
            indices,
            version,
        }
    }

    /// Number of records in the view.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when the view matched nothing (or everything was deleted
    /// through it).
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Deep copy of the `n`-th record in the view.
    pub fn get(&self, n: usize) -> Result<E> {
        let &index = self
            .indices
            .get(n)
            .ok_or(SheafError::OutOfRange { op: "get" })?;
        self.shared.copy_out(index, self.version, "get")
    }

    /// Iterate deep copies of the view's records. Iteration ends after the
    /// first error (a concurrent mutation turns every remaining step into
    /// the staleness error, so one is enough).
    pub fn iter(&self) -> SnapshotIter<'_, E> {
        SnapshotIter {
            snapshot: self,
            next: 0,
            failed: false,
        }
    }

    /// Delete the `n`-th record of the view from the table.
    ///
    /// On success the view stays usable: its captured version follows the
    /// table's, the deleted entry leaves the index array, and indices
    /// behind it shift down to match the table's compaction.
    pub fn delete(&mut self, n: usize) -> Result<()> {
        let &index = self
            .indices
            .get(n)
            .ok_or(SheafError::OutOfRange { op: "delete" })?;
        self.shared.remove_at(index, self.version)?;
        self.version += 1;
        self.indices.remove(n);
        for i in &mut self.indices {
            if *i > index {
                *i -= 1;
            }
        }
        Ok(())
    }

    /// Replace the `n`-th record of the view with a deep copy of `e`.
    ///
    /// With a primary order configured the replacement must still fit
    /// strictly between its neighbors, otherwise the update is rejected
    /// with the order-violation error and nothing changes. On success the
    /// captured version follows the table's, like
    /// [`delete`](Snapshot::delete).
    pub fn update(&mut self, n: usize, e: &E) -> Result<()> {
        let &index = self
            .indices
            .get(n)
            .ok_or(SheafError::OutOfRange { op: "update" })?;
        self.shared.replace_at(index, self.version, e)?;
        self.version += 1;
        Ok(())
    }

    /// A new view over the same records, stably re-sorted under `less`.
    /// Shares the captured version, so both views stay valid together.
    pub fn order(&self, less: impl Fn(&E, &E) -> bool) -> Result<Snapshot<E>> {
        let sorted = self
            .shared
            .order_indices(&self.indices, &less, self.version)?;
        Ok(Snapshot {
            shared: Arc::clone(&self.shared),
            indices: sorted,
            version: self.version,
        })
    }
}

/// Iterator over a snapshot's records; see [`Snapshot::iter`].
pub struct SnapshotIter<'a, E> {
    snapshot: &'a Snapshot<E>,
    next: usize,
    failed: bool,
}

impl<E> Iterator for SnapshotIter<'_, E> {
    type Item = Result<E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.snapshot.len() {
            return None;
        }
        let item = self.snapshot.get(self.next);
        self.next += 1;
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = self.snapshot.len() - self.next;
        (0, Some(remaining))
    }
}

impl<'a, E> IntoIterator for &'a Snapshot<E> {
    type Item = Result<E>;
    type IntoIter = SnapshotIter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
