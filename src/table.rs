//! The table: a locked, ordered record container
//!
//! A [`Table`] owns deep copies of every record it holds, keeps them sorted
//! under the configured primary order, and routes each mutation to the
//! persistence group the record belongs to. One exclusive lock protects the
//! record sequence, the version counter and the delayed-writer handle; every
//! operation takes it for its full duration, including back-end I/O.
//!
//! The version counter is the sole ordering witness: each successful
//! mutation (insert, delete, update, re-sort) increments it exactly once,
//! and snapshots compare their captured version against it before touching
//! any index.
//!
//! Callbacks passed to [`filter`](Table::filter), [`first`](Table::first),
//! [`for_each`](Table::for_each) and the order relation run under the lock:
//! they must not block, perform I/O or call back into the table.

use crate::delay::{DelayedWriter, WriteGroupFn};
use crate::snapshot::Snapshot;
use parking_lot::Mutex;
use sheaf_core::{Grouping, Result, SheafError};
use sheaf_durability::Persistence;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub(crate) type LessFn<E> = Box<dyn Fn(&E, &E) -> bool + Send>;
pub(crate) type CopyFn<E> = Box<dyn Fn(&E) -> E + Send>;

/// Turn a strict-less relation into an `Ordering` for stable sorts.
pub(crate) fn ordering_from_less<E>(
    less: &(impl Fn(&E, &E) -> bool + ?Sized),
    a: &E,
    b: &E,
) -> Ordering {
    if less(a, b) {
        Ordering::Less
    } else if less(b, a) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

pub(crate) struct Core<E> {
    records: Vec<E>,
    version: u64,
    grouping: Box<dyn Grouping<E> + Send>,
    backend: Option<Box<dyn Persistence<E> + Send>>,
    order: Option<LessFn<E>>,
    deep_copy: CopyFn<E>,
    delayed: Option<DelayedWriter>,
}

impl<E> Core<E> {
    /// Persist the group `e` belongs to. `e` need not be in the sequence
    /// any more (it is not, right after a delete) — membership is decided
    /// by comparing the remaining records against it.
    fn persist_item(&self, e: &E) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        let name = self.grouping.group_name(e);
        if let Some(delayed) = &self.delayed {
            return delayed.mark(name);
        }
        let members: Vec<&E> = self
            .records
            .iter()
            .filter(|x| self.grouping.same_group(x, e))
            .collect();
        backend.save_group(&name, &members)
    }
}

/// Shared state behind a table and all of its snapshots.
pub(crate) struct Shared<E> {
    core: Mutex<Core<E>>,
}

impl<E> Shared<E> {
    pub(crate) fn copy_out(&self, index: usize, captured: u64, op: &'static str) -> Result<E> {
        let core = self.core.lock();
        if core.version != captured {
            return Err(SheafError::Stale { op });
        }
        // A matching version guarantees the captured index is still valid.
        Ok((core.deep_copy)(&core.records[index]))
    }

    pub(crate) fn remove_at(&self, index: usize, captured: u64) -> Result<()> {
        let mut core = self.core.lock();
        if core.version != captured {
            return Err(SheafError::Stale { op: "delete" });
        }
        let removed = core.records.remove(index);
        core.version += 1;
        core.persist_item(&removed)
    }

    pub(crate) fn replace_at(&self, index: usize, captured: u64, e: &E) -> Result<()> {
        let mut core = self.core.lock();
        if core.version != captured {
            return Err(SheafError::Stale { op: "update" });
        }
        if let Some(less) = &core.order {
            let fits_left = index == 0 || less(&core.records[index - 1], e);
            let fits_right = index + 1 == core.records.len() || less(e, &core.records[index + 1]);
            if !fits_left || !fits_right {
                return Err(SheafError::OrderViolation);
            }
        }
        let replacement = (core.deep_copy)(e);
        core.records[index] = replacement;
        core.version += 1;
        core.persist_item(&core.records[index])
    }

    pub(crate) fn order_indices(
        &self,
        indices: &[usize],
        less: &dyn Fn(&E, &E) -> bool,
        captured: u64,
    ) -> Result<Vec<usize>> {
        let core = self.core.lock();
        if core.version != captured {
            return Err(SheafError::Stale { op: "order" });
        }
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&i, &j| ordering_from_less(less, &core.records[i], &core.records[j]));
        Ok(sorted)
    }
}

/// Rewrite one group's file from the table's current contents. Runs on the
/// delayed writer's thread; re-acquires the table lock.
fn write_group<E>(shared: &Shared<E>, name: &str) -> Result<()> {
    let core = shared.core.lock();
    let Some(backend) = &core.backend else {
        return Ok(());
    };
    let members: Vec<&E> = core
        .records
        .iter()
        .filter(|e| core.grouping.group_name(e) == name)
        .collect();
    backend.save_group(name, &members)
}

/// An ordered, thread-safe, optionally file-backed record container.
///
/// Cloning a `Table` clones the handle, not the data: all clones and all
/// snapshots share one locked store. Records are deep-copied in on
/// [`insert`](Table::insert) and deep-copied out on every read, so callers
/// never hold references into the sequence.
pub struct Table<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for Table<E> {
    fn clone(&self) -> Self {
        Table {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Clone + 'static> Table<E> {
    /// Start building a table over the given grouping policy.
    pub fn builder(grouping: impl Grouping<E> + Send + 'static) -> TableBuilder<E> {
        TableBuilder {
            grouping: Box::new(grouping),
            backend: None,
            order: None,
            deep_copy: Box::new(E::clone),
        }
    }
}

impl<E> Table<E> {
    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.shared.core.lock().records.len()
    }

    /// True when the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep-copy `e` into the table at its sorted position (or append when
    /// no primary order is configured) and persist its group.
    pub fn insert(&self, e: &E) -> Result<()> {
        let mut core = self.shared.core.lock();
        let copy = (core.deep_copy)(e);
        let at = match &core.order {
            None => core.records.len(),
            // Leftmost slot whose record the new one is less than; lands
            // after any run of equal records and degenerates to an append
            // for in-order inserts.
            Some(less) => core.records.partition_point(|x| !less(&copy, x)),
        };
        core.records.insert(at, copy);
        core.version += 1;
        core.persist_item(&core.records[at])
    }

    /// Snapshot the indices of every record `accept` returns true for.
    ///
    /// `accept` sees borrowed records under the table lock; it must not
    /// block and cannot retain what it is shown.
    pub fn filter(&self, mut accept: impl FnMut(&E) -> bool) -> Snapshot<E> {
        let core = self.shared.core.lock();
        let indices = core
            .records
            .iter()
            .enumerate()
            .filter(|&(_, e)| accept(e))
            .map(|(i, _)| i)
            .collect();
        Snapshot::new(Arc::clone(&self.shared), indices, core.version)
    }

    /// Deep copy of the first record `accept` returns true for.
    pub fn first(&self, mut accept: impl FnMut(&E) -> bool) -> Option<E> {
        let core = self.shared.core.lock();
        core.records
            .iter()
            .find(|&e| accept(e))
            .map(|e| (core.deep_copy)(e))
    }

    /// Visit a deep copy of every record in table order; stop when
    /// `visit` returns false. Copies are intentional — the callback runs
    /// under the lock and must not see into the sequence.
    pub fn for_each(&self, mut visit: impl FnMut(E) -> bool) {
        let core = self.shared.core.lock();
        for e in &core.records {
            if !visit((core.deep_copy)(e)) {
                break;
            }
        }
    }

    /// Sort the table by `less` and keep it as the primary order. Counts
    /// as a mutation: outstanding snapshots become stale.
    pub fn set_primary_order(&self, less: impl Fn(&E, &E) -> bool + Send + 'static) {
        let mut core = self.shared.core.lock();
        let less: LessFn<E> = Box::new(less);
        core.records
            .sort_by(|a, b| ordering_from_less(&*less, a, b));
        core.order = Some(less);
        core.version += 1;
    }
}

impl<E: Send + 'static> Table<E> {
    /// Coalesce disk writes: while a non-zero delay is set, mutations only
    /// mark their group dirty, and a background task rewrites each dirty
    /// group once its deadline (last mark + delay) has passed. A zero
    /// delay reverts to immediate writes after draining anything pending.
    ///
    /// Tables with a write delay must be [`shutdown`](Table::shutdown)
    /// before the last handle is dropped, or trailing writes may be lost.
    pub fn set_write_delay(&self, delay: Duration) {
        // Detach under the lock, stop after releasing it: the flush thread
        // takes the same lock to rewrite groups.
        let previous = self.shared.core.lock().delayed.take();
        if let Some(writer) = previous {
            writer.stop();
        }
        if delay.is_zero() {
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let flush: WriteGroupFn = Arc::new(move |name: &str| match weak.upgrade() {
            Some(shared) => write_group(&shared, name),
            // The table is already gone; there is nothing left to flush.
            None => Ok(()),
        });
        self.shared.core.lock().delayed = Some(DelayedWriter::spawn(delay, flush));
    }

    /// Stop the delayed writer and synchronously flush every dirty group.
    /// Required before exit whenever a write delay was set; afterwards the
    /// table stays usable with immediate writes. Idempotent.
    pub fn shutdown(&self) {
        debug!("table shutdown");
        let writer = self.shared.core.lock().delayed.take();
        if let Some(writer) = writer {
            writer.stop();
        }
        debug!("table shutdown complete");
    }
}

/// Configuration for a [`Table`]; [`open`](TableBuilder::open) restores the
/// persisted records and yields the running table.
pub struct TableBuilder<E> {
    grouping: Box<dyn Grouping<E> + Send>,
    backend: Option<Box<dyn Persistence<E> + Send>>,
    order: Option<LessFn<E>>,
    deep_copy: CopyFn<E>,
}

impl<E> TableBuilder<E> {
    /// Persist record groups through `backend`. Without one the table is
    /// purely in-memory.
    pub fn backend(mut self, backend: impl Persistence<E> + Send + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    /// Keep records sorted under the strict-less relation `less`.
    pub fn ordered_by(mut self, less: impl Fn(&E, &E) -> bool + Send + 'static) -> Self {
        self.order = Some(Box::new(less));
        self
    }

    /// Replace the default `Clone`-based deep copy, for record types whose
    /// clones would share interior state.
    pub fn deep_copy_with(mut self, copy: impl Fn(&E) -> E + Send + 'static) -> Self {
        self.deep_copy = Box::new(copy);
        self
    }

    /// Restore all persisted records, sort them under the configured
    /// order, and return the table.
    pub fn open(self) -> Result<Table<E>> {
        let mut records = match &self.backend {
            Some(backend) => backend
                .load_all()
                .map_err(|e| SheafError::Restore(Box::new(e)))?,
            None => Vec::new(),
        };
        if let Some(less) = &self.order {
            records.sort_by(|a, b| ordering_from_less(&**less, a, b));
        }

        Ok(Table {
            shared: Arc::new(Shared {
                core: Mutex::new(Core {
                    records,
                    version: 0,
                    grouping: self.grouping,
                    backend: self.backend,
                    order: self.order,
                    deep_copy: self.deep_copy,
                    delayed: None,
                }),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_core::SingleGroup;

    fn plain_table() -> Table<i64> {
        Table::builder(SingleGroup::new("t")).open().unwrap()
    }

    fn sorted_table() -> Table<i64> {
        Table::builder(SingleGroup::new("t"))
            .ordered_by(|a, b| a < b)
            .open()
            .unwrap()
    }

    fn contents(table: &Table<i64>) -> Vec<i64> {
        let mut out = Vec::new();
        table.for_each(|e| {
            out.push(e);
            true
        });
        out
    }

    #[test]
    fn unordered_tables_append() {
        let table = plain_table();
        for v in [5, 1, 3] {
            table.insert(&v).unwrap();
        }
        assert_eq!(contents(&table), [5, 1, 3]);
    }

    #[test]
    fn ordered_tables_insert_in_sorted_position() {
        let table = sorted_table();
        for v in [5, 8, 7, 2, 1, 0, 4, 3, 9, 6] {
            table.insert(&v).unwrap();
        }
        assert_eq!(table.len(), 10);
        assert_eq!(contents(&table), [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn equal_records_keep_insertion_stability() {
        let table = Table::builder(SingleGroup::new("t"))
            .ordered_by(|a: &(i64, &str), b| a.0 < b.0)
            .open()
            .unwrap();
        table.insert(&(1, "first")).unwrap();
        table.insert(&(1, "second")).unwrap();
        table.insert(&(0, "zero")).unwrap();

        let mut seen = Vec::new();
        table.for_each(|e| {
            seen.push(e.1);
            true
        });
        assert_eq!(seen, ["zero", "first", "second"]);
    }

    #[test]
    fn filter_captures_matching_indices() {
        let table = sorted_table();
        for v in 0..10 {
            table.insert(&v).unwrap();
        }
        let evens = table.filter(|e| e % 2 == 0);
        assert_eq!(evens.len(), 5);
        let all = table.filter(|_| true);
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn first_returns_the_earliest_match() {
        let table = sorted_table();
        for v in [9, 3, 7, 1] {
            table.insert(&v).unwrap();
        }
        assert_eq!(table.first(|_| true), Some(1));
        assert_eq!(table.first(|e| *e > 5), Some(7));
        assert_eq!(table.first(|e| *e > 50), None);
    }

    #[test]
    fn for_each_stops_when_the_visitor_says_so() {
        let table = sorted_table();
        for v in 0..10 {
            table.insert(&v).unwrap();
        }
        let mut seen = 0;
        table.for_each(|_| {
            seen += 1;
            seen < 3
        });
        assert_eq!(seen, 3);
    }

    #[test]
    fn every_mutation_advances_the_version_once() {
        let table = sorted_table();
        table.insert(&1).unwrap();
        let v1 = table.filter(|_| true);

        table.insert(&2).unwrap();
        // One insert later the old snapshot is exactly one version behind.
        assert!(v1.get(0).unwrap_err().is_stale());
        let v2 = table.filter(|_| true);
        assert_eq!(v2.get(0).unwrap(), 1);
    }

    #[test]
    fn set_primary_order_sorts_and_invalidates() {
        let table = plain_table();
        for v in [3, 1, 2] {
            table.insert(&v).unwrap();
        }
        let stale = table.filter(|_| true);

        table.set_primary_order(|a, b| a < b);
        assert_eq!(contents(&table), [1, 2, 3]);
        assert!(stale.get(0).unwrap_err().is_stale());

        // The relation stays active for later inserts.
        table.insert(&0).unwrap();
        assert_eq!(contents(&table), [0, 1, 2, 3]);
    }

    #[test]
    fn deep_copy_override_is_used() {
        let table = Table::builder(SingleGroup::new("t"))
            .deep_copy_with(|e: &Vec<i64>| {
                let mut c = e.clone();
                c.push(-1);
                c
            })
            .open()
            .unwrap();
        table.insert(&vec![7]).unwrap();
        // One copy on the way in, one on the way out.
        assert_eq!(table.first(|_| true), Some(vec![7, -1, -1]));
    }

    #[test]
    fn tables_are_shared_across_threads() {
        let table = sorted_table();
        let mut handles = Vec::new();
        for t in 0..4 {
            let table = table.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    table.insert(&(t * 50 + i)).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(table.len(), 200);
        let seen = contents(&table);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }
}
