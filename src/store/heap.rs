//! Heap-indexed backend.
//!
//! Records live in a binary min-heap keyed by timestamp, giving O(log n)
//! inserts and O(1) access to the earliest record. A heap cannot answer range
//! queries by itself, so the store also keeps a sorted projection of the heap
//! contents:
//!
//! - every mutation marks the projection stale;
//! - the first query after a mutation rebuilds it with one sort;
//! - queries then binary-search the projection for their window.
//!
//! Bursts of inserts followed by bursts of queries pay for one sort. Strictly
//! alternating insert/query pairs re-sort on every query.
//!
//! Duplicate detection consults the full key set, not just the heap root.

use super::TimeStore;
use crate::clock::{Clock, SystemClock};
use crate::collision::CollisionResolver;
use crate::error::{Error, Result};
use crate::filter::TimeRange;
use crate::record::{Record, Timestamp};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

/// Heap slot ordered by timestamp only, reversed so that `BinaryHeap` pops
/// the earliest record first.
#[derive(Debug, Clone)]
struct HeapEntry<V> {
    timestamp: Timestamp,
    value: V,
}

impl<V> PartialEq for HeapEntry<V> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl<V> Eq for HeapEntry<V> {}

impl<V> PartialOrd for HeapEntry<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for HeapEntry<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp).reverse()
    }
}

/// Ascending copy of the heap contents, valid while `stale` is false.
#[derive(Debug)]
struct Projection<V> {
    records: Vec<Record<V>>,
    stale: bool,
    rebuilds: u64,
}

impl<V> Default for Projection<V> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            stale: false,
            rebuilds: 0,
        }
    }
}

#[derive(Debug)]
pub struct HeapStore<V> {
    heap: BinaryHeap<HeapEntry<V>>,
    keys: HashSet<Timestamp>,
    projection: RefCell<Projection<V>>,
    clock: Arc<dyn Clock>,
    resolver: CollisionResolver,
}

impl<V> Default for HeapStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HeapStore<V> {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), CollisionResolver::default())
    }

    pub fn with_parts(clock: Arc<dyn Clock>, resolver: CollisionResolver) -> Self {
        Self {
            heap: BinaryHeap::new(),
            keys: HashSet::new(),
            projection: RefCell::new(Projection::default()),
            clock,
            resolver,
        }
    }

    /// Whether the next query will rebuild the sorted projection.
    pub fn is_projection_stale(&self) -> bool {
        self.projection.borrow().stale
    }

    /// How many times the sorted projection has been rebuilt.
    pub fn projection_rebuilds(&self) -> u64 {
        self.projection.borrow().rebuilds
    }

    fn invalidate(&mut self) {
        self.projection.get_mut().stale = true;
    }
}

impl<V: Clone> HeapStore<V> {
    /// Runs `f` against the sorted projection, rebuilding it first if a
    /// mutation happened since the last query.
    fn with_projection<R>(&self, f: impl FnOnce(&[Record<V>]) -> R) -> R {
        let mut projection = self.projection.borrow_mut();
        if projection.stale {
            let mut records: Vec<Record<V>> = self
                .heap
                .iter()
                .map(|e| Record::new(e.timestamp, e.value.clone()))
                .collect();
            // Keys are unique, so an unstable sort is exact.
            records.sort_unstable_by_key(|r| r.timestamp);

            projection.records = records;
            projection.stale = false;
            projection.rebuilds += 1;
            tracing::trace!(
                records = projection.records.len(),
                rebuilds = projection.rebuilds,
                "Rebuilt sorted projection"
            );
        }
        f(&projection.records)
    }
}

impl<V: Clone + Send> TimeStore for HeapStore<V> {
    type Value = V;

    fn add(&mut self, ts: Timestamp, value: V) -> Result<()> {
        if !self.keys.insert(ts) {
            return Err(Error::DuplicateKey(ts));
        }
        self.heap.push(HeapEntry {
            timestamp: ts,
            value,
        });
        self.invalidate();
        Ok(())
    }

    fn contains(&self, ts: Timestamp) -> bool {
        self.keys.contains(&ts)
    }

    fn get_value_at(&self, ts: Timestamp) -> Option<V> {
        if !self.keys.contains(&ts) {
            return None;
        }
        self.with_projection(|records| {
            records
                .binary_search_by_key(&ts, |r| r.timestamp)
                .ok()
                .map(|i| records[i].value.clone())
        })
    }

    fn remove(&mut self, ts: Timestamp) -> bool {
        if !self.keys.remove(&ts) {
            return false;
        }

        // Locate, splice out, then re-heapify the remainder.
        let mut entries = std::mem::take(&mut self.heap).into_vec();
        if let Some(pos) = entries.iter().position(|e| e.timestamp == ts) {
            entries.remove(pos);
        }
        self.heap = BinaryHeap::from(entries);
        self.invalidate();
        true
    }

    fn scan(&self, range: TimeRange) -> Vec<V> {
        self.with_projection(|records| {
            let lo = records.partition_point(|r| r.timestamp < range.start());
            let hi = records.partition_point(|r| r.timestamp <= range.end());
            records[lo..hi].iter().map(|r| r.value.clone()).collect()
        })
    }

    fn get_all(&self) -> Vec<V> {
        self.with_projection(|records| records.iter().map(|r| r.value.clone()).collect())
    }

    fn get_timestamps(&self) -> Vec<Timestamp> {
        self.with_projection(|records| records.iter().map(|r| r.timestamp).collect())
    }

    fn get_records(&self) -> Vec<Record<V>> {
        self.with_projection(|records| records.to_vec())
    }

    fn get_earliest(&self) -> Option<Record<V>> {
        self.heap
            .peek()
            .map(|e| Record::new(e.timestamp, e.value.clone()))
    }

    fn get_latest(&self) -> Option<Record<V>> {
        self.with_projection(|records| records.last().cloned())
    }

    fn size(&self) -> usize {
        self.heap.len()
    }

    fn clear(&mut self) {
        tracing::debug!(records = self.heap.len(), "Clearing heap store");
        self.heap.clear();
        self.keys.clear();
        let projection = self.projection.get_mut();
        projection.records.clear();
        projection.stale = false;
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    fn resolver(&self) -> &CollisionResolver {
        &self.resolver
    }

    fn resolver_mut(&mut self) -> &mut CollisionResolver {
        &mut self.resolver
    }
}
