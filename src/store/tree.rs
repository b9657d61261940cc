//! Balanced-tree backend.
//!
//! A `BTreeMap` is always sorted, so no side cache is needed: inserts,
//! lookups and removals are O(log n) and range queries are a native in-order
//! walk costing O(log n + k). Results come back in ascending key order.

use super::TimeStore;
use crate::clock::{Clock, SystemClock};
use crate::collision::CollisionResolver;
use crate::error::{Error, Result};
use crate::filter::TimeRange;
use crate::record::{Record, Timestamp};
use std::collections::btree_map::{BTreeMap, Entry};
use std::sync::Arc;

#[derive(Debug)]
pub struct TreeStore<V> {
    data: BTreeMap<Timestamp, V>,
    clock: Arc<dyn Clock>,
    resolver: CollisionResolver,
}

impl<V> Default for TreeStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TreeStore<V> {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), CollisionResolver::default())
    }

    pub fn with_parts(clock: Arc<dyn Clock>, resolver: CollisionResolver) -> Self {
        Self {
            data: BTreeMap::new(),
            clock,
            resolver,
        }
    }

    /// Borrowing in-order iterator over the records in `range`.
    pub fn iter_range(&self, range: TimeRange) -> impl Iterator<Item = (&Timestamp, &V)> {
        self.data.range(range.bounds())
    }
}

impl<V: Clone + Send> TimeStore for TreeStore<V> {
    type Value = V;

    fn add(&mut self, ts: Timestamp, value: V) -> Result<()> {
        match self.data.entry(ts) {
            Entry::Occupied(_) => Err(Error::DuplicateKey(ts)),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    fn contains(&self, ts: Timestamp) -> bool {
        self.data.contains_key(&ts)
    }

    fn get_value_at(&self, ts: Timestamp) -> Option<V> {
        self.data.get(&ts).cloned()
    }

    fn remove(&mut self, ts: Timestamp) -> bool {
        self.data.remove(&ts).is_some()
    }

    fn scan(&self, range: TimeRange) -> Vec<V> {
        self.iter_range(range).map(|(_, v)| v.clone()).collect()
    }

    fn get_all(&self) -> Vec<V> {
        self.data.values().cloned().collect()
    }

    fn get_timestamps(&self) -> Vec<Timestamp> {
        self.data.keys().copied().collect()
    }

    fn get_records(&self) -> Vec<Record<V>> {
        self.data
            .iter()
            .map(|(ts, v)| Record::new(*ts, v.clone()))
            .collect()
    }

    fn get_earliest(&self) -> Option<Record<V>> {
        self.data
            .first_key_value()
            .map(|(ts, v)| Record::new(*ts, v.clone()))
    }

    fn get_latest(&self) -> Option<Record<V>> {
        self.data
            .last_key_value()
            .map(|(ts, v)| Record::new(*ts, v.clone()))
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        tracing::debug!(records = self.data.len(), "Clearing tree store");
        self.data.clear();
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
