//! Hash-indexed backend.
//!
//! Point operations are O(1). The map has no order, so range and duration
//! queries scan every entry and return values in unspecified order; callers
//! that need order must sort.

use super::TimeStore;
use crate::clock::{Clock, SystemClock};
use crate::collision::CollisionResolver;
use crate::error::{Error, Result};
use crate::filter::{RangeFilter, TimeRange};
use crate::record::{Record, Timestamp};
use itertools::{Itertools, MinMaxResult};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct HashStore<V> {
    data: HashMap<Timestamp, V>,
    clock: Arc<dyn Clock>,
    resolver: CollisionResolver,
}

impl<V> Default for HashStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashStore<V> {
    /// Creates an empty store on the system clock.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), CollisionResolver::default())
    }

    pub fn with_parts(clock: Arc<dyn Clock>, resolver: CollisionResolver) -> Self {
        Self {
            data: HashMap::new(),
            clock,
            resolver,
        }
    }
}

impl<V: Clone + Send> TimeStore for HashStore<V> {
    type Value = V;

    fn add(&mut self, ts: Timestamp, value: V) -> Result<()> {
        if self.data.contains_key(&ts) {
            return Err(Error::DuplicateKey(ts));
        }
        self.data.insert(ts, value);
        Ok(())
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
        RangeFilter::new(self.data.iter(), range)
            .map(|(_, v)| v.clone())
            .collect()
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
            .iter()
            .min_by_key(|(ts, _)| **ts)
            .map(|(ts, v)| Record::new(*ts, v.clone()))
    }

    fn get_latest(&self) -> Option<Record<V>> {
        self.data
            .iter()
            .max_by_key(|(ts, _)| **ts)
            .map(|(ts, v)| Record::new(*ts, v.clone()))
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        tracing::debug!(records = self.data.len(), "Clearing hash store");
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

    // Single pass instead of two scans.
    fn span(&self) -> Option<(Timestamp, Timestamp)> {
        match self.data.keys().minmax() {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(ts) => Some((*ts, *ts)),
            MinMaxResult::MinMax(min, max) => Some((*min, *max)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeDelta, TimeZone, Utc};
    use std::time::Duration;

    fn at(hour: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, min, 0).unwrap()
    }

    fn create_store() -> HashStore<&'static str> {
        let mut store = HashStore::new();
        store.add(at(10, 0), "A").expect("Add failed");
        store.add(at(11, 0), "B").expect("Add failed");
        store.add(at(12, 0), "C").expect("Add failed");
        store
    }

    #[test]
    fn test_add_and_get() {
        let store = create_store();
        assert_eq!(store.get_value_at(at(10, 0)), Some("A"));
        assert_eq!(store.get_value_at(at(11, 0)), Some("B"));
        assert_eq!(store.get_value_at(at(12, 0)), Some("C"));
        assert_eq!(store.get_value_at(at(13, 0)), None);
        assert_eq!(store.size(), 3);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut store = create_store();
        assert_eq!(store.add(at(11, 0), "X"), Err(Error::DuplicateKey(at(11, 0))));
        assert_eq!(store.get_value_at(at(11, 0)), Some("B"));
        assert_eq!(store.size(), 3);
    }

    #[test]
    fn test_get_range_unordered() {
        let store = create_store();
        let mut values = store.get_range(at(10, 0), at(11, 30)).unwrap();
        values.sort();
        assert_eq!(values, vec!["A", "B"]);

        assert_eq!(store.get_range(at(10, 30), at(11, 30)).unwrap(), vec!["B"]);
        assert!(store.get_range(at(13, 0), at(14, 0)).unwrap().is_empty());
    }

    #[test]
    fn test_get_range_inverted() {
        let store = create_store();
        assert!(matches!(
            store.get_range(at(12, 0), at(10, 0)),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_get_duration_uses_clock() {
        let clock = Arc::new(ManualClock::new(at(12, 30)));
        let mut store = HashStore::with_parts(clock.clone(), CollisionResolver::seeded(1));
        store.add(at(10, 0), "A").unwrap();
        store.add(at(12, 0), "C").unwrap();

        assert_eq!(store.get_duration(Duration::from_secs(3600)).unwrap(), vec!["C"]);

        clock.advance(TimeDelta::hours(2));
        assert!(store.get_duration(Duration::from_secs(3600)).unwrap().is_empty());
    }

    #[test]
    fn test_remove() {
        let mut store = create_store();
        assert!(store.remove(at(11, 0)));
        assert!(!store.remove(at(11, 0)));
        assert_eq!(store.get_value_at(at(11, 0)), None);
        assert_eq!(store.size(), 2);
    }

    #[test]
    fn test_earliest_latest_span() {
        let store = create_store();
        assert_eq!(store.get_earliest(), Some(Record::new(at(10, 0), "A")));
        assert_eq!(store.get_latest(), Some(Record::new(at(12, 0), "C")));
        assert_eq!(store.span(), Some((at(10, 0), at(12, 0))));

        let empty: HashStore<u8> = HashStore::new();
        assert_eq!(empty.span(), None);
        assert_eq!(empty.get_earliest(), None);
    }

    #[test]
    fn test_clear() {
        let mut store = create_store();
        store.clear();
        assert!(store.is_empty());
        assert!(store.get_all().is_empty());
        assert!(store.get_timestamps().is_empty());
    }
}
