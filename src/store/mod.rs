//! Backend contract shared by the hash, heap and tree stores.
//!
//! A backend only has to provide the storage primitives (insert, lookup,
//! remove, windowed scan, snapshots). Collision handling, duration windows,
//! weekday filtering and record-level helpers are provided on top of them,
//! so every backend answers those the same way.
//!
//! Backends are single-threaded: they are `Send` so they can be moved into a
//! [`ConcurrentStore`](crate::ConcurrentStore), but they carry no internal
//! synchronization.

pub mod hash;
pub mod heap;
pub mod tree;

pub use hash::HashStore;
pub use heap::HeapStore;
pub use tree::TreeStore;

use crate::clock::Clock;
use crate::collision::CollisionResolver;
use crate::error::Result;
use crate::filter::TimeRange;
use crate::record::{Record, Timestamp};
use chrono::{Datelike, Weekday};
use std::time::Duration;

pub trait TimeStore: Send {
    type Value: Clone;

    /// Inserts a record. Fails with `DuplicateKey` if `ts` is already present,
    /// leaving the store unchanged.
    fn add(&mut self, ts: Timestamp, value: Self::Value) -> Result<()>;

    fn contains(&self, ts: Timestamp) -> bool;

    /// Retrieves the value stored at `ts`.
    fn get_value_at(&self, ts: Timestamp) -> Option<Self::Value>;

    /// Removes the record at `ts`, returning whether it existed.
    fn remove(&mut self, ts: Timestamp) -> bool;

    /// Values whose key lies inside `range`. Order is backend specific.
    fn scan(&self, range: TimeRange) -> Vec<Self::Value>;

    fn get_all(&self) -> Vec<Self::Value>;

    fn get_timestamps(&self) -> Vec<Timestamp>;

    fn get_records(&self) -> Vec<Record<Self::Value>>;

    fn get_earliest(&self) -> Option<Record<Self::Value>>;

    fn get_latest(&self) -> Option<Record<Self::Value>>;

    fn size(&self) -> usize;

    fn clear(&mut self);

    /// Time source for [`get_duration`](TimeStore::get_duration).
    fn clock(&self) -> &dyn Clock;

    fn resolver(&self) -> &CollisionResolver;

    fn resolver_mut(&mut self) -> &mut CollisionResolver;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn add_record(&mut self, record: Record<Self::Value>) -> Result<()> {
        let (ts, value) = record.into_parts();
        self.add(ts, value)
    }

    /// Inserts at `ts` if it is free, otherwise at `ts` shifted by one random
    /// offset in `[0, max_offset]`. Returns the key actually used.
    ///
    /// The shifted key is not retried: if it is also occupied the call fails
    /// with `DuplicateKey` for the shifted key and nothing is inserted. A zero
    /// `max_offset` always fails this way on an occupied key, and a bound of a
    /// few microseconds fails often, since a drawn offset of 0 lands back on
    /// `ts`.
    fn add_unique(
        &mut self,
        ts: Timestamp,
        value: Self::Value,
        max_offset: Duration,
    ) -> Result<Timestamp> {
        if !self.contains(ts) {
            self.add(ts, value)?;
            return Ok(ts);
        }

        let perturbed = self.resolver_mut().perturb(ts, max_offset)?;
        self.add(perturbed, value).map_err(|e| {
            tracing::warn!(
                requested = %ts,
                perturbed = %perturbed,
                "Perturbed timestamp also collides"
            );
            e
        })?;
        Ok(perturbed)
    }

    /// [`add_unique`](TimeStore::add_unique) with the store's configured bound.
    fn add_unique_default(&mut self, ts: Timestamp, value: Self::Value) -> Result<Timestamp> {
        let max_offset = self.resolver().default_max_offset();
        self.add_unique(ts, value, max_offset)
    }

    /// Values with `start <= key <= end`. Rejects `start > end`.
    fn get_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<Self::Value>> {
        Ok(self.scan(TimeRange::new(start, end)?))
    }

    /// Values from the last `window`, measured back from the clock's `now`.
    fn get_duration(&self, window: Duration) -> Result<Vec<Self::Value>> {
        let now = self.clock().now();
        Ok(self.scan(TimeRange::trailing(now, window)?))
    }

    /// Values from the last `window`, measured back from the newest key.
    fn get_latest_window(&self, window: Duration) -> Result<Vec<Self::Value>> {
        match self.get_latest() {
            Some(latest) => Ok(self.scan(TimeRange::trailing(latest.timestamp, window)?)),
            None => Ok(Vec::new()),
        }
    }

    /// Values whose UTC timestamp falls on `weekday`.
    fn get_by_weekday(&self, weekday: Weekday) -> Vec<Self::Value> {
        self.get_records()
            .into_iter()
            .filter(|r| r.timestamp.weekday() == weekday)
            .map(|r| r.value)
            .collect()
    }

    /// Smallest and largest key.
    fn span(&self) -> Option<(Timestamp, Timestamp)> {
        let earliest = self.get_earliest()?;
        let latest = self.get_latest()?;
        Some((earliest.timestamp, latest.timestamp))
    }
}

impl<S: TimeStore + ?Sized> TimeStore for Box<S> {
    type Value = S::Value;

    fn add(&mut self, ts: Timestamp, value: Self::Value) -> Result<()> {
        (**self).add(ts, value)
    }

    fn contains(&self, ts: Timestamp) -> bool {
        (**self).contains(ts)
    }

    fn get_value_at(&self, ts: Timestamp) -> Option<Self::Value> {
        (**self).get_value_at(ts)
    }

    fn remove(&mut self, ts: Timestamp) -> bool {
        (**self).remove(ts)
    }

    fn scan(&self, range: TimeRange) -> Vec<Self::Value> {
        (**self).scan(range)
    }

    fn get_all(&self) -> Vec<Self::Value> {
        (**self).get_all()
    }

    fn get_timestamps(&self) -> Vec<Timestamp> {
        (**self).get_timestamps()
    }

    fn get_records(&self) -> Vec<Record<Self::Value>> {
        (**self).get_records()
    }

    fn get_earliest(&self) -> Option<Record<Self::Value>> {
        (**self).get_earliest()
    }

    fn get_latest(&self) -> Option<Record<Self::Value>> {
        (**self).get_latest()
    }

    fn size(&self) -> usize {
        (**self).size()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn clock(&self) -> &dyn Clock {
        (**self).clock()
    }

    fn resolver(&self) -> &CollisionResolver {
        (**self).resolver()
    }

    fn resolver_mut(&mut self) -> &mut CollisionResolver {
        (**self).resolver_mut()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn span(&self) -> Option<(Timestamp, Timestamp)> {
        (**self).span()
    }
}
