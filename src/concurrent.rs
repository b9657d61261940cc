//! Thread-safe wrapper around a single backend.
//!
//! [`ConcurrentStore`] owns one [`TimeStore`] behind a mutex and pairs that
//! mutex with a condition variable. Every operation holds the lock for its
//! full duration, so no caller ever observes the backend mid-mutation, and
//! every successful insert broadcasts to threads blocked in
//! [`wait_for_data`](ConcurrentStore::wait_for_data) or
//! [`wait_for_next`](ConcurrentStore::wait_for_next).
//!
//! # Notifications
//!
//! The guarded state carries a generation counter that is bumped, under the
//! lock, on each successful insert and on each manual
//! [`notify_data_available`](ConcurrentStore::notify_data_available). Waiters
//! record the generation they saw and sleep until it changes, which filters
//! out spurious condvar wakeups.
//!
//! # Lifetime
//!
//! Waiters borrow the store (typically through an `Arc`), so the wrapper
//! cannot be dropped while a thread is blocked on it.
//!
//! # Poisoning
//!
//! Backend operations either complete or leave the backend untouched, so a
//! panic on another thread never leaves partial state behind. A poisoned lock
//! is therefore recovered rather than propagated.

use crate::error::Result;
use crate::metrics::StoreMetrics;
use crate::record::{Record, Timestamp};
use crate::store::{HashStore, HeapStore, TimeStore, TreeStore};
use chrono::Weekday;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub type ConcurrentHashStore<V> = ConcurrentStore<HashStore<V>>;
pub type ConcurrentHeapStore<V> = ConcurrentStore<HeapStore<V>>;
pub type ConcurrentTreeStore<V> = ConcurrentStore<TreeStore<V>>;

#[derive(Debug)]
struct Guarded<S> {
    store: S,
    generation: u64,
}

impl<S> Guarded<S> {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

#[derive(Debug)]
pub struct ConcurrentStore<S> {
    inner: Mutex<Guarded<S>>,
    data_available: Condvar,
}

impl<S: TimeStore + Default> Default for ConcurrentStore<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: TimeStore> ConcurrentStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Mutex::new(Guarded {
                store,
                generation: 0,
            }),
            data_available: Condvar::new(),
        }
    }

    /// Consumes the wrapper, returning the backend.
    pub fn into_inner(self) -> S {
        self.inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .store
    }

    fn lock(&self) -> MutexGuard<'_, Guarded<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks new data under the held lock and wakes every waiter.
    fn signal(&self, guard: &mut MutexGuard<'_, Guarded<S>>) {
        guard.bump();
        self.data_available.notify_all();
    }

    pub fn add(&self, ts: Timestamp, value: S::Value) -> Result<()> {
        let mut guard = self.lock();
        guard.store.add(ts, value)?;
        self.signal(&mut guard);
        Ok(())
    }

    pub fn add_record(&self, record: Record<S::Value>) -> Result<()> {
        let mut guard = self.lock();
        guard.store.add_record(record)?;
        self.signal(&mut guard);
        Ok(())
    }

    pub fn add_unique(
        &self,
        ts: Timestamp,
        value: S::Value,
        max_offset: Duration,
    ) -> Result<Timestamp> {
        let mut guard = self.lock();
        let used = guard.store.add_unique(ts, value, max_offset)?;
        self.signal(&mut guard);
        Ok(used)
    }

    pub fn add_unique_default(&self, ts: Timestamp, value: S::Value) -> Result<Timestamp> {
        let mut guard = self.lock();
        let used = guard.store.add_unique_default(ts, value)?;
        self.signal(&mut guard);
        Ok(used)
    }

    pub fn get_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<S::Value>> {
        self.lock().store.get_range(start, end)
    }

    pub fn get_duration(&self, window: Duration) -> Result<Vec<S::Value>> {
        self.lock().store.get_duration(window)
    }

    pub fn get_latest_window(&self, window: Duration) -> Result<Vec<S::Value>> {
        self.lock().store.get_latest_window(window)
    }

    pub fn get_by_weekday(&self, weekday: Weekday) -> Vec<S::Value> {
        self.lock().store.get_by_weekday(weekday)
    }

    pub fn get_all(&self) -> Vec<S::Value> {
        self.lock().store.get_all()
    }

    pub fn get_timestamps(&self) -> Vec<Timestamp> {
        self.lock().store.get_timestamps()
    }

    pub fn get_records(&self) -> Vec<Record<S::Value>> {
        self.lock().store.get_records()
    }

    pub fn get_value_at(&self, ts: Timestamp) -> Option<S::Value> {
        self.lock().store.get_value_at(ts)
    }

    pub fn get_earliest(&self) -> Option<Record<S::Value>> {
        self.lock().store.get_earliest()
    }

    pub fn get_latest(&self) -> Option<Record<S::Value>> {
        self.lock().store.get_latest()
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.lock().store.contains(ts)
    }

    pub fn remove(&self, ts: Timestamp) -> bool {
        self.lock().store.remove(ts)
    }

    pub fn size(&self) -> usize {
        self.lock().store.size()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    pub fn clear(&self) {
        self.lock().store.clear()
    }

    /// Runs `f` with shared access to the backend, under the lock.
    pub fn with_store<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().store)
    }

    /// Runs `f` with exclusive access to the backend, under the lock.
    ///
    /// The closure may insert without changing the size (remove one record,
    /// add another), so waiters are notified after every call.
    pub fn with_store_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut guard = self.lock();
        let result = f(&mut guard.store);
        self.signal(&mut guard);
        result
    }

    /// Wakes every waiter without inserting anything.
    pub fn notify_data_available(&self) {
        let mut guard = self.lock();
        self.signal(&mut guard);
    }

    /// Blocks until the store holds data.
    ///
    /// Returns `true` immediately if the store is already non-empty, otherwise
    /// releases the lock and waits for the next insert notification. Returns
    /// `false` if `timeout` elapses first; `None` waits without limit.
    pub fn wait_for_data(&self, timeout: Option<Duration>) -> bool {
        let guard = self.lock();
        if !guard.store.is_empty() {
            return true;
        }
        let seen = guard.generation;
        self.wait_past(guard, seen, timeout)
    }

    /// Blocks until the next insert notification, ignoring data already
    /// present. Returns `false` if `timeout` elapses first.
    pub fn wait_for_next(&self, timeout: Option<Duration>) -> bool {
        let guard = self.lock();
        let seen = guard.generation;
        self.wait_past(guard, seen, timeout)
    }

    fn wait_past(
        &self,
        guard: MutexGuard<'_, Guarded<S>>,
        seen: u64,
        timeout: Option<Duration>,
    ) -> bool {
        match timeout {
            None => {
                let _guard = self
                    .data_available
                    .wait_while(guard, |g| g.generation == seen)
                    .unwrap_or_else(PoisonError::into_inner);
                true
            }
            Some(timeout) => {
                let (_guard, result) = self
                    .data_available
                    .wait_timeout_while(guard, timeout, |g| g.generation == seen)
                    .unwrap_or_else(PoisonError::into_inner);
                if result.timed_out() {
                    tracing::trace!(?timeout, "Timed out waiting for data");
                    return false;
                }
                true
            }
        }
    }

    /// Snapshot of the backend plus the notification count.
    pub fn metrics(&self) -> StoreMetrics {
        let guard = self.lock();
        let mut metrics = StoreMetrics::collect(&guard.store);
        metrics.notifications = guard.generation;
        metrics
    }
}
