//! Collision handling for `add_unique`.
//!
//! When the requested timestamp is taken, the resolver draws a single
//! pseudo-random offset in `[0, max_offset]` microseconds and shifts the key
//! by it. There is no second attempt: if the shifted key is also taken the
//! insert fails with [`Error::DuplicateKey`].

use crate::error::{Error, Result};
use crate::record::Timestamp;
use chrono::TimeDelta;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default upper bound for the perturbation offset (one second).
pub const DEFAULT_MAX_OFFSET: Duration = Duration::from_secs(1);

/// Source of perturbation offsets.
pub trait OffsetSource: Send + Debug {
    /// Returns a value in `[0, max]`.
    fn next_offset(&mut self, max: u64) -> u64;
}

/// splitmix64 generator. Deterministic for a given seed.
#[derive(Debug, Clone)]
pub struct SplitMix64(u64);

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Seeds from the system time, mixed with a process-wide counter so that
    /// stores created in the same instant still diverge.
    pub fn from_entropy() -> Self {
        static INSTANCES: AtomicU64 = AtomicU64::new(0);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let instance = INSTANCES.fetch_add(1, Ordering::Relaxed);
        Self(nanos ^ instance.rotate_left(32))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}

impl OffsetSource for SplitMix64 {
    fn next_offset(&mut self, max: u64) -> u64 {
        match max.checked_add(1) {
            Some(span) => self.next_u64() % span,
            None => self.next_u64(),
        }
    }
}

/// Per-store collision policy: the offset source plus the default bound
/// used by `add_unique_default`.
#[derive(Debug)]
pub struct CollisionResolver {
    source: Box<dyn OffsetSource>,
    default_max_offset: Duration,
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self::new(Box::new(SplitMix64::from_entropy()))
    }
}

impl CollisionResolver {
    pub fn new(source: Box<dyn OffsetSource>) -> Self {
        Self {
            source,
            default_max_offset: DEFAULT_MAX_OFFSET,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(Box::new(SplitMix64::new(seed)))
    }

    pub fn default_max_offset(&self) -> Duration {
        self.default_max_offset
    }

    pub fn set_default_max_offset(&mut self, max_offset: Duration) {
        self.default_max_offset = max_offset;
    }

    /// Shifts `ts` by one drawn offset in `[0, max_offset]` microseconds.
    pub fn perturb(&mut self, ts: Timestamp, max_offset: Duration) -> Result<Timestamp> {
        let max_micros = u64::try_from(max_offset.as_micros()).unwrap_or(u64::MAX);
        let offset = self.source.next_offset(max_micros);
        let micros = i64::try_from(offset)
            .map_err(|_| Error::invalid(format!("offset of {}µs is out of range", offset)))?;

        let perturbed = ts
            .checked_add_signed(TimeDelta::microseconds(micros))
            .ok_or_else(|| {
                Error::invalid(format!("perturbing {} by {}µs overflows", ts, micros))
            })?;

        tracing::debug!(
            requested = %ts,
            perturbed = %perturbed,
            offset_micros = offset,
            "Timestamp collision, perturbed key"
        );

        Ok(perturbed)
    }
}
