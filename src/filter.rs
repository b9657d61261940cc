//! Inclusive time windows and the range-filter iterator adapter.
//!
//! [`TimeRange`] validates query bounds once so that every backend answers
//! `get_range`, `get_duration` and `get_latest_window` against the same
//! inclusive window. [`RangeFilter`] is used by backends that have no
//! intrinsic order and must scan.

use crate::error::{Error, Result};
use crate::record::Timestamp;
use chrono::TimeDelta;
use std::ops::RangeInclusive;
use std::time::Duration;

/// A validated `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: Timestamp,
    end: Timestamp,
}

impl TimeRange {
    /// Rejects `start > end`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if start > end {
            return Err(Error::invalid(format!(
                "range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The window `[end - window, end]`.
    pub fn trailing(end: Timestamp, window: Duration) -> Result<Self> {
        let delta = TimeDelta::from_std(window)
            .map_err(|_| Error::invalid(format!("window {:?} is out of range", window)))?;
        let start = end
            .checked_sub_signed(delta)
            .ok_or_else(|| Error::invalid(format!("window {:?} before {} underflows", window, end)))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Check if a key is within the window (both ends inclusive).
    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.start <= *ts && *ts <= self.end
    }

    pub fn bounds(&self) -> RangeInclusive<Timestamp> {
        self.start..=self.end
    }
}

/// Iterator adapter that keeps only entries whose key falls inside a
/// [`TimeRange`]. The input may be in any order, so it never stops early.
pub struct RangeFilter<I> {
    inner: I,
    range: TimeRange,
}

impl<I> RangeFilter<I> {
    pub fn new(inner: I, range: TimeRange) -> Self {
        Self { inner, range }
    }
}

impl<'a, I, V> Iterator for RangeFilter<I>
where
    I: Iterator<Item = (&'a Timestamp, &'a V)>,
    V: 'a,
{
    type Item = (&'a Timestamp, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.range;
        self.inner.by_ref().find(|(ts, _)| range.contains(ts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(hour: u32, min: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, min, 0).unwrap()
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(matches!(
            TimeRange::new(at(12, 0), at(10, 0)),
            Err(Error::InvalidArgument(_))
        ));
        // A single instant is a valid window.
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_ok());
    }

    #[test]
    fn test_range_inclusive() {
        let range = TimeRange::new(at(10, 0), at(11, 0)).unwrap();
        assert!(range.contains(&at(10, 0)));
        assert!(range.contains(&at(10, 30)));
        assert!(range.contains(&at(11, 0)));
        assert!(!range.contains(&at(9, 59)));
        assert!(!range.contains(&at(11, 1)));
    }

    #[test]
    fn test_trailing_window() {
        let range = TimeRange::trailing(at(12, 0), Duration::from_secs(3600)).unwrap();
        assert_eq!(range.start(), at(11, 0));
        assert_eq!(range.end(), at(12, 0));
    }

    #[test]
    fn test_trailing_window_underflow() {
        let result = TimeRange::trailing(Timestamp::MIN_UTC, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_range_filter_unordered_input() {
        let data = vec![
            (at(12, 0), "c"),
            (at(10, 0), "a"),
            (at(13, 0), "d"),
            (at(11, 0), "b"),
        ];
        let range = TimeRange::new(at(10, 30), at(12, 0)).unwrap();
        let mut values: Vec<_> = RangeFilter::new(data.iter().map(|(k, v)| (k, v)), range)
            .map(|(_, v)| *v)
            .collect();
        values.sort();
        assert_eq!(values, vec!["b", "c"]);
    }
}
