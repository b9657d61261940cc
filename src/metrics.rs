use crate::record::Timestamp;
use crate::store::TimeStore;
use chrono::TimeDelta;

/// Point-in-time view of a store's shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub records: usize,
    pub earliest: Option<Timestamp>,
    pub latest: Option<Timestamp>,
    /// Insert notifications broadcast so far (wrapper only, zero otherwise).
    pub notifications: u64,
}

impl StoreMetrics {
    /// Collect metrics from a backend
    pub fn collect<S: TimeStore + ?Sized>(store: &S) -> Self {
        let (earliest, latest) = match store.span() {
            Some((earliest, latest)) => (Some(earliest), Some(latest)),
            None => (None, None),
        };
        Self {
            records: store.size(),
            earliest,
            latest,
            notifications: 0,
        }
    }

    /// Distance between the earliest and latest key.
    pub fn span(&self) -> Option<TimeDelta> {
        Some(self.latest? - self.earliest?)
    }

    /// Log the metrics at info level
    pub fn log(&self) {
        tracing::info!(
            records = self.records,
            earliest = ?self.earliest,
            latest = ?self.latest,
            span_secs = self.span().map(|s| s.num_seconds()),
            notifications = self.notifications,
            "Store metrics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HashStore;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_collect_metrics() {
        let mut store = HashStore::new();
        let empty = StoreMetrics::collect(&store);
        assert_eq!(empty, StoreMetrics::default());
        assert_eq!(empty.span(), None);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        store.add(start, 1).unwrap();
        store.add(start + TimeDelta::hours(2), 2).unwrap();

        let metrics = StoreMetrics::collect(&store);
        assert_eq!(metrics.records, 2);
        assert_eq!(metrics.earliest, Some(start));
        assert_eq!(metrics.span(), Some(TimeDelta::hours(2)));
        metrics.log();
    }
}
