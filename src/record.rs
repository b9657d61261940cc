//! Timestamped records.
//!
//! Every store maps a [`Timestamp`] to exactly one value. Timestamps are UTC
//! instants with sub-microsecond resolution; collision perturbation works in
//! whole microseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key type shared by every backend.
pub type Timestamp = DateTime<Utc>;

/// An immutable `(timestamp, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<V> {
    pub timestamp: Timestamp,
    pub value: V,
}

impl<V> Record<V> {
    pub fn new(timestamp: Timestamp, value: V) -> Self {
        Self { timestamp, value }
    }

    pub fn into_parts(self) -> (Timestamp, V) {
        (self.timestamp, self.value)
    }
}

impl<V> From<(Timestamp, V)> for Record<V> {
    fn from((timestamp, value): (Timestamp, V)) -> Self {
        Self { timestamp, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_parts() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let record = Record::from((ts, "A"));
        assert_eq!(record, Record::new(ts, "A"));
        assert_eq!(record.into_parts(), (ts, "A"));
    }

    #[test]
    fn test_record_serde_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let record = Record::new(ts, String::from("A"));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["timestamp"], "2024-01-01T10:00:00Z");
        assert_eq!(json["value"], "A");

        let decoded: Record<String> = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, record);
    }
}
