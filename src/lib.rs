//! In-memory stores ordered by timestamp.
//!
//! Three interchangeable backends implement [`TimeStore`]:
//!
//! - [`HashStore`]: hash map, O(1) point operations, unordered O(n) scans.
//! - [`HeapStore`]: binary min-heap plus a lazily rebuilt sorted projection.
//! - [`TreeStore`]: balanced ordered map, ordered O(log n + k) scans.
//!
//! Backends are single-threaded. Wrap one in a [`ConcurrentStore`] to share
//! it between threads and to block on new data with
//! [`ConcurrentStore::wait_for_data`].

pub mod clock;
pub mod collision;
pub mod concurrent;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collision::{CollisionResolver, OffsetSource, SplitMix64, DEFAULT_MAX_OFFSET};
pub use concurrent::{
    ConcurrentHashStore, ConcurrentHeapStore, ConcurrentStore, ConcurrentTreeStore,
};
pub use config::{Backend, StoreConfig};
pub use error::{Error, Result};
pub use filter::TimeRange;
pub use metrics::StoreMetrics;
pub use record::{Record, Timestamp};
pub use store::{HashStore, HeapStore, TimeStore, TreeStore};
