use crate::clock::{Clock, SystemClock};
use crate::collision::{CollisionResolver, DEFAULT_MAX_OFFSET};
use crate::concurrent::ConcurrentStore;
use crate::store::{HashStore, HeapStore, TimeStore, TreeStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Backend strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// O(1) point operations, O(n) unordered range scans
    Hash,
    /// O(log n) inserts, lazily sorted projection for range queries
    Heap,
    /// O(log n) everything, ordered range scans
    #[default]
    Tree,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Hash => write!(f, "hash"),
            Backend::Heap => write!(f, "heap"),
            Backend::Tree => write!(f, "tree"),
        }
    }
}

/// Configuration for building a store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Storage strategy (default: tree)
    pub backend: Backend,

    /// Upper bound for collision perturbation used by `add_unique_default`
    /// (default: 1s)
    pub max_offset: Duration,

    /// Seed for the perturbation PRNG; seeded from the system time if unset
    pub seed: Option<u64>,

    /// Time source for duration queries (default: system clock)
    #[serde(skip)]
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            max_offset: DEFAULT_MAX_OFFSET,
            seed: None,
            clock: None,
        }
    }
}

impl StoreConfig {
    /// Create a new config for the given backend
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Default::default()
        }
    }

    /// Set the default perturbation bound
    pub fn max_offset(mut self, max_offset: Duration) -> Self {
        self.max_offset = max_offset;
        self
    }

    /// Use a deterministic perturbation PRNG
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Inject a time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn resolver(&self) -> CollisionResolver {
        let mut resolver = match self.seed {
            Some(seed) => CollisionResolver::seeded(seed),
            None => CollisionResolver::default(),
        };
        resolver.set_default_max_offset(self.max_offset);
        resolver
    }

    /// Build a single-threaded store
    pub fn build<V>(&self) -> Box<dyn TimeStore<Value = V>>
    where
        V: Clone + Send + 'static,
    {
        let clock = self
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(SystemClock));
        let resolver = self.resolver();

        tracing::debug!(
            backend = %self.backend,
            max_offset = ?self.max_offset,
            seeded = self.seed.is_some(),
            "Building store"
        );

        match self.backend {
            Backend::Hash => Box::new(HashStore::with_parts(clock, resolver)),
            Backend::Heap => Box::new(HeapStore::with_parts(clock, resolver)),
            Backend::Tree => Box::new(TreeStore::with_parts(clock, resolver)),
        }
    }

    /// Build a store wrapped for shared use across threads
    pub fn build_concurrent<V>(&self) -> ConcurrentStore<Box<dyn TimeStore<Value = V>>>
    where
        V: Clone + Send + 'static,
    {
        ConcurrentStore::new(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeDelta, TimeZone, Utc};

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.backend, Backend::Tree);
        assert_eq!(config.max_offset, Duration::from_secs(1));
        assert!(config.seed.is_none());
        assert!(config.clock.is_none());
    }

    #[test]
    fn test_config_builder() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let config = StoreConfig::new(Backend::Heap)
            .max_offset(Duration::from_millis(10))
            .seed(42)
            .with_clock(Arc::new(ManualClock::new(now)));

        assert_eq!(config.backend, Backend::Heap);
        assert_eq!(config.max_offset, Duration::from_millis(10));
        assert_eq!(config.seed, Some(42));

        let mut store = config.build::<u32>();
        assert_eq!(store.resolver().default_max_offset(), Duration::from_millis(10));
        assert_eq!(store.clock().now(), now);

        store.add(now - TimeDelta::seconds(30), 1).unwrap();
        assert_eq!(store.get_duration(Duration::from_secs(60)).unwrap(), vec![1]);
    }

    #[test]
    fn test_seeded_builds_are_deterministic() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let perturbed: Vec<_> = (0..2)
            .map(|_| {
                let mut store = StoreConfig::new(Backend::Hash).seed(7).build::<u8>();
                store.add(ts, 0).unwrap();
                store.add_unique_default(ts, 1)
            })
            .collect();
        assert_eq!(perturbed[0], perturbed[1]);
    }

    #[test]
    fn test_build_concurrent() {
        let store = StoreConfig::new(Backend::Hash).build_concurrent::<&str>();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        store.add(ts, "A").unwrap();
        assert!(store.wait_for_data(Some(Duration::from_millis(1))));
        assert_eq!(store.get_value_at(ts), Some("A"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StoreConfig = serde_json::from_str(r#"{"backend":"heap"}"#).unwrap();
        assert_eq!(config.backend, Backend::Heap);
        assert_eq!(config.max_offset, DEFAULT_MAX_OFFSET);
        assert_eq!(config.seed, None);
        assert!(config.clock.is_none());

        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backend, Backend::Tree);
    }

    #[test]
    fn test_deserialize_full() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"backend":"hash","max_offset":{"secs":0,"nanos":5000000},"seed":9}"#,
        )
        .unwrap();
        assert_eq!(config.backend, Backend::Hash);
        assert_eq!(config.max_offset, Duration::from_millis(5));
        assert_eq!(config.seed, Some(9));

        let store = config.build::<u8>();
        assert_eq!(store.resolver().default_max_offset(), Duration::from_millis(5));
    }

    #[test]
    fn test_deserialize_unknown_backend() {
        assert!(serde_json::from_str::<StoreConfig>(r#"{"backend":"btree"}"#).is_err());
        assert!(serde_json::from_str::<StoreConfig>(r#"{"backend":"Heap"}"#).is_err());
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Hash.to_string(), "hash");
        assert_eq!(Backend::Heap.to_string(), "heap");
        assert_eq!(Backend::Tree.to_string(), "tree");
    }
}
