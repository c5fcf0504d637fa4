//! A process-local, lazily-populated cache with secondary indexes over cached collections.
//!
//! Register a value or a fetcher for a key, read it back with [`FatCache::get`], and query
//! cached collections by the outputs of named extractors:
//!
//! ```
//! use fat_cache::FatCache;
//!
//! let mut cache: FatCache<&str, Vec<i64>> = FatCache::new();
//! cache.register_extractor("is_odd", |n: &i64| n % 2 != 0);
//! cache.register_fn("numbers", || vec![0, 1, 2, 3, 4, 5]).unwrap();
//!
//! assert_eq!(cache.lookup(&"numbers", "is_odd", true).unwrap(), vec![1, 3, 5]);
//! assert!(cache.one(&"numbers", [("is_odd", false)]).is_err());
//! ```

pub mod config;
pub mod error;
pub mod fat_cache;
pub mod hydration;
pub mod index;
pub mod progress;
pub mod snapshot;
pub mod store;

pub use config::{CacheConfig, FetchPolicy, RegistrationMode, SnapshotFormat};
pub use error::{CacheError, FetchError, Result};
pub use fat_cache::FatCache;
pub use hydration::CacheLookupSuccess;
pub use index::{Dataset, GroupKey, GroupValue, Grouping, Selector};
pub use progress::{Progress, ProgressObserver};
pub use snapshot::{BincodeCodec, JsonCodec, SnapshotCodec};
pub use store::memory::MemoryStore;
pub use store::CacheStoreStrategy;
