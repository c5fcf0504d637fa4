use crate::error::{describe, CacheError, Result};
use crate::fat_cache::FatCache;
use crate::progress::Progress;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Eq, PartialEq)]
pub enum CacheLookupSuccess<Value> {
    /// Value was not present in the underlying store and had to be fetched.
    Miss(Value),

    /// Valid value found in underlying store.
    Hit(Value),
}

impl<Value> CacheLookupSuccess<Value> {
    pub fn into_value(self) -> Value {
        match self {
            CacheLookupSuccess::Miss(value) | CacheLookupSuccess::Hit(value) => value,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookupSuccess::Hit(_))
    }
}

impl<K, V> FatCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: 'static,
{
    /// Returns the raw value for `key`, running its fetcher once if nothing is cached yet.
    ///
    /// A fetcher's own error comes back as [`CacheError::Fetch`] with the original as its
    /// `source`. A [`CacheError`] returned by the fetcher is passed through as is.
    pub fn get(&mut self, key: &K) -> Result<&V> {
        self.get_with_status(key).map(CacheLookupSuccess::into_value)
    }

    /// Like [`get`](Self::get), but reports whether the value came from the store or a fetch.
    pub fn get_with_status(&mut self, key: &K) -> Result<CacheLookupSuccess<&V>> {
        if self.store.contains(key) {
            return self
                .store
                .get(key)
                .map(CacheLookupSuccess::Hit)
                .ok_or_else(|| CacheError::NotFound { key: describe(key) });
        }

        if !self.has_fetcher(key) {
            return Err(CacheError::NotFound { key: describe(key) });
        }

        self.hydrate(key)?;
        self.store
            .get(key)
            .map(CacheLookupSuccess::Miss)
            .ok_or_else(|| CacheError::NotFound { key: describe(key) })
    }

    /// Re-runs the fetcher for `key` even if a value is cached, replacing it. Errors are
    /// reported as for [`get`](Self::get).
    pub fn fetch(&mut self, key: &K) -> Result<&V> {
        self.hydrate(key)?;
        self.store
            .get(key)
            .ok_or_else(|| CacheError::NotFound { key: describe(key) })
    }

    /// Runs the fetcher and stores its result. A failing fetcher leaves the cache untouched.
    pub(crate) fn hydrate(&mut self, key: &K) -> Result<()> {
        let fetcher = self
            .fetchers
            .get(key)
            .map(Rc::clone)
            .ok_or_else(|| CacheError::NotFetchable { key: describe(key) })?;

        debug!(cache = %self.config.name, key = ?key, "fetching");
        self.report(|| Progress::FetchStarted {
            cache: self.config.name.clone(),
            key: describe(key),
        });
        let started = Instant::now();

        let value = match fetcher(self) {
            Ok(value) => value,
            Err(source) => {
                warn!(cache = %self.config.name, key = ?key, error = %source, "fetch failed");
                // A cache error raised inside a fetcher (e.g. a nested `get`) is already keyed.
                return Err(match source.downcast::<CacheError>() {
                    Ok(nested) => *nested,
                    Err(source) => CacheError::Fetch {
                        key: describe(key),
                        source,
                    },
                });
            }
        };

        let elapsed = started.elapsed();
        self.put_value(key.clone(), value);

        info!(
            cache = %self.config.name,
            key = ?key,
            elapsed_ms = elapsed.as_millis() as u64,
            "fetched"
        );
        self.report(|| Progress::FetchFinished {
            cache: self.config.name.clone(),
            key: describe(key),
            elapsed,
        });
        Ok(())
    }
}
