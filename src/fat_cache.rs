use crate::config::{CacheConfig, FetchPolicy, RegistrationMode};
use crate::error::{describe, CacheError, FetchError, Result};
use crate::index::spec::{ColumnFn, GroupSpec};
use crate::index::{Index, Selector};
use crate::progress::{Progress, ProgressObserver};
use crate::store::memory::MemoryStore;
use crate::store::CacheStoreStrategy;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::rc::Rc;
use tracing::debug;

/// A registered fetcher. Receives the cache so it can read other keys or register more fetchers.
pub(crate) type FetchFn<K, V> =
    Rc<dyn Fn(&mut FatCache<K, V>) -> std::result::Result<V, FetchError>>;

/// A lazily-populated key/value cache with secondary indexes over cached collections.
///
/// Each key may have a fetcher (a deferred computation run on first access) and a raw value.
/// Values that are collections (see [`Dataset`](crate::Dataset)) can be grouped by named
/// extractors or custom group functions and queried with [`lookup`](Self::lookup) and
/// [`one`](Self::one).
///
/// Invalidating a key drops its raw value and materialized indexes but keeps its fetcher and
/// group specs, so the next read rebuilds both. Only [`reset`](Self::reset) forgets
/// registrations.
///
/// The cache is single-threaded. A fetcher that reads its own key while running recurses
/// until the stack overflows.
pub struct FatCache<K, V> {
    pub(crate) config: CacheConfig,
    pub(crate) store: Box<dyn CacheStoreStrategy<K, V>>,
    pub(crate) fetchers: HashMap<K, FetchFn<K, V>>,
    pub(crate) extractors: HashMap<String, ColumnFn<V>>,
    pub(crate) group_specs: HashMap<K, HashMap<Selector, GroupSpec<K, V>>>,
    pub(crate) indexes: HashMap<K, HashMap<Selector, Index>>,
    observer: Option<Rc<dyn ProgressObserver>>,
}

impl<K, V> FatCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: 'static,
{
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    pub fn with_store(config: CacheConfig, store: Box<dyn CacheStoreStrategy<K, V>>) -> Self {
        FatCache {
            config,
            store,
            fetchers: HashMap::new(),
            extractors: HashMap::new(),
            group_specs: HashMap::new(),
            indexes: HashMap::new(),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Some(Rc::new(observer));
        self
    }

    pub fn set_observer(&mut self, observer: Option<Rc<dyn ProgressObserver>>) {
        self.observer = observer;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Registers a fetcher for `key`, replacing any previous one.
    ///
    /// Under [`FetchPolicy::Lazy`] the fetcher is not run until the key is read. Under
    /// [`FetchPolicy::Eager`] it runs immediately; if it fails, the registration is kept and
    /// the error returned.
    pub fn register<F, E>(&mut self, key: K, fetcher: F) -> Result<()>
    where
        F: Fn(&mut FatCache<K, V>) -> std::result::Result<V, E> + 'static,
        E: Into<FetchError>,
    {
        let fetcher: FetchFn<K, V> = Rc::new(
            move |cache: &mut FatCache<K, V>| -> std::result::Result<V, FetchError> {
                fetcher(cache).map_err(Into::into)
            },
        );
        self.install_fetcher(key, fetcher)
    }

    /// Registers an infallible, zero-argument fetcher for `key`.
    pub fn register_fn<F>(&mut self, key: K, fetcher: F) -> Result<()>
    where
        F: Fn() -> V + 'static,
    {
        let fetcher: FetchFn<K, V> = Rc::new(
            move |_: &mut FatCache<K, V>| -> std::result::Result<V, FetchError> { Ok(fetcher()) },
        );
        self.install_fetcher(key, fetcher)
    }

    fn install_fetcher(&mut self, key: K, fetcher: FetchFn<K, V>) -> Result<()> {
        debug!(cache = %self.config.name, key = ?key, "registered fetcher");
        self.fetchers.insert(key.clone(), fetcher);

        if self.config.fetch_policy == FetchPolicy::Eager {
            self.hydrate(&key)?;
        }
        Ok(())
    }

    /// Assigns a raw value directly, bypassing any fetcher. Rejected with
    /// [`CacheError::InvalidRegistration`] when the cache only accepts fetchers.
    pub fn store(&mut self, key: K, value: V) -> Result<()> {
        if self.config.registration == RegistrationMode::FetcherOnly {
            return Err(CacheError::InvalidRegistration {
                key: describe(&key),
                reason: "this cache only accepts fetchers; register one instead of a value"
                    .to_string(),
            });
        }

        self.put_value(key, value);
        Ok(())
    }

    /// Removes the raw value and every materialized index of `key`, returning the value.
    /// Fetchers and group specs stay registered.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        let dropped_indexes = self.indexes.remove(key).map_or(0, |indexes| indexes.len());
        let removed = self.store.delete(key);

        debug!(
            cache = %self.config.name,
            key = ?key,
            cached = removed.is_some(),
            dropped_indexes,
            "invalidated"
        );
        removed
    }

    /// Forgets everything: fetchers, group specs, raw values and indexes. Registered extractors,
    /// the configuration and the observer are kept.
    pub fn reset(&mut self) {
        self.fetchers.clear();
        self.group_specs.clear();
        self.indexes.clear();
        self.store.flush();

        debug!(cache = %self.config.name, "reset");
    }

    /// Reads a raw value without fetching.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.store.get(key)
    }

    pub fn has_value(&self, key: &K) -> bool {
        self.store.contains(key)
    }

    pub fn has_fetcher(&self, key: &K) -> bool {
        self.fetchers.contains_key(key)
    }

    /// Whether a group spec is registered for (`key`, `on`).
    pub fn index_defined(&self, key: &K, on: impl Into<Selector>) -> bool {
        let on = on.into();
        self.group_specs
            .get(key)
            .is_some_and(|specs| specs.contains_key(&on))
    }

    /// Whether an index is materialized for (`key`, `on`).
    pub fn is_indexed(&self, key: &K, on: impl Into<Selector>) -> bool {
        let on = on.into();
        self.indexes
            .get(key)
            .is_some_and(|indexes| indexes.contains_key(&on))
    }

    /// Number of keys holding a raw value.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Indexes are positions into the raw value, so replacing the value discards them.
    pub(crate) fn put_value(&mut self, key: K, value: V) {
        self.indexes.remove(&key);
        self.store.put(key, value);
    }

    pub(crate) fn report(&self, progress: impl FnOnce() -> Progress) {
        if let Some(observer) = &self.observer {
            observer.notify(&progress());
        }
    }
}

impl<K, V> Default for FatCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Debug, V> Debug for FatCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FatCache")
            .field("config", &self.config)
            .field("values", &self.store.len())
            .field("fetchers", &self.fetchers.keys().collect::<Vec<_>>())
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
