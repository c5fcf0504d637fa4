pub mod memory;

pub type KeyIterator<'a, Key> = Box<dyn Iterator<Item = &'a Key> + 'a>;

/// Holds the raw entries of a cache. Fetchers, group specs and indexes live in the cache itself;
/// a store only ever sees materialized values.
pub trait CacheStoreStrategy<Key, Value> {
    fn get(&self, key: &Key) -> Option<&Value>;

    /// Returns the value this one replaced, if any.
    fn put(&mut self, key: Key, value: Value) -> Option<Value>;

    fn delete(&mut self, key: &Key) -> Option<Value>;

    fn flush(&mut self);

    fn get_keys(&self) -> KeyIterator<'_, Key>;

    fn contains(&self, key: &Key) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
