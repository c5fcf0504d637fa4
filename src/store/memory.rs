use crate::store::{CacheStoreStrategy, KeyIterator};
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct MemoryStore<Key, Value> {
    data: HashMap<Key, Value>,
}

impl<Key, Value> MemoryStore<Key, Value> {
    pub fn new() -> Self {
        MemoryStore {
            data: HashMap::new(),
        }
    }
}

impl<Key, Value> Default for MemoryStore<Key, Value> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Key: Eq + Hash, Value> CacheStoreStrategy<Key, Value> for MemoryStore<Key, Value> {
    fn get(&self, key: &Key) -> Option<&Value> {
        self.data.get(key)
    }

    fn put(&mut self, key: Key, value: Value) -> Option<Value> {
        self.data.insert(key, value)
    }

    fn delete(&mut self, key: &Key) -> Option<Value> {
        self.data.remove(key)
    }

    fn flush(&mut self) {
        self.data.clear();
    }

    fn get_keys(&self) -> KeyIterator<'_, Key> {
        Box::new(self.data.keys())
    }

    fn contains(&self, key: &Key) -> bool {
        self.data.contains_key(key)
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_returns_replaced_value() {
        let mut store = MemoryStore::new();

        assert_eq!(store.put("answer", 41), None);
        assert_eq!(store.put("answer", 42), Some(41));
        assert_eq!(store.get(&"answer"), Some(&42));
    }

    #[test]
    fn delete_and_flush_remove_entries() {
        let mut store = MemoryStore::new();
        store.put("a", 1);
        store.put("b", 2);

        assert_eq!(store.delete(&"a"), Some(1));
        assert_eq!(store.delete(&"a"), None);
        assert!(!store.contains(&"a"));
        assert_eq!(store.len(), 1);

        store.flush();
        assert!(store.is_empty());
        assert_eq!(store.get_keys().count(), 0);
    }

    #[test]
    fn absent_value_is_still_an_entry() {
        let mut store: MemoryStore<&str, Option<u32>> = MemoryStore::new();
        store.put("nothing", None);

        assert!(store.contains(&"nothing"));
        assert_eq!(store.get(&"nothing"), Some(&None));
    }
}
