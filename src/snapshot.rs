use crate::config::SnapshotFormat;
use crate::error::{describe, CacheError, Result};
use crate::fat_cache::FatCache;
use crate::index::{Index, Selector};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs::File;
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

const SNAPSHOT_VERSION: u32 = 1;

/// Abstracts away the selection of the serialize/deserialize format of a snapshot.
pub trait SnapshotCodec {
    fn encode<T: Serialize, W: Write>(writer: W, value: &T) -> Result<()>;

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T>;
}

pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    fn encode<T: Serialize, W: Write>(writer: W, value: &T) -> Result<()> {
        Ok(serde_json::to_writer(writer, value)?)
    }

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
        Ok(serde_json::from_reader(reader)?)
    }
}

pub struct BincodeCodec;

impl SnapshotCodec for BincodeCodec {
    fn encode<T: Serialize, W: Write>(writer: W, value: &T) -> Result<()> {
        Ok(bincode::serialize_into(writer, value)?)
    }

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
        Ok(bincode::deserialize_from(reader)?)
    }
}

impl SnapshotFormat {
    fn encode<T: Serialize, W: Write>(self, writer: W, value: &T) -> Result<()> {
        match self {
            SnapshotFormat::Bincode => BincodeCodec::encode(writer, value),
            SnapshotFormat::Json => JsonCodec::encode(writer, value),
        }
    }

    fn decode<T: DeserializeOwned, R: Read>(self, reader: R) -> Result<T> {
        match self {
            SnapshotFormat::Bincode => BincodeCodec::decode(reader),
            SnapshotFormat::Json => JsonCodec::decode(reader),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Record<Key, Value> {
    key: Key,
    value: Value,
}

#[derive(Serialize, Deserialize)]
struct IndexRecord<Key, Idx> {
    key: Key,
    selector: Selector,
    index: Idx,
}

/// Written with borrowed records and read back into owned ones.
#[derive(Serialize, Deserialize)]
struct Snapshot<Key, Value, Idx> {
    id: Uuid,
    version: u32,
    values: Vec<Record<Key, Value>>,
    indexes: Vec<IndexRecord<Key, Idx>>,
}

impl<K, V> FatCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Serialize + DeserializeOwned + 'static,
    V: Serialize + DeserializeOwned + 'static,
{
    /// Serializes every raw value and materialized index in the configured format. Fetchers,
    /// extractors and group specs are code and are not included.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        self.snapshot_to_writer(&mut blob)?;
        Ok(blob)
    }

    pub fn snapshot_to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let values = self
            .store
            .get_keys()
            .filter_map(|key| self.store.get(key).map(|value| Record { key, value }))
            .collect::<Vec<_>>();
        let indexes = self
            .indexes
            .iter()
            .flat_map(|(key, indexes)| {
                indexes.iter().map(move |(selector, index)| IndexRecord {
                    key,
                    selector: selector.clone(),
                    index,
                })
            })
            .collect::<Vec<_>>();

        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            version: SNAPSHOT_VERSION,
            values,
            indexes,
        };
        self.config.snapshot_format.encode(writer, &snapshot)?;

        info!(
            cache = %self.config.name,
            snapshot = %snapshot.id,
            values = snapshot.values.len(),
            indexes = snapshot.indexes.len(),
            "took snapshot"
        );
        Ok(())
    }

    /// Writes a snapshot to `path`, replacing the file if it exists.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.snapshot_to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Replaces all raw values and indexes with those of a snapshot taken by
    /// [`snapshot`](Self::snapshot). Registered fetchers and group specs are left as they are;
    /// after a [`reset`](Self::reset) a restored key has none, so invalidating it makes it
    /// unreadable until a value or fetcher is registered again.
    pub fn restore(&mut self, blob: &[u8]) -> Result<()> {
        self.restore_from_reader(blob)
    }

    pub fn restore_from_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        let snapshot: Snapshot<K, V, Index> = self.config.snapshot_format.decode(reader)?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CacheError::CorruptSnapshot(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let keys = snapshot
            .values
            .iter()
            .map(|record| &record.key)
            .collect::<HashSet<_>>();
        if let Some(orphan) = snapshot
            .indexes
            .iter()
            .find(|record| !keys.contains(&record.key))
        {
            return Err(CacheError::CorruptSnapshot(format!(
                "index on {} for {} has no value",
                orphan.selector,
                describe(&orphan.key)
            )));
        }

        let values = snapshot.values.len();
        let indexes = snapshot.indexes.len();

        self.indexes.clear();
        self.store.flush();
        for Record { key, value } in snapshot.values {
            self.store.put(key, value);
        }
        for IndexRecord {
            key,
            selector,
            index,
        } in snapshot.indexes
        {
            self.indexes.entry(key).or_default().insert(selector, index);
        }

        info!(
            cache = %self.config.name,
            snapshot = %snapshot.id,
            values,
            indexes,
            "restored snapshot"
        );
        Ok(())
    }

    pub fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let reader = BufReader::new(File::open(path)?);
        self.restore_from_reader(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use pretty_assertions::assert_eq;

    fn key(name: &str) -> String {
        name.to_string()
    }

    fn numbers(config: CacheConfig) -> FatCache<String, Vec<i64>> {
        let mut cache: FatCache<String, Vec<i64>> = FatCache::with_config(config);
        cache.register_extractor("is_odd", |n: &i64| n % 2 != 0);
        cache.register_extractor("is_even", |n: &i64| n % 2 == 0);
        cache.register_fn(key("numbers"), || vec![0, 1, 2, 3, 4]).unwrap();
        cache
    }

    fn round_trip(config: CacheConfig) {
        let mut cache = numbers(config);
        cache.materialize_index(&key("numbers"), "is_odd").unwrap();
        let before = cache.lookup(&key("numbers"), "is_odd", true).unwrap();

        let blob = cache.snapshot().unwrap();
        cache.reset();
        cache.restore(&blob).unwrap();

        assert!(cache.is_indexed(&key("numbers"), "is_odd"));
        assert!(!cache.has_fetcher(&key("numbers")));
        assert_eq!(cache.get(&key("numbers")).unwrap(), &vec![0, 1, 2, 3, 4]);
        assert_eq!(cache.lookup(&key("numbers"), "is_odd", true).unwrap(), before);
    }

    #[test]
    fn bincode_round_trip() {
        round_trip(CacheConfig::default());
    }

    #[test]
    fn json_round_trip() {
        round_trip(CacheConfig::default().with_snapshot_format(SnapshotFormat::Json));
    }

    #[test]
    fn restored_data_accepts_new_indexes() {
        let mut cache = numbers(CacheConfig::default());
        cache.materialize_index(&key("numbers"), "is_odd").unwrap();
        let blob = cache.snapshot().unwrap();
        cache.reset();
        cache.restore(&blob).unwrap();

        cache.define_index(&key("numbers"), "is_even").unwrap();

        assert_eq!(
            cache.lookup(&key("numbers"), "is_even", true).unwrap(),
            vec![0, 2, 4]
        );
    }

    #[test]
    fn invalidating_restored_data_is_permanent() {
        let mut cache = numbers(CacheConfig::default());
        cache.get(&key("numbers")).unwrap();
        let blob = cache.snapshot().unwrap();
        cache.reset();
        cache.restore(&blob).unwrap();

        assert_eq!(cache.invalidate(&key("numbers")), Some(vec![0, 1, 2, 3, 4]));

        assert!(matches!(
            cache.get(&key("numbers")),
            Err(CacheError::NotFound { .. })
        ));
        assert!(matches!(
            cache.lookup(&key("numbers"), "is_odd", true),
            Err(CacheError::NotFetchable { .. })
        ));
    }

    #[test]
    fn absent_values_and_empty_collections_survive() {
        let config = CacheConfig::default().with_snapshot_format(SnapshotFormat::Json);
        let mut cache: FatCache<String, Option<Vec<i64>>> = FatCache::with_config(config);
        cache.register_extractor("is_odd", |n: &i64| n % 2 != 0);
        cache.store(key("nothing"), None).unwrap();
        cache.store(key("empty"), Some(vec![])).unwrap();
        cache.materialize_index(&key("empty"), "is_odd").unwrap();

        let blob = cache.snapshot().unwrap();
        cache.reset();
        cache.restore(&blob).unwrap();

        assert_eq!(cache.get(&key("nothing")).unwrap(), &None);
        assert_eq!(cache.get(&key("empty")).unwrap(), &Some(vec![]));
        assert!(cache.is_indexed(&key("empty"), "is_odd"));
        assert!(cache.get_index(&key("empty"), "is_odd").unwrap().is_empty());
    }

    #[test]
    fn restore_replaces_current_values_but_keeps_fetchers() {
        let mut cache = numbers(CacheConfig::default());
        cache.store(key("other"), vec![9]).unwrap();
        let blob = cache.snapshot().unwrap();

        cache.store(key("other"), vec![10]).unwrap();
        cache.store(key("newer"), vec![11]).unwrap();
        cache.restore(&blob).unwrap();

        assert_eq!(cache.peek(&key("other")), Some(&vec![9]));
        assert_eq!(cache.peek(&key("newer")), None);
        assert!(cache.has_fetcher(&key("numbers")));
        assert_eq!(cache.get(&key("numbers")).unwrap(), &vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn snapshot_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.snapshot");
        let mut cache = numbers(CacheConfig::default());
        cache.materialize_index(&key("numbers"), "is_even").unwrap();

        cache.save_snapshot(&path).unwrap();
        cache.reset();
        cache.load_snapshot(&path).unwrap();

        assert_eq!(
            cache.lookup(&key("numbers"), "is_even", false).unwrap(),
            vec![1, 3]
        );
    }

    #[test]
    fn garbage_is_rejected() {
        let mut cache = numbers(CacheConfig::default().with_snapshot_format(SnapshotFormat::Json));

        assert!(matches!(
            cache.restore(b"not a snapshot"),
            Err(CacheError::Json(_))
        ));
        assert!(cache.has_fetcher(&key("numbers")));
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let snapshot = Snapshot::<String, Vec<i64>, Index> {
            id: Uuid::new_v4(),
            version: SNAPSHOT_VERSION + 1,
            values: vec![Record {
                key: key("numbers"),
                value: vec![7],
            }],
            indexes: vec![],
        };
        let blob = serde_json::to_vec(&snapshot).unwrap();
        let mut cache = numbers(CacheConfig::default().with_snapshot_format(SnapshotFormat::Json));
        cache.store(key("kept"), vec![1]).unwrap();

        let err = cache.restore(&blob).unwrap_err();

        assert!(matches!(err, CacheError::CorruptSnapshot(_)));
        assert!(err.to_string().contains("version 2"));
        assert_eq!(cache.peek(&key("kept")), Some(&vec![1]));
        assert_eq!(cache.peek(&key("numbers")), None);
    }

    #[test]
    fn orphaned_indexes_are_rejected() {
        let snapshot = Snapshot::<String, Vec<i64>, Index> {
            id: Uuid::new_v4(),
            version: SNAPSHOT_VERSION,
            values: vec![],
            indexes: vec![IndexRecord {
                key: key("numbers"),
                selector: Selector::from("is_odd"),
                index: Index::default(),
            }],
        };
        let blob = bincode::serialize(&snapshot).unwrap();
        let mut cache = numbers(CacheConfig::default());

        let err = cache.restore(&blob).unwrap_err();

        assert!(matches!(err, CacheError::CorruptSnapshot(_)));
        assert!(err.to_string().contains("is_odd"));
    }
}
