pub mod dataset;
pub mod group;
pub(crate) mod spec;

pub use dataset::Dataset;
pub use group::{GroupKey, GroupValue, Selector};
pub use spec::Grouping;

use crate::error::{describe, CacheError, Result};
use crate::fat_cache::FatCache;
use crate::progress::Progress;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spec::GroupSpec;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;
use tracing::{debug, info};

/// A materialized index: record positions in the raw value, bucketed by group key.
///
/// Buckets keep the order in which their key was first seen, and positions within a bucket keep
/// the order of the raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Index {
    #[serde(with = "indexmap::map::serde_seq")]
    groups: IndexMap<GroupKey, Vec<usize>>,
}

impl Index {
    pub(crate) fn from_rows(rows: impl IntoIterator<Item = GroupKey>) -> Self {
        let mut groups: IndexMap<GroupKey, Vec<usize>> = IndexMap::new();
        for (position, key) in rows.into_iter().enumerate() {
            groups.entry(key).or_default().push(position);
        }
        Index { groups }
    }

    pub(crate) fn positions(&self, key: &GroupKey) -> &[usize] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct group keys.
    pub(crate) fn len(&self) -> usize {
        self.groups.len()
    }

    pub(crate) fn resolve<'a, T>(
        &'a self,
        records: &'a [T],
    ) -> IndexMap<&'a GroupKey, Vec<&'a T>> {
        self.groups
            .iter()
            .map(|(key, positions)| {
                let members = positions
                    .iter()
                    .filter_map(|&position| records.get(position))
                    .collect();
                (key, members)
            })
            .collect()
    }
}

impl<K, V> FatCache<K, V>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: Dataset + 'static,
{
    /// Makes `extractor` available to selectors under `name`. Replaces an extractor of the same
    /// name for group specs defined from now on.
    pub fn register_extractor<F, G>(&mut self, name: impl Into<String>, extractor: F)
    where
        F: Fn(&V::Item) -> G + 'static,
        G: Into<GroupValue>,
    {
        self.extractors
            .insert(name.into(), spec::column::<V, F, G>(extractor));
    }

    /// Registers a group spec that keys each record by the outputs of the extractors named in
    /// `on`, in order.
    ///
    /// Fails with [`CacheError::NotFetchable`] if `key` has neither a value nor a fetcher, and
    /// with [`CacheError::UnknownExtractor`] if a name in `on` is not registered. An index
    /// already materialized for (`key`, `on`) is kept as is until rematerialized.
    pub fn define_index(&mut self, key: &K, on: impl Into<Selector>) -> Result<()> {
        let on = on.into();
        self.ensure_data_source(key)?;

        let columns = on
            .names()
            .iter()
            .map(|name| {
                self.extractors
                    .get(name)
                    .cloned()
                    .ok_or_else(|| CacheError::UnknownExtractor {
                        key: describe(key),
                        extractor: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.install_group_spec(key, on, GroupSpec::by_columns(columns));
        Ok(())
    }

    /// Registers a group spec that keys each record by `group_fn`. The extractors named in `on`
    /// are never called; `on` only identifies the index. A scalar result is filed under a
    /// one-element key.
    pub fn define_index_with<F, G>(
        &mut self,
        key: &K,
        on: impl Into<Selector>,
        group_fn: F,
    ) -> Result<()>
    where
        F: Fn(&FatCache<K, V>, &V::Item) -> G + 'static,
        G: Into<GroupKey>,
    {
        let on = on.into();
        self.ensure_data_source(key)?;

        self.install_group_spec(key, on, GroupSpec::by_function(group_fn));
        Ok(())
    }

    /// (Re)builds the index for (`key`, `on`) from the current raw value, fetching it if needed.
    /// Without a group spec, one is defined from the extractors named in `on`.
    pub fn materialize_index(&mut self, key: &K, on: impl Into<Selector>) -> Result<()> {
        let on = on.into();
        if !self.index_defined(key, &on) {
            self.define_index(key, &on)?;
        }
        self.get(key)?;

        debug!(cache = %self.config.name, key = ?key, selector = %on, "indexing");
        self.report(|| Progress::IndexStarted {
            cache: self.config.name.clone(),
            key: describe(key),
            selector: on.clone(),
        });
        let started = Instant::now();

        let index = {
            let this = &*self;
            let spec = this
                .group_specs
                .get(key)
                .and_then(|specs| specs.get(&on))
                .ok_or_else(|| CacheError::NotIndexed {
                    key: describe(key),
                    selector: on.clone(),
                })?;
            let data = this
                .store
                .get(key)
                .ok_or_else(|| CacheError::NotFound { key: describe(key) })?;

            (spec.group)(this, data)
                .ok_or_else(|| CacheError::NotIndexable { key: describe(key) })?
        };

        let elapsed = started.elapsed();
        info!(
            cache = %self.config.name,
            key = ?key,
            selector = %on,
            groups = index.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "indexed"
        );
        self.report(|| Progress::IndexFinished {
            cache: self.config.name.clone(),
            key: describe(key),
            selector: on.clone(),
            elapsed,
        });

        self.indexes.entry(key.clone()).or_default().insert(on, index);
        Ok(())
    }

    /// Returns the materialized index for (`key`, `on`) as group key to records. Never
    /// materializes; fails with [`CacheError::NotIndexed`] instead.
    pub fn get_index(
        &self,
        key: &K,
        on: impl Into<Selector>,
    ) -> Result<IndexMap<&GroupKey, Vec<&V::Item>>> {
        let on = on.into();
        let index = self
            .indexes
            .get(key)
            .and_then(|indexes| indexes.get(&on))
            .ok_or_else(|| CacheError::NotIndexed {
                key: describe(key),
                selector: on.clone(),
            })?;
        let records = self
            .store
            .get(key)
            .and_then(V::records)
            .ok_or_else(|| CacheError::NotIndexable { key: describe(key) })?;

        Ok(index.resolve(records))
    }

    /// Records of `key` whose group key under `by` equals `using`, in their original order.
    /// Materializes the index first if needed. No match is an empty result, not an error.
    pub fn lookup(
        &mut self,
        key: &K,
        by: impl Into<Selector>,
        using: impl Into<GroupKey>,
    ) -> Result<Vec<V::Item>>
    where
        V::Item: Clone,
    {
        let by = by.into();
        let using = using.into();
        if !self.is_indexed(key, &by) {
            self.materialize_index(key, &by)?;
        }

        let index = self
            .indexes
            .get(key)
            .and_then(|indexes| indexes.get(&by))
            .ok_or_else(|| CacheError::NotIndexed {
                key: describe(key),
                selector: by.clone(),
            })?;
        let records = self
            .store
            .get(key)
            .and_then(V::records)
            .ok_or_else(|| CacheError::NotIndexable { key: describe(key) })?;

        Ok(index
            .positions(&using)
            .iter()
            .filter_map(|&position| records.get(position).cloned())
            .collect())
    }

    /// The single record matching every `(extractor, value)` pair in `spec`, or `None`.
    /// Fails with [`CacheError::AmbiguousHit`] when more than one record matches.
    pub fn one<I, S, G>(&mut self, key: &K, spec: I) -> Result<Option<V::Item>>
    where
        I: IntoIterator<Item = (S, G)>,
        S: Into<String>,
        G: Into<GroupValue>,
        V::Item: Clone + Debug,
    {
        let (by, using) = split_spec(spec);
        let mut hits = self.lookup(key, &by, &using)?;

        if hits.len() > 1 {
            return Err(CacheError::AmbiguousHit {
                key: describe(key),
                spec: describe_spec(&by, &using),
                matches: hits.len(),
                records: format!("{hits:?}"),
            });
        }
        Ok(hits.pop())
    }

    /// Like [`one`](Self::one), but a miss is [`CacheError::CacheMiss`].
    pub fn one_or_fail<I, S, G>(&mut self, key: &K, spec: I) -> Result<V::Item>
    where
        I: IntoIterator<Item = (S, G)>,
        S: Into<String>,
        G: Into<GroupValue>,
        V::Item: Clone + Debug,
    {
        let (by, using) = split_spec(spec);
        self.one(key, by.names().iter().cloned().zip(using.values().iter().cloned()))?
            .ok_or_else(|| CacheError::CacheMiss {
                key: describe(key),
                spec: describe_spec(&by, &using),
            })
    }

    /// How the index for (`key`, `on`) groups its records, if a group spec is registered.
    pub fn grouping(&self, key: &K, on: impl Into<Selector>) -> Option<Grouping> {
        let on = on.into();
        self.group_specs
            .get(key)
            .and_then(|specs| specs.get(&on))
            .map(|spec| spec.grouping)
    }

    fn ensure_data_source(&self, key: &K) -> Result<()> {
        if self.has_value(key) || self.has_fetcher(key) {
            Ok(())
        } else {
            Err(CacheError::NotFetchable { key: describe(key) })
        }
    }

    fn install_group_spec(&mut self, key: &K, on: Selector, spec: GroupSpec<K, V>) {
        debug!(
            cache = %self.config.name,
            key = ?key,
            selector = %on,
            grouping = ?spec.grouping,
            stale = self.is_indexed(key, &on),
            "defined index"
        );
        self.group_specs
            .entry(key.clone())
            .or_default()
            .insert(on, spec);
    }
}

fn split_spec<I, S, G>(spec: I) -> (Selector, GroupKey)
where
    I: IntoIterator<Item = (S, G)>,
    S: Into<String>,
    G: Into<GroupValue>,
{
    let (names, values): (Vec<String>, Vec<GroupValue>) = spec
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .unzip();
    (Selector::from(names), GroupKey::from(values))
}

fn describe_spec(by: &Selector, using: &GroupKey) -> String {
    let pairs = by
        .names()
        .iter()
        .zip(using.values())
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>();
    format!("{{{}}}", pairs.join(", "))
}
