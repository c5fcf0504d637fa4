use crate::fat_cache::FatCache;
use crate::index::{Dataset, GroupKey, GroupValue, Index};
use std::fmt;
use std::rc::Rc;

/// One extractor applied to every record of a dataset, producing a column of outputs.
/// `None` when the dataset has no records to offer.
pub(crate) type ColumnFn<V> = Rc<dyn Fn(&V) -> Option<Vec<GroupValue>>>;

/// Groups a whole dataset into positional buckets.
pub(crate) type GroupFn<K, V> = Rc<dyn Fn(&FatCache<K, V>, &V) -> Option<Index>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Group by the outputs of the selector's named extractors.
    Extractors,
    /// Group by a caller-supplied function; the selector only names the index.
    Custom,
}

/// A registered grouping strategy for one (key, selector) pair.
pub(crate) struct GroupSpec<K, V> {
    pub(crate) grouping: Grouping,
    pub(crate) group: GroupFn<K, V>,
}

impl<K, V> Clone for GroupSpec<K, V> {
    fn clone(&self) -> Self {
        Self {
            grouping: self.grouping,
            group: Rc::clone(&self.group),
        }
    }
}

impl<K, V> fmt::Debug for GroupSpec<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupSpec")
            .field("grouping", &self.grouping)
            .finish_non_exhaustive()
    }
}

impl<K: 'static, V: Dataset + 'static> GroupSpec<K, V> {
    pub(crate) fn by_columns(columns: Vec<ColumnFn<V>>) -> Self {
        let group: GroupFn<K, V> = Rc::new(move |_cache: &FatCache<K, V>, data: &V| {
            let rows = data.records()?.len();
            let columns = columns
                .iter()
                .map(|column| column(data))
                .collect::<Option<Vec<_>>>()?;

            Some(Index::from_rows((0..rows).map(|row| {
                columns
                    .iter()
                    .map(|column| column[row].clone())
                    .collect::<GroupKey>()
            })))
        });

        GroupSpec {
            grouping: Grouping::Extractors,
            group,
        }
    }

    pub(crate) fn by_function<F, G>(group_fn: F) -> Self
    where
        F: Fn(&FatCache<K, V>, &V::Item) -> G + 'static,
        G: Into<GroupKey>,
    {
        let group: GroupFn<K, V> = Rc::new(move |cache: &FatCache<K, V>, data: &V| {
            let records = data.records()?;
            Some(Index::from_rows(
                records
                    .iter()
                    .map(|record| -> GroupKey { group_fn(cache, record).into() }),
            ))
        });

        GroupSpec {
            grouping: Grouping::Custom,
            group,
        }
    }
}

/// Wraps a typed extractor into a column over the whole dataset.
pub(crate) fn column<V, F, G>(extractor: F) -> ColumnFn<V>
where
    V: Dataset + 'static,
    F: Fn(&V::Item) -> G + 'static,
    G: Into<GroupValue>,
{
    Rc::new(move |data: &V| -> Option<Vec<GroupValue>> {
        data.records()
            .map(|records| records.iter().map(|record| extractor(record).into()).collect())
    })
}
