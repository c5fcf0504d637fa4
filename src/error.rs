use crate::index::Selector;
use std::fmt::Debug;
use thiserror::Error;

/// Error produced by a fetcher. Whatever the caller's fetcher returns is boxed into this and
/// carried as the `source` of [`CacheError::Fetch`].
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum CacheError {
    /// `get` on a key that was never stored and has no fetcher.
    #[error("no data for {key}")]
    NotFound { key: String },

    /// A fetch or index definition was attempted for a key with no data source.
    #[error("cannot fetch for {key}")]
    NotFetchable { key: String },

    /// `get_index` on a (key, selector) pair that has not been materialized.
    #[error("no index for {key} on {selector}")]
    NotIndexed { key: String, selector: Selector },

    /// `one` matched more than one element.
    #[error("expected one record for {key} with {spec}, got {matches}: {records}")]
    AmbiguousHit {
        key: String,
        spec: String,
        matches: usize,
        /// The matching records, rendered with `Debug`.
        records: String,
    },

    /// `one_or_fail` matched nothing.
    #[error("could not find {key} with {spec}")]
    CacheMiss { key: String, spec: String },

    #[error("invalid registration for {key}: {reason}")]
    InvalidRegistration { key: String, reason: String },

    #[error("no extractor named `{extractor}` to index {key}")]
    UnknownExtractor { key: String, extractor: String },

    /// The raw value exists but does not expose records to group.
    #[error("data for {key} is not an indexable collection")]
    NotIndexable { key: String },

    #[error("fetcher for {key} failed: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Keys are opaque to the cache, so errors and log lines render them with `Debug`.
pub(crate) fn describe<Key: Debug>(key: &Key) -> String {
    format!("{key:?}")
}
