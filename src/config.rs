use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Which registration calls a cache accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    /// Keys may be populated with `store` (a value) or `register` (a fetcher).
    #[default]
    ValueOrFetcher,

    /// Keys may only be populated through fetchers; `store` is rejected.
    FetcherOnly,
}

/// When a newly registered fetcher is first evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// On the first `get`.
    #[default]
    Lazy,

    /// Immediately on `register`, caching the result.
    Eager,
}

/// Container format used by `snapshot` and `restore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    #[default]
    Bincode,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Label for progress messages and log fields.
    pub name: String,
    pub registration: RegistrationMode,
    pub fetch_policy: FetchPolicy,
    pub snapshot_format: SnapshotFormat,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "fatcache".to_string(),
            registration: RegistrationMode::default(),
            fetch_policy: FetchPolicy::default(),
            snapshot_format: SnapshotFormat::default(),
        }
    }
}

impl CacheConfig {
    /// Fetchers only, evaluated lazily.
    pub fn fetcher_only() -> Self {
        Self {
            registration: RegistrationMode::FetcherOnly,
            fetch_policy: FetchPolicy::Lazy,
            ..Self::default()
        }
    }

    /// Values or fetchers, with fetchers evaluated as soon as they are registered.
    pub fn eager() -> Self {
        Self {
            registration: RegistrationMode::ValueOrFetcher,
            fetch_policy: FetchPolicy::Eager,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_snapshot_format(mut self, format: SnapshotFormat) -> Self {
        self.snapshot_format = format;
        self
    }

    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lazy_value_or_fetcher() {
        let config = CacheConfig::default();

        assert_eq!(config.name, "fatcache");
        assert_eq!(config.registration, RegistrationMode::ValueOrFetcher);
        assert_eq!(config.fetch_policy, FetchPolicy::Lazy);
        assert_eq!(config.snapshot_format, SnapshotFormat::Bincode);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            CacheConfig::from_json(r#"{ "name": "reports", "fetch_policy": "eager" }"#).unwrap();

        assert_eq!(config.name, "reports");
        assert_eq!(config.fetch_policy, FetchPolicy::Eager);
        assert_eq!(config.registration, RegistrationMode::ValueOrFetcher);
    }

    #[test]
    fn unknown_variant_is_rejected() {
        let result = CacheConfig::from_json(r#"{ "registration": "sometimes" }"#);

        assert!(matches!(result, Err(crate::CacheError::Json(_))));
    }

    #[test]
    fn presets_model_both_registration_styles() {
        assert_eq!(
            CacheConfig::fetcher_only().registration,
            RegistrationMode::FetcherOnly
        );
        assert_eq!(CacheConfig::eager().fetch_policy, FetchPolicy::Eager);
    }
}
