// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache configuration, loaded from RON.

use crate::assets::{
    AssetCache, LruAssetCache, SimpleAssetCache, WeakRefAssetCache, WeakRefCloneAssetCache,
};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Which eviction policy backs the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachePolicy {
    /// Strong references, never evicted.
    #[default]
    Simple,
    /// Weak references; entries vanish with their last outside holder.
    WeakRef,
    /// Masters live as long as a registered clone or a pending hand-out.
    WeakRefClone,
    /// Strong references, trimmed to `capacity` least recently used first.
    Lru {
        /// Entries kept after a trim.
        capacity: usize,
    },
}

/// Errors raised while loading a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum CacheConfigError {
    /// The RON text could not be parsed.
    #[error("invalid cache configuration: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// The configuration file could not be read.
    #[error("failed to read cache configuration '{path}': {source}")]
    Io {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// An LRU cache was configured without room for a single entry.
    #[error("LRU capacity must be at least 1")]
    ZeroCapacity,
}

/// Settings for building an [`AssetCache`].
///
/// ```ron
/// (
///     policy: Lru(capacity: 256),
///     pending_clone_window_ms: 2000,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// The eviction policy.
    pub policy: CachePolicy,
    /// How long a hand-out may stay unsettled before it is reported.
    pub pending_clone_window_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            policy: CachePolicy::Simple,
            pending_clone_window_ms: 5_000,
        }
    }
}

impl CacheConfig {
    /// Parses a configuration from RON text. Missing fields take defaults.
    pub fn from_ron(text: &str) -> Result<Self, CacheConfigError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a RON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CacheConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CacheConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Checks values that parse but cannot be built.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        match self.policy {
            CachePolicy::Lru { capacity: 0 } => Err(CacheConfigError::ZeroCapacity),
            _ => Ok(()),
        }
    }

    /// The pending-clone window as a [`Duration`].
    pub fn pending_clone_window(&self) -> Duration {
        Duration::from_millis(self.pending_clone_window_ms)
    }

    /// Builds an empty cache with the configured policy.
    pub fn build(&self) -> Result<Arc<dyn AssetCache>, CacheConfigError> {
        let cache: Arc<dyn AssetCache> = match self.policy {
            CachePolicy::Simple => Arc::new(SimpleAssetCache::new()),
            CachePolicy::WeakRef => Arc::new(WeakRefAssetCache::new()),
            CachePolicy::WeakRefClone => Arc::new(WeakRefCloneAssetCache::new()),
            CachePolicy::Lru { capacity } => {
                let capacity = NonZeroUsize::new(capacity).ok_or(CacheConfigError::ZeroCapacity)?;
                Arc::new(LruAssetCache::new(capacity))
            }
        };
        log::debug!("Built '{}' asset cache", cache.policy_name());
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config =
            CacheConfig::from_ron("(policy: Lru(capacity: 64), pending_clone_window_ms: 250)")
                .unwrap();
        assert_eq!(config.policy, CachePolicy::Lru { capacity: 64 });
        assert_eq!(config.pending_clone_window(), Duration::from_millis(250));
        assert_eq!(config.build().unwrap().policy_name(), "lru");
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = CacheConfig::from_ron("(policy: WeakRefClone)").unwrap();
        assert_eq!(config.policy, CachePolicy::WeakRefClone);
        assert_eq!(config.pending_clone_window_ms, 5_000);
        assert_eq!(CacheConfig::from_ron("()").unwrap(), CacheConfig::default());
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(matches!(
            CacheConfig::from_ron("(policy: Lru(capacity: 0))"),
            Err(CacheConfigError::ZeroCapacity)
        ));
        assert!(matches!(
            CacheConfig::from_ron("(policy: Forever)"),
            Err(CacheConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.ron");
        std::fs::write(&path, "(policy: WeakRef, pending_clone_window_ms: 10)").unwrap();

        let config = CacheConfig::from_file(&path).unwrap();
        assert_eq!(config.policy, CachePolicy::WeakRef);
        assert!(matches!(
            CacheConfig::from_file(dir.path().join("missing.ron")),
            Err(CacheConfigError::Io { .. })
        ));
    }
}
