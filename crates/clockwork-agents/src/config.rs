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

//! Agent configuration, loaded from RON.

use anyhow::{Context, Result};
use clockwork_data::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for building an [`AssetAgent`](crate::AssetAgent).
///
/// ```ron
/// (
///     cache: (policy: WeakRefClone, pending_clone_window_ms: 1000),
///     asset_root: Some("assets"),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// The cache the agent populates.
    pub cache: CacheConfig,
    /// If set, a file locator rooted here is registered first.
    pub asset_root: Option<PathBuf>,
}

impl AgentConfig {
    /// Parses a configuration from RON text. Missing fields take defaults.
    pub fn from_ron(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).context("Failed to parse agent configuration")?;
        config
            .cache
            .validate()
            .context("Invalid cache configuration")?;
        Ok(config)
    }

    /// Reads and parses a RON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent configuration '{}'", path.display()))?;
        Self::from_ron(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_data::CachePolicy;

    #[test]
    fn test_parse_agent_config() {
        let config = AgentConfig::from_ron(
            r#"(cache: (policy: Lru(capacity: 16)), asset_root: Some("data/assets"))"#,
        )
        .unwrap();
        assert_eq!(config.cache.policy, CachePolicy::Lru { capacity: 16 });
        assert_eq!(config.asset_root, Some(PathBuf::from("data/assets")));
    }

    #[test]
    fn test_defaults_and_validation() {
        assert_eq!(AgentConfig::from_ron("()").unwrap(), AgentConfig::default());
        assert!(AgentConfig::from_ron("(cache: (policy: Lru(capacity: 0)))").is_err());
    }
}
