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

//! Defines the value-equal identifier used to request and cache assets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifies a loadable resource together with the parameters it is loaded with.
///
/// Two keys that compare equal always refer to the same cache entry, so the
/// path is normalized on construction: separators become `/`, empty and `.`
/// segments are dropped and `..` cancels the preceding segment.
/// Parameters are kept sorted so insertion order never affects equality.
/// Deserialized keys go through the same normalization as [`AssetKey::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawAssetKey")]
pub struct AssetKey {
    path: String,
    asset_type: String,
    params: BTreeMap<String, String>,
}

impl AssetKey {
    /// Creates a key for `path`, typed by its lower-cased file extension.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = normalize_path(path.as_ref());
        let asset_type = extension_of(&path)
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            path,
            asset_type,
            params: BTreeMap::new(),
        }
    }

    /// Overrides the asset type used to pick a loader.
    pub fn with_type(mut self, asset_type: impl Into<String>) -> Self {
        self.asset_type = asset_type.into();
        self
    }

    /// Adds (or replaces) a load parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// The normalized path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The asset type name, e.g. `"cwb"` or `"texture"`.
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// All load parameters, sorted by name.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Looks up a single load parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The file extension of the path, as written.
    pub fn extension(&self) -> Option<&str> {
        extension_of(&self.path)
    }

    /// The directory part of the path, with a trailing `/`, or `""`.
    pub fn folder(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[..=idx],
            None => "",
        }
    }

    /// The last path segment.
    pub fn file_name(&self) -> &str {
        match self.path.rfind('/') {
            Some(idx) => &self.path[idx + 1..],
            None => &self.path,
        }
    }
}

/// The serialized form of an [`AssetKey`]. An empty or missing type falls
/// back to the extension.
#[derive(Deserialize)]
struct RawAssetKey {
    path: String,
    #[serde(default)]
    asset_type: String,
    #[serde(default)]
    params: BTreeMap<String, String>,
}

impl From<RawAssetKey> for AssetKey {
    fn from(raw: RawAssetKey) -> Self {
        let mut key = AssetKey::new(raw.path);
        if !raw.asset_type.is_empty() {
            key.asset_type = raw.asset_type;
        }
        key.params = raw.params;
        key
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if !self.params.is_empty() {
            let joined: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            write!(f, "{{{}}}", joined.join(","))?;
        }
        Ok(())
    }
}

fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
        _ => None,
    }
}

fn normalize_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }
    segments.join("/")
}
