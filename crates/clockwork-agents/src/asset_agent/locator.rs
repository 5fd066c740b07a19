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

//! Sources of raw asset bytes.

use anyhow::{bail, Context, Result};
use clockwork_core::asset::AssetKey;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Finds the raw bytes behind an [`AssetKey`].
///
/// `Ok(None)` means "not here", letting the agent try the next locator.
/// An `Err` aborts the load.
pub trait AssetLocator: Send + Sync {
    /// Looks up the bytes for `key`.
    fn locate(&self, key: &AssetKey) -> Result<Option<Vec<u8>>>;

    /// A short description for logs.
    fn describe(&self) -> String;
}

/// Resolves keys as paths relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
}

impl FileLocator {
    /// Creates a locator rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLocator for FileLocator {
    fn locate(&self, key: &AssetKey) -> Result<Option<Vec<u8>>> {
        if key.path().is_empty() || key.path().starts_with("..") {
            bail!("Asset path '{}' escapes the locator root", key.path());
        }
        let path = self.root.join(key.path());
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read '{}'", path.display())),
        }
    }

    fn describe(&self) -> String {
        format!("file:{}", self.root.display())
    }
}

/// Serves bytes registered in memory. Useful for embedded and generated assets.
#[derive(Debug, Default)]
pub struct MemoryLocator {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryLocator {
    /// Creates an empty locator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `bytes` for `path`. The path is normalized like an [`AssetKey`].
    pub fn insert(&self, path: impl AsRef<str>, bytes: impl Into<Vec<u8>>) {
        let path = AssetKey::new(path).path().to_owned();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, bytes.into());
    }

    /// Stops serving `path`.
    pub fn remove(&self, path: impl AsRef<str>) -> bool {
        let key = AssetKey::new(path);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key.path())
            .is_some()
    }
}

impl AssetLocator for MemoryLocator {
    fn locate(&self, key: &AssetKey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.path())
            .cloned())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
