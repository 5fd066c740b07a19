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

//! A registry for asset loaders, enabling dynamic loading of different asset types by name.

use anyhow::{anyhow, Result};
use clockwork_core::asset::{Asset, AssetKey, AssetLoader};
use clockwork_core::Stopwatch;
use std::any::{self, Any};
use std::collections::HashMap;
use std::marker::PhantomData;

/// Internal trait for loading any asset type.
trait AnyAssetLoader: Send + Sync {
    fn load_any(&self, key: &AssetKey, bytes: &[u8]) -> Result<Box<dyn Any + Send>>;

    fn output_type(&self) -> &'static str;
}

/// Adapts a typed [`AssetLoader<A>`] to [`AnyAssetLoader`].
struct AssetLoaderWrapper<A: Asset, L: AssetLoader<A>>(L, PhantomData<fn() -> A>);

impl<A: Asset, L: AssetLoader<A> + Send + Sync> AnyAssetLoader for AssetLoaderWrapper<A, L> {
    fn load_any(&self, key: &AssetKey, bytes: &[u8]) -> Result<Box<dyn Any + Send>> {
        let timer = Stopwatch::new();
        let asset: A = self.0.load(key, bytes).map_err(|e| anyhow!(e))?;
        log::debug!(
            "Decoded '{}' as {} ({} bytes) in {:.2}ms",
            key,
            any::type_name::<A>(),
            bytes.len(),
            timer.elapsed_ms_f64()
        );
        Ok(Box::new(asset))
    }

    fn output_type(&self) -> &'static str {
        any::type_name::<A>()
    }
}

/// Maps asset type names (see [`AssetKey::asset_type`]) to loaders.
#[derive(Default)]
pub struct AssetLoaderRegistry {
    loaders: HashMap<String, Box<dyn AnyAssetLoader>>,
}

impl AssetLoaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` for keys whose asset type is `type_name`,
    /// replacing any earlier loader for that name.
    pub fn register<A: Asset>(
        &mut self,
        type_name: &str,
        loader: impl AssetLoader<A> + Send + Sync + 'static,
    ) {
        let wrapped = AssetLoaderWrapper(loader, PhantomData);
        if self
            .loaders
            .insert(type_name.to_string(), Box::new(wrapped))
            .is_some()
        {
            log::warn!("Replaced the loader registered for asset type '{type_name}'");
        }
    }

    /// Returns `true` if a loader handles `type_name`.
    pub fn contains(&self, type_name: &str) -> bool {
        self.loaders.contains_key(type_name)
    }

    /// Number of registered loaders.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Returns `true` if no loader is registered.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Decodes `bytes` with the loader registered for `key`'s asset type.
    pub fn load<A: Asset>(&self, key: &AssetKey, bytes: &[u8]) -> Result<A> {
        let type_name = key.asset_type();
        let loader = self
            .loaders
            .get(type_name)
            .ok_or_else(|| anyhow!("No loader registered for asset type '{}'", type_name))?;

        let asset_any = loader.load_any(key, bytes)?;

        let asset_boxed = asset_any.downcast::<A>().map_err(|_| {
            anyhow!(
                "Loader for type '{}' produces {}, not the requested {}",
                type_name,
                loader.output_type(),
                any::type_name::<A>()
            )
        })?;

        Ok(*asset_boxed)
    }
}
