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

//! The AssetAgent is responsible for managing asset loading and retrieval.
//!
//! It turns an [`AssetKey`] into a ready asset: the cache is checked first,
//! and on a miss exactly one caller locates the bytes, decodes them and
//! populates the cache while concurrent callers for the same key wait and
//! share the outcome.

use std::any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clockwork_core::asset::{Asset, AssetHandle, AssetKey, AssetLoader, CloneableAsset};
use clockwork_data::assets::{AssetCache, CacheConsistencyWarning, CacheLease, CachedAsset};
use clockwork_data::CacheConfig;
use clockwork_io::{BinaryGraphLoader, SavableGraph, SchemaRegistry, GRAPH_EXTENSION};

use super::flight::{InFlight, Role};
use super::loader::AssetLoaderRegistry;
use super::locator::{AssetLocator, FileLocator};
use crate::config::AgentConfig;

/// A snapshot of the agent's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that missed the cache.
    pub misses: u64,
    /// Successful populations.
    pub loads: u64,
    /// Failed populations.
    pub failures: u64,
    /// Misses that waited on another caller's population.
    pub coalesced: u64,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A master obtained for one request, with or without a cache lease.
enum Fetched<'c, A: Asset> {
    /// Obtained through the cache; the lease settles the bookkeeping.
    Leased(CacheLease<'c, A>),
    /// Received from another caller's population after the entry was
    /// already gone from the cache.
    Detached(Arc<A>),
}

impl<A: Asset> Fetched<'_, A> {
    fn asset(&self) -> &Arc<A> {
        match self {
            Self::Leased(lease) => lease.asset(),
            Self::Detached(asset) => asset,
        }
    }

    fn into_shared(self) -> Arc<A> {
        match self {
            Self::Leased(lease) => lease.into_shared(),
            Self::Detached(asset) => asset,
        }
    }

    fn register_clone(self, clone: Arc<A>) {
        if let Self::Leased(lease) = self {
            lease.register_clone(clone);
        }
    }
}

/// The AssetAgent is responsible for managing asset loading and retrieval.
///
/// Configure it with locators and loaders, then share it (for example in an
/// `Arc`) between threads; every load method takes `&self`.
pub struct AssetAgent {
    cache: Arc<dyn AssetCache>,
    locators: Vec<Box<dyn AssetLocator>>,
    loaders: AssetLoaderRegistry,
    in_flight: InFlight,
    counters: Counters,
    pending_clone_window: Duration,
}

impl AssetAgent {
    /// Creates an agent over `cache` with no locators or loaders.
    pub fn new(cache: Arc<dyn AssetCache>) -> Self {
        Self {
            cache,
            locators: Vec::new(),
            loaders: AssetLoaderRegistry::new(),
            in_flight: InFlight::default(),
            counters: Counters::default(),
            pending_clone_window: CacheConfig::default().pending_clone_window(),
        }
    }

    /// Builds the cache described by `config` and, if configured, a
    /// [`FileLocator`] over the asset root.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let cache = config
            .cache
            .build()
            .context("Failed to build the asset cache")?;
        let mut agent = Self::new(cache);
        agent.pending_clone_window = config.cache.pending_clone_window();
        if let Some(root) = &config.asset_root {
            agent.register_locator(FileLocator::new(root));
        }
        Ok(agent)
    }

    /// Appends a locator. Locators are consulted in registration order.
    pub fn register_locator(&mut self, locator: impl AssetLocator + 'static) {
        log::debug!("AssetAgent: registered locator {}", locator.describe());
        self.locators.push(Box::new(locator));
    }

    /// Registers an `AssetLoader` for a specific asset type name.
    pub fn register_loader<A: Asset>(
        &mut self,
        type_name: &str,
        loader: impl AssetLoader<A> + Send + Sync + 'static,
    ) {
        self.loaders.register::<A>(type_name, loader);
    }

    /// Registers the binary graph loader for `.cwb` keys, resolving
    /// schemas through `registry`.
    pub fn register_graph_loader(&mut self, registry: Arc<SchemaRegistry>) {
        self.register_loader::<SavableGraph>(GRAPH_EXTENSION, BinaryGraphLoader::new(registry));
    }

    /// The cache backing this agent.
    pub fn cache(&self) -> &Arc<dyn AssetCache> {
        &self.cache
    }

    /// The loader registry.
    pub fn loaders(&self) -> &AssetLoaderRegistry {
        &self.loaders
    }

    /// A snapshot of the hit, miss and load counters.
    pub fn stats(&self) -> AgentStats {
        let c = &self.counters;
        AgentStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            loads: c.loads.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            coalesced: c.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Cache hand-outs pending longer than the configured window.
    pub fn check_consistency(&self) -> Vec<CacheConsistencyWarning> {
        self.cache.consistency_report(self.pending_clone_window)
    }

    /// Loads `key` and returns the shared cached master.
    pub fn load_shared<A: Asset>(&self, key: &AssetKey) -> Result<AssetHandle<A>> {
        let fetched = self.fetch::<A>(key)?;
        Ok(AssetHandle::from_arc(fetched.into_shared()))
    }

    /// Loads `key` and returns a fresh clone of the cached master,
    /// registered with the cache.
    pub fn load_cloned<A: CloneableAsset>(&self, key: &AssetKey) -> Result<AssetHandle<A>> {
        let fetched = self.fetch::<A>(key)?;
        let clone = fetched
            .asset()
            .create_clone()
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("Failed to clone asset '{key}'"))?;
        let clone = Arc::new(clone);
        fetched.register_clone(clone.clone());
        Ok(AssetHandle::from_arc(clone))
    }

    fn fetch<A: Asset>(&self, key: &AssetKey) -> Result<Fetched<'_, A>> {
        let cache = self.cache.as_ref();
        if let Some(lease) = cache.acquire::<A>(key) {
            Counters::bump(&self.counters.hits);
            log::trace!("AssetAgent: cache hit for '{key}'");
            return Ok(Fetched::Leased(lease));
        }
        Counters::bump(&self.counters.misses);

        match self.in_flight.join(key) {
            Role::Leader(guard) => {
                // A population may have finished between the miss and the join.
                if let Some(lease) = cache.acquire::<A>(key) {
                    guard.complete(Ok(lease.asset().clone() as CachedAsset));
                    return Ok(Fetched::Leased(lease));
                }
                match self.populate::<A>(key) {
                    Ok(asset) => {
                        Counters::bump(&self.counters.loads);
                        let lease = cache.insert(key.clone(), asset);
                        guard.complete(Ok(lease.asset().clone() as CachedAsset));
                        Ok(Fetched::Leased(lease))
                    }
                    Err(e) => {
                        Counters::bump(&self.counters.failures);
                        guard.complete(Err(format!("{e:#}").into()));
                        Err(e)
                    }
                }
            }
            Role::Follower(flight) => {
                Counters::bump(&self.counters.coalesced);
                log::trace!("AssetAgent: waiting on the in-flight load of '{key}'");
                let erased = flight
                    .wait()
                    .map_err(|message| anyhow!("{message}"))
                    .with_context(|| format!("Shared load of '{key}' failed"))?;
                if let Some(lease) = cache.acquire::<A>(key) {
                    return Ok(Fetched::Leased(lease));
                }
                let asset = erased.downcast::<A>().map_err(|_| {
                    anyhow!(
                        "Asset '{}' was loaded as a different type than {}",
                        key,
                        any::type_name::<A>()
                    )
                })?;
                Ok(Fetched::Detached(asset))
            }
        }
    }

    /// Locates and decodes `key`. Runs at most once per key at a time.
    fn populate<A: Asset>(&self, key: &AssetKey) -> Result<Arc<A>> {
        let bytes = self.locate(key)?;
        let asset: A = self
            .loaders
            .load::<A>(key, &bytes)
            .with_context(|| format!("Failed to decode asset '{key}'"))?;
        log::debug!("AssetAgent: populated '{key}' ({} bytes)", bytes.len());
        Ok(Arc::new(asset))
    }

    fn locate(&self, key: &AssetKey) -> Result<Vec<u8>> {
        for locator in &self.locators {
            let found = locator
                .locate(key)
                .with_context(|| format!("Locator {} failed for '{key}'", locator.describe()))?;
            if let Some(bytes) = found {
                return Ok(bytes);
            }
        }
        Err(anyhow!(
            "Asset '{}' not found by any of {} locators",
            key,
            self.locators.len()
        ))
    }
}
