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

//! The cache contract shared by every eviction policy.

use clockwork_core::asset::{Asset, AssetKey};
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

/// A type-erased cached value.
pub type CachedAsset = Arc<dyn Any + Send + Sync>;

/// A thread-safe key to value store with clone tracking.
///
/// Every successful [`add_to_cache`](AssetCache::add_to_cache) or cache hit
/// leaves the key *pending* for the calling thread. The caller settles it
/// with exactly one [`register_asset_clone`](AssetCache::register_asset_clone)
/// or no-clone notification. Policies use registered clones to decide when
/// a master may be collected.
///
/// Entries may disappear at any time, depending on the policy. Callers must
/// treat a miss as a normal outcome.
pub trait AssetCache: Send + Sync {
    /// Stores `asset` under `key`, replacing any previous entry, and marks
    /// the key pending for the current thread.
    fn add_to_cache(&self, key: AssetKey, asset: CachedAsset);

    /// Looks up `key`. A hit marks the key pending for the current thread.
    fn get_from_cache(&self, key: &AssetKey) -> Option<CachedAsset>;

    /// Records `clone` as made from the master under `key` and settles one
    /// pending hand-out of `key` on the current thread.
    fn register_asset_clone(&self, key: &AssetKey, clone: CachedAsset);

    /// Settles every hand-out pending on the current thread without a clone.
    fn notify_no_asset_clone(&self);

    /// Settles one pending hand-out of `key` on the current thread without
    /// a clone.
    fn release_pending(&self, key: &AssetKey);

    /// Removes `key`. Returns `true` if an entry was present.
    fn delete_from_cache(&self, key: &AssetKey) -> bool;

    /// Removes every entry and all pending bookkeeping.
    fn clear_cache(&self);

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if there are no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies deferred eviction now.
    fn trim(&self) {}

    /// Hand-outs pending for longer than `window`. Each is also logged.
    fn consistency_report(&self, window: Duration) -> Vec<CacheConsistencyWarning>;

    /// Short policy name for diagnostics.
    fn policy_name(&self) -> &'static str;
}

impl dyn AssetCache + '_ {
    /// Looks up `key` as an `A` and wraps the hit in a lease.
    ///
    /// A value of another type counts as a miss.
    pub fn acquire<A: Asset>(&self, key: &AssetKey) -> Option<CacheLease<'_, A>> {
        let erased = self.get_from_cache(key)?;
        match erased.downcast::<A>() {
            Ok(asset) => Some(CacheLease::new(self, key.clone(), asset)),
            Err(_) => {
                log::warn!(
                    "Cached value for '{}' is not a {}",
                    key,
                    std::any::type_name::<A>()
                );
                self.release_pending(key);
                None
            }
        }
    }

    /// Stores `asset` under `key` and returns a lease on it.
    pub fn insert<A: Asset>(&self, key: AssetKey, asset: Arc<A>) -> CacheLease<'_, A> {
        self.add_to_cache(key.clone(), asset.clone());
        CacheLease::new(self, key, asset)
    }
}

/// A scoped hand-out of a cached master.
///
/// Settles the pending bookkeeping exactly once: through
/// [`register_clone`](CacheLease::register_clone), or with a no-clone
/// notification for its key when dropped.
pub struct CacheLease<'c, A: Asset> {
    cache: &'c dyn AssetCache,
    key: AssetKey,
    asset: Arc<A>,
    settled: bool,
}

impl<'c, A: Asset> CacheLease<'c, A> {
    fn new(cache: &'c dyn AssetCache, key: AssetKey, asset: Arc<A>) -> Self {
        Self {
            cache,
            key,
            asset,
            settled: false,
        }
    }

    /// The key this lease was taken for.
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    /// The cached master.
    pub fn asset(&self) -> &Arc<A> {
        &self.asset
    }

    /// Registers `clone` with the cache and settles the lease.
    pub fn register_clone(mut self, clone: Arc<A>) {
        self.cache.register_asset_clone(&self.key, clone);
        self.settled = true;
    }

    /// Settles the lease without a clone and returns the master.
    pub fn into_shared(mut self) -> Arc<A> {
        self.cache.release_pending(&self.key);
        self.settled = true;
        self.asset.clone()
    }
}

impl<A: Asset> Deref for CacheLease<'_, A> {
    type Target = A;

    fn deref(&self) -> &A {
        &self.asset
    }
}

impl<A: Asset> Drop for CacheLease<'_, A> {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.release_pending(&self.key);
        }
    }
}

/// A hand-out still waiting for a clone decision past the allowed window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConsistencyWarning {
    /// The pending key.
    pub key: AssetKey,
    /// The thread that received the hand-out.
    pub thread: ThreadId,
    /// How long it has been pending.
    pub pending_for: Duration,
}

impl fmt::Display for CacheConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset '{}' handed to {:?} has waited {}ms for a clone registration",
            self.key,
            self.thread,
            self.pending_for.as_millis()
        )
    }
}
