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

use super::cache::{AssetCache, CacheConsistencyWarning, CachedAsset};
use super::tracking::PendingClones;
use clockwork_core::asset::AssetKey;
use ::lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct State {
    entries: LruCache<AssetKey, CachedAsset>,
    pending: PendingClones,
    capacity: NonZeroUsize,
}

impl State {
    /// Evicts least-recently-used entries until the cache fits its capacity.
    fn trim(&mut self) {
        while self.entries.len() > self.capacity.get() {
            let Some((key, _)) = self.entries.pop_lru() else {
                break;
            };
            if self.pending.is_pending(&key) {
                log::warn!("Evicting '{key}' while a clone decision is still pending");
            } else {
                log::trace!("Evicted '{key}'");
            }
        }
    }
}

/// A size-bounded cache holding masters strongly.
///
/// Inserting never evicts, so a freshly added master is always handed back
/// to its loader. Entries beyond the capacity are evicted least recently
/// used first on the next lookup or [`trim`](AssetCache::trim).
pub struct LruAssetCache {
    state: Mutex<State>,
}

impl LruAssetCache {
    /// Creates an empty cache keeping at most `capacity` entries after a trim.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                pending: PendingClones::default(),
                capacity,
            }),
        }
    }

    /// The configured capacity.
    pub fn capacity(&self) -> NonZeroUsize {
        self.lock().capacity
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetCache for LruAssetCache {
    fn add_to_cache(&self, key: AssetKey, asset: CachedAsset) {
        let mut state = self.lock();
        state.pending.record(&key);
        state.entries.put(key, asset);
    }

    fn get_from_cache(&self, key: &AssetKey) -> Option<CachedAsset> {
        let mut state = self.lock();
        let hit = state.entries.get(key).cloned();
        state.trim();
        let hit = hit?;
        state.pending.record(key);
        Some(hit)
    }

    fn register_asset_clone(&self, key: &AssetKey, _clone: CachedAsset) {
        self.lock().pending.settle(key);
    }

    fn notify_no_asset_clone(&self) {
        self.lock().pending.settle_all();
    }

    fn release_pending(&self, key: &AssetKey) {
        self.lock().pending.settle(key);
    }

    fn delete_from_cache(&self, key: &AssetKey) -> bool {
        let mut state = self.lock();
        state.pending.forget(key);
        state.entries.pop(key).is_some()
    }

    fn clear_cache(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.pending.clear();
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn trim(&self) {
        self.lock().trim();
    }

    fn consistency_report(&self, window: Duration) -> Vec<CacheConsistencyWarning> {
        self.lock().pending.overdue(window)
    }

    fn policy_name(&self) -> &'static str {
        "lru"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(name: &str) -> AssetKey {
        AssetKey::new(format!("levels/{name}.cwb"))
    }

    #[test]
    fn test_insert_never_evicts_but_lookup_trims() {
        let cache = LruAssetCache::new(NonZeroUsize::new(2).unwrap());
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            cache.add_to_cache(key(name), Arc::new(i));
        }
        cache.notify_no_asset_clone();
        assert_eq!(cache.len(), 3);

        // Touch "a" so "b" becomes least recently used.
        assert!(cache.get_from_cache(&key("a")).is_some());
        cache.notify_no_asset_clone();

        assert_eq!(cache.len(), 2);
        assert!(cache.get_from_cache(&key("b")).is_none());
        assert!(cache.get_from_cache(&key("c")).is_some());
        cache.notify_no_asset_clone();
    }

    #[test]
    fn test_explicit_trim() {
        let cache = LruAssetCache::new(NonZeroUsize::new(1).unwrap());
        cache.add_to_cache(key("x"), Arc::new(1u8));
        cache.add_to_cache(key("y"), Arc::new(2u8));
        cache.notify_no_asset_clone();

        cache.trim();
        assert_eq!(cache.len(), 1);
        assert!(cache.get_from_cache(&key("y")).is_some());
        assert_eq!(cache.capacity().get(), 1);
    }
}
