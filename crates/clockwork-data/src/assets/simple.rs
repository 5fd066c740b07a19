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
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct State {
    entries: HashMap<AssetKey, CachedAsset>,
    pending: PendingClones,
}

/// A cache holding every master strongly until it is deleted or cleared.
#[derive(Default)]
pub struct SimpleAssetCache {
    state: Mutex<State>,
}

impl SimpleAssetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetCache for SimpleAssetCache {
    fn add_to_cache(&self, key: AssetKey, asset: CachedAsset) {
        let mut state = self.lock();
        state.pending.record(&key);
        state.entries.insert(key, asset);
    }

    fn get_from_cache(&self, key: &AssetKey) -> Option<CachedAsset> {
        let mut state = self.lock();
        let hit = state.entries.get(key).cloned()?;
        state.pending.record(key);
        Some(hit)
    }

    fn register_asset_clone(&self, key: &AssetKey, _clone: CachedAsset) {
        if !self.lock().pending.settle(key) {
            log::trace!("Clone of '{key}' registered without a pending hand-out");
        }
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
        state.entries.remove(key).is_some()
    }

    fn clear_cache(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.pending.clear();
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }

    fn consistency_report(&self, window: Duration) -> Vec<CacheConsistencyWarning> {
        self.lock().pending.overdue(window)
    }

    fn policy_name(&self) -> &'static str {
        "simple"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_get_delete() {
        let cache = SimpleAssetCache::new();
        let key = AssetKey::new("textures/stone.png");

        cache.add_to_cache(key.clone(), Arc::new(7u32));
        cache.notify_no_asset_clone();

        let hit = cache.get_from_cache(&key).expect("cached");
        assert_eq!(hit.downcast_ref::<u32>(), Some(&7));
        cache.release_pending(&key);

        assert_eq!(cache.len(), 1);
        assert!(cache.delete_from_cache(&key));
        assert!(!cache.delete_from_cache(&key));
        assert!(cache.get_from_cache(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unsettled_hand_out_shows_in_report() {
        let cache = SimpleAssetCache::new();
        let key = AssetKey::new("models/tree.cwb");
        cache.add_to_cache(key.clone(), Arc::new(()));

        std::thread::sleep(Duration::from_millis(5));
        let warnings = cache.consistency_report(Duration::from_millis(1));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, key);

        cache.register_asset_clone(&key, Arc::new(()));
        assert!(cache.consistency_report(Duration::ZERO).is_empty());
    }

    #[test]
    fn test_clear_drops_pending_bookkeeping() {
        let cache = SimpleAssetCache::new();
        let key = AssetKey::new("a.cwb");
        cache.add_to_cache(key.clone(), Arc::new(1u8));
        cache.clear_cache();

        assert!(cache.get_from_cache(&key).is_none());
        assert!(cache.consistency_report(Duration::ZERO).is_empty());
    }
}
