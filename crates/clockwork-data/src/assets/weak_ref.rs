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
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Default)]
struct State {
    entries: HashMap<AssetKey, Weak<dyn Any + Send + Sync>>,
    pending: PendingClones,
}

impl State {
    fn prune(&mut self) {
        self.entries.retain(|_, weak| weak.strong_count() > 0);
    }
}

/// A cache that never keeps a master alive on its own.
///
/// An entry disappears as soon as every outside holder has dropped the value.
#[derive(Default)]
pub struct WeakRefAssetCache {
    state: Mutex<State>,
}

impl WeakRefAssetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetCache for WeakRefAssetCache {
    fn add_to_cache(&self, key: AssetKey, asset: CachedAsset) {
        let mut state = self.lock();
        state.pending.record(&key);
        state.entries.insert(key, Arc::downgrade(&asset));
    }

    fn get_from_cache(&self, key: &AssetKey) -> Option<CachedAsset> {
        let mut state = self.lock();
        match state.entries.get(key).map(Weak::upgrade) {
            Some(Some(hit)) => {
                state.pending.record(key);
                Some(hit)
            }
            Some(None) => {
                log::trace!("Weak entry '{key}' was collected");
                state.entries.remove(key);
                None
            }
            None => None,
        }
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
        state
            .entries
            .remove(key)
            .is_some_and(|weak| weak.strong_count() > 0)
    }

    fn clear_cache(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.pending.clear();
    }

    fn len(&self) -> usize {
        let mut state = self.lock();
        state.prune();
        state.entries.len()
    }

    fn trim(&self) {
        self.lock().prune();
    }

    fn consistency_report(&self, window: Duration) -> Vec<CacheConsistencyWarning> {
        self.lock().pending.overdue(window)
    }

    fn policy_name(&self) -> &'static str {
        "weak_ref"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_lives_as_long_as_an_outside_holder() {
        let cache = WeakRefAssetCache::new();
        let key = AssetKey::new("sounds/step.ogg");
        let value: CachedAsset = Arc::new(String::from("pcm"));

        cache.add_to_cache(key.clone(), value.clone());
        cache.notify_no_asset_clone();
        assert_eq!(cache.len(), 1);

        let hit = cache.get_from_cache(&key).expect("still held outside");
        cache.release_pending(&key);
        drop(hit);
        drop(value);

        assert!(cache.get_from_cache(&key).is_none());
        assert_eq!(cache.len(), 0);
    }
}
