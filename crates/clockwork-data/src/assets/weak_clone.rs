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

struct CloneEntry {
    master: CachedAsset,
    clones: Vec<Weak<dyn Any + Send + Sync>>,
}

#[derive(Default)]
struct State {
    entries: HashMap<AssetKey, CloneEntry>,
    pending: PendingClones,
}

impl State {
    /// Drops every master with no live clone and no pending hand-out.
    fn sweep(&mut self) {
        let State { entries, pending } = self;
        entries.retain(|key, entry| {
            entry.clones.retain(|clone| clone.strong_count() > 0);
            let keep = !entry.clones.is_empty() || pending.is_pending(key);
            if !keep {
                log::trace!("Collecting master '{key}': no live clones");
            }
            keep
        });
    }
}

/// A cache for assets handed out only as clones.
///
/// The master is held strongly while at least one registered clone is alive
/// or a hand-out is still pending. Once the last clone is gone and nothing is
/// pending, the master is collected on the next sweep.
#[derive(Default)]
pub struct WeakRefCloneAssetCache {
    state: Mutex<State>,
}

impl WeakRefCloneAssetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetCache for WeakRefCloneAssetCache {
    fn add_to_cache(&self, key: AssetKey, master: CachedAsset) {
        let mut state = self.lock();
        state.pending.record(&key);
        state.entries.insert(
            key,
            CloneEntry {
                master,
                clones: Vec::new(),
            },
        );
    }

    fn get_from_cache(&self, key: &AssetKey) -> Option<CachedAsset> {
        let mut state = self.lock();
        state.sweep();
        let hit = state.entries.get(key).map(|e| e.master.clone())?;
        state.pending.record(key);
        Some(hit)
    }

    fn register_asset_clone(&self, key: &AssetKey, clone: CachedAsset) {
        let mut state = self.lock();
        state.pending.settle(key);
        match state.entries.get_mut(key) {
            Some(entry) => entry.clones.push(Arc::downgrade(&clone)),
            None => log::trace!("Clone of '{key}' registered after its master was evicted"),
        }
    }

    fn notify_no_asset_clone(&self) {
        let mut state = self.lock();
        state.pending.settle_all();
        state.sweep();
    }

    fn release_pending(&self, key: &AssetKey) {
        let mut state = self.lock();
        state.pending.settle(key);
        state.sweep();
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
        let mut state = self.lock();
        state.sweep();
        state.entries.len()
    }

    fn trim(&self) {
        self.lock().sweep();
    }

    fn consistency_report(&self, window: Duration) -> Vec<CacheConsistencyWarning> {
        self.lock().pending.overdue(window)
    }

    fn policy_name(&self) -> &'static str {
        "weak_ref_clone"
    }
}
