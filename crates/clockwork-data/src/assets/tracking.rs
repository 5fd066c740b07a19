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

//! Per-thread bookkeeping of cache hands-outs awaiting a clone decision.

use super::cache::CacheConsistencyWarning;
use clockwork_core::asset::AssetKey;
use std::collections::HashMap;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

struct PendingEntry {
    key: AssetKey,
    since: Instant,
}

/// Keys handed out by a cache that still wait for `register_asset_clone`
/// or a no-clone notification, grouped by the thread that received them.
///
/// Not synchronized on its own: every cache keeps it behind the same lock
/// as its entries.
#[derive(Default)]
pub(crate) struct PendingClones {
    by_thread: HashMap<ThreadId, Vec<PendingEntry>>,
}

impl PendingClones {
    /// Records one hand-out of `key` to the current thread.
    pub(crate) fn record(&mut self, key: &AssetKey) {
        self.by_thread
            .entry(thread::current().id())
            .or_default()
            .push(PendingEntry {
                key: key.clone(),
                since: Instant::now(),
            });
    }

    /// Settles the oldest hand-out of `key` on the current thread.
    /// Returns `false` if none was pending.
    pub(crate) fn settle(&mut self, key: &AssetKey) -> bool {
        let id = thread::current().id();
        let Some(entries) = self.by_thread.get_mut(&id) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|e| &e.key == key) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            self.by_thread.remove(&id);
        }
        true
    }

    /// Settles everything pending on the current thread, returning the keys.
    pub(crate) fn settle_all(&mut self) -> Vec<AssetKey> {
        self.by_thread
            .remove(&thread::current().id())
            .map(|entries| entries.into_iter().map(|e| e.key).collect())
            .unwrap_or_default()
    }

    /// Drops every pending hand-out of `key`, on any thread.
    pub(crate) fn forget(&mut self, key: &AssetKey) {
        self.by_thread.retain(|_, entries| {
            entries.retain(|e| &e.key != key);
            !entries.is_empty()
        });
    }

    pub(crate) fn clear(&mut self) {
        self.by_thread.clear();
    }

    /// Returns `true` if any thread still owes a decision for `key`.
    pub(crate) fn is_pending(&self, key: &AssetKey) -> bool {
        self.by_thread
            .values()
            .any(|entries| entries.iter().any(|e| &e.key == key))
    }

    /// Every hand-out pending for longer than `window`, oldest first.
    pub(crate) fn overdue(&self, window: Duration) -> Vec<CacheConsistencyWarning> {
        let now = Instant::now();
        let mut warnings: Vec<CacheConsistencyWarning> = self
            .by_thread
            .iter()
            .flat_map(|(thread, entries)| {
                entries
                    .iter()
                    .map(move |e| (thread, e, now.saturating_duration_since(e.since)))
            })
            .filter(|(_, _, age)| *age > window)
            .map(|(thread, e, age)| CacheConsistencyWarning {
                key: e.key.clone(),
                thread: *thread,
                pending_for: age,
            })
            .collect();
        warnings.sort_by(|a, b| b.pending_for.cmp(&a.pending_for));
        for warning in &warnings {
            log::warn!("{warning}");
        }
        warnings
    }
}
