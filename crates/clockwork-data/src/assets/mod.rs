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

//! Shared, thread-safe storage for loaded assets and their clones.
//!
//! Every policy implements [`AssetCache`]. Pick one directly or through
//! [`CacheConfig`](crate::config::CacheConfig).

mod bounded;
mod cache;
mod simple;
mod tracking;
mod weak_clone;
mod weak_ref;

pub use bounded::LruAssetCache;
pub use cache::{AssetCache, CacheConsistencyWarning, CacheLease, CachedAsset};
pub use simple::SimpleAssetCache;
pub use weak_clone::WeakRefCloneAssetCache;
pub use weak_ref::WeakRefAssetCache;
