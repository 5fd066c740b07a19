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

use super::{Asset, AssetKey};
use std::error::Error;

/// A trait for types that can decode a specific kind of asset from raw bytes.
///
/// Implementors do the potentially CPU-intensive work of turning located
/// bytes into an engine-ready value. Each loader is specialized for a single
/// asset type `A` and is registered with the asset agent under a type name.
pub trait AssetLoader<A: Asset> {
    /// Parses `bytes`, located for `key`, into an instance of `A`.
    ///
    /// The error must be thread-safe; the agent shares it with every caller
    /// waiting on the same key.
    fn load(&self, key: &AssetKey, bytes: &[u8]) -> Result<A, Box<dyn Error + Send + Sync>>;
}
