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

//! Asset identity and the contracts loaders and cached values fulfil.

mod handle;
mod key;
mod loader;

pub use handle::*;
pub use key::*;
pub use loader::*;

use std::error::Error;

/// A marker trait for types that can be loaded and cached as assets.
pub trait Asset: Send + Sync + 'static {}

/// An asset whose cached master is never handed out directly.
///
/// Callers receive independent copies made by [`CloneableAsset::create_clone`],
/// and the cache tracks those copies to decide when the master may go.
pub trait CloneableAsset: Asset + Sized {
    /// Produces an independent copy whose lifetime is decoupled from the master.
    fn create_clone(&self) -> Result<Self, Box<dyn Error + Send + Sync>>;
}
