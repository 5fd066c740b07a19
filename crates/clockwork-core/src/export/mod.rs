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

//! The persistence contract: savable nodes, their capsules and errors.
//!
//! Concrete node types implement [`Savable`]. Graphs of them are held
//! through [`Node`] and erased into [`SavableRef`] when handed to an
//! exporter or returned by an importer. The binary implementation of the
//! capsule traits lives in `clockwork-io`.

mod capsule;
mod error;
mod node;
mod savable;

pub use capsule::*;
pub use error::*;
pub use node::*;
pub use savable::*;
