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

//! Savable graphs as cacheable assets.

use crate::binary::{BinaryExporter, BinaryImporter};
use crate::schema::SchemaRegistry;
use clockwork_core::asset::{Asset, AssetKey, AssetLoader, CloneableAsset};
use clockwork_core::export::{Node, Savable, SavableRef};
use std::error::Error;
use std::sync::Arc;

/// The file extension, and so the asset type name, of binary graphs.
pub const GRAPH_EXTENSION: &str = "cwb";

/// A loaded savable graph: its roots and the registry that built them.
#[derive(Debug, Clone)]
pub struct SavableGraph {
    roots: Vec<SavableRef>,
    registry: Arc<SchemaRegistry>,
}

impl SavableGraph {
    /// Wraps `roots`. `registry` must know every schema in the graph so
    /// that it can be deep-copied.
    pub fn new(roots: Vec<SavableRef>, registry: Arc<SchemaRegistry>) -> Self {
        Self { roots, registry }
    }

    /// The graph's roots, in save order.
    pub fn roots(&self) -> &[SavableRef] {
        &self.roots
    }

    /// The root at `index`, downcast to `T`.
    pub fn root_as<T: Savable>(&self, index: usize) -> Option<Node<T>> {
        self.roots.get(index).and_then(SavableRef::downcast::<T>)
    }

    /// Number of roots.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Returns `true` if the graph has no roots.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Consumes the graph, returning its roots.
    pub fn into_roots(self) -> Vec<SavableRef> {
        self.roots
    }
}

impl Asset for SavableGraph {}

impl CloneableAsset for SavableGraph {
    /// Deep-copies the graph through a save/load round trip, so the clone
    /// shares no node with the master.
    fn create_clone(&self) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let importer = BinaryImporter::new(self.registry.clone());
        let roots = BinaryExporter::new().save_and_load(&self.roots, &importer)?;
        Ok(Self::new(roots, self.registry.clone()))
    }
}

/// Decodes [`SavableGraph`]s from the binary container format.
#[derive(Debug, Clone)]
pub struct BinaryGraphLoader {
    importer: BinaryImporter,
}

impl BinaryGraphLoader {
    /// Creates a loader resolving schemas through `registry`.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            importer: BinaryImporter::new(registry),
        }
    }
}

impl AssetLoader<SavableGraph> for BinaryGraphLoader {
    fn load(
        &self,
        key: &AssetKey,
        bytes: &[u8],
    ) -> Result<SavableGraph, Box<dyn Error + Send + Sync>> {
        let roots = self.importer.load_from_slice(bytes)?;
        log::debug!("Decoded graph '{}' with {} roots", key, roots.len());
        Ok(SavableGraph::new(roots, self.importer.registry().clone()))
    }
}
