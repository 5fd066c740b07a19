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

//! Identity resolution for one save.

use clockwork_core::export::SavableRef;
use std::collections::HashMap;

/// Maps each distinct node instance to a handle.
///
/// Handles are dense and assigned in first-visit order. Every resolved node
/// is kept alive by the table, so allocation addresses stay unique for the
/// whole save.
#[derive(Default)]
pub(crate) struct ReferenceTable {
    handles: HashMap<usize, u32>,
    nodes: Vec<SavableRef>,
    pending: Vec<u32>,
}

impl ReferenceTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `node`, assigning the next one and
    /// scheduling the node for writing on first visit.
    pub(crate) fn resolve(&mut self, node: &SavableRef) -> u32 {
        if let Some(&handle) = self.handles.get(&node.identity()) {
            return handle;
        }
        let handle = self.nodes.len() as u32;
        self.handles.insert(node.identity(), handle);
        self.nodes.push(node.clone());
        self.pending.push(handle);
        log::trace!("Assigned handle {handle} to {node:?}");
        handle
    }

    /// Pops the most recently scheduled node that has not been written yet.
    pub(crate) fn next_pending(&mut self) -> Option<(u32, SavableRef)> {
        let handle = self.pending.pop()?;
        Some((handle, self.nodes[handle as usize].clone()))
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}
