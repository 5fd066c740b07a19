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

//! # Clockwork IO
//!
//! Persistence for savable object graphs. The [`BinaryExporter`] walks a
//! graph from its roots, writes every distinct node once and refers to it
//! by handle thereafter; the [`BinaryImporter`] rebuilds the same shape,
//! shared references and cycles included, through a [`SchemaRegistry`].

#![warn(missing_docs)]

pub mod binary;
pub mod graph;
pub mod schema;

pub use binary::{BinaryExporter, BinaryImporter};
pub use graph::{BinaryGraphLoader, SavableGraph, GRAPH_EXTENSION};
pub use schema::{SchemaFactory, SchemaRegistry};
