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

//! Defines the error type shared by every save and load operation.

use std::fmt;
use std::io;
use thiserror::Error;

/// An error raised while exporting or importing a savable graph.
///
/// Import errors are never recovered locally: any of them aborts the whole
/// load and no partially built graph escapes to the caller.
#[derive(Debug, Error)]
pub enum ExportError {
    /// A field's on-disk type tag does not match what the reader asked for.
    #[error("malformed field '{field}' in '{schema}' (handle {handle}): expected {expected}, found {found}")]
    MalformedData {
        /// Schema of the node being read.
        schema: String,
        /// Handle of the node being read.
        handle: u32,
        /// Name of the offending field.
        field: String,
        /// What the reader expected.
        expected: String,
        /// What the stream contained.
        found: String,
    },
    /// The handle table names a schema with no registered factory.
    #[error("unknown schema '{schema}' for handle {handle}")]
    UnknownSchema {
        /// The unregistered schema name.
        schema: String,
        /// The handle that referenced it.
        handle: u32,
    },
    /// The stream is truncated or structurally invalid.
    #[error("corrupt data{}: {detail}", handle_suffix(.handle))]
    CorruptData {
        /// The object being decoded when the problem surfaced, if any.
        handle: Option<u32>,
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The stream was written by a newer version of a schema than the
    /// registered type understands.
    #[error("schema '{schema}' (handle {handle}) saved at version {found}, but only versions up to {supported} are supported")]
    UnsupportedSchemaVersion {
        /// The schema name.
        schema: String,
        /// The first object saved with that version.
        handle: u32,
        /// Version recorded in the stream.
        found: u32,
        /// Highest version the registered type reads.
        supported: u32,
    },
    /// Two node types in one save claim the same schema name with different versions.
    #[error("schema '{schema}' declared with versions {first} and {second}")]
    SchemaConflict {
        /// The contested schema name.
        schema: String,
        /// Version seen first.
        first: u32,
        /// Conflicting version seen later.
        second: u32,
    },
    /// A node's own write or read logic rejected a value.
    #[error("invalid value for field '{field}' in '{schema}' (handle {handle}): {message}")]
    InvalidValue {
        /// Schema of the node.
        schema: String,
        /// Handle of the node.
        handle: u32,
        /// Name of the field.
        field: String,
        /// Explanation.
        message: String,
    },
    /// A node's lock was poisoned by a panic in another thread.
    #[error("node of schema '{schema}' is poisoned")]
    Poisoned {
        /// Schema of the poisoned node.
        schema: &'static str,
    },
    /// Writing the output stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn handle_suffix(handle: &Option<u32>) -> String {
    match handle {
        Some(h) => format!(" at handle {h}"),
        None => String::new(),
    }
}

impl ExportError {
    /// Shorthand for a [`ExportError::CorruptData`] that is not tied to one object.
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::CorruptData {
            handle: None,
            detail: detail.into(),
        }
    }

    /// Prefixes the detail of a [`ExportError::CorruptData`] with where in the
    /// stream it surfaced, such as the field and schema being decoded.
    /// Other variants already carry their context and are returned unchanged.
    pub fn within(self, context: impl fmt::Display) -> Self {
        match self {
            Self::CorruptData { handle, detail } => Self::CorruptData {
                handle,
                detail: format!("{context}: {detail}"),
            },
            other => other,
        }
    }
}
