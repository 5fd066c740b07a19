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

use super::codec::ByteReader;
use super::format::{FieldValue, FORMAT_VERSION, MAGIC};
use super::input::BinaryInputCapsule;
use crate::schema::SchemaRegistry;
use clockwork_core::export::{ExportError, SavableRef};
use clockwork_core::Stopwatch;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Smallest encoded field: empty name, tag, one-byte payload.
const MIN_FIELD_SIZE: usize = 4 + 1 + 1;
/// Smallest encoded object: schema index and field count.
const MIN_OBJECT_SIZE: usize = 4 + 4;

struct ParsedObject {
    schema_index: u32,
    fields: HashMap<String, FieldValue>,
}

/// A fully parsed and validated stream, before any node is built.
struct ParsedGraph {
    schemas: Vec<(String, u32)>,
    objects: Vec<ParsedObject>,
    roots: Vec<u32>,
}

impl ParsedGraph {
    fn parse(data: &[u8]) -> Result<Self, ExportError> {
        let mut r = ByteReader::new(data);

        let magic = r.take(MAGIC.len())?;
        if magic != MAGIC {
            return Err(ExportError::corrupt(format!(
                "bad magic {magic:02x?}, expected {MAGIC:02x?}"
            )));
        }
        let version = r.u8()?;
        if version != FORMAT_VERSION {
            return Err(ExportError::corrupt(format!(
                "unsupported format version {version}, expected {FORMAT_VERSION}"
            )));
        }

        let schema_count = r.count(4 + 4)?;
        let mut schemas = Vec::with_capacity(schema_count);
        for _ in 0..schema_count {
            let name = r.str()?;
            schemas.push((name, r.u32()?));
        }

        let object_count = r.count(MIN_OBJECT_SIZE)?;
        let mut objects = Vec::with_capacity(object_count);
        for handle in 0..object_count as u32 {
            r.set_handle(Some(handle));
            let schema_index = r.u32()?;
            if schema_index as usize >= schemas.len() {
                return Err(r.corrupt(format!(
                    "schema index {schema_index} out of range ({} schemas)",
                    schemas.len()
                )));
            }

            let schema = &schemas[schema_index as usize].0;

            let field_count = r
                .count(MIN_FIELD_SIZE)
                .map_err(|e| e.within(format!("field table of '{schema}'")))?;
            let mut fields = HashMap::with_capacity(field_count);
            for _ in 0..field_count {
                let name = r
                    .str()
                    .map_err(|e| e.within(format!("field name in '{schema}'")))?;
                let value = FieldValue::decode(&mut r)
                    .map_err(|e| e.within(format!("field '{name}' of '{schema}'")))?;
                let dangling = value
                    .handles()
                    .into_iter()
                    .find(|h| *h as usize >= object_count);
                if let Some(h) = dangling {
                    return Err(r.corrupt(format!(
                        "field '{name}' of '{schema}' references handle {h} of {object_count}"
                    )));
                }
                if fields.insert(name.clone(), value).is_some() {
                    return Err(r.corrupt(format!("field '{name}' of '{schema}' appears twice")));
                }
            }
            objects.push(ParsedObject {
                schema_index,
                fields,
            });
        }
        r.set_handle(None);

        let root_count = r.count(4)?;
        let mut roots = Vec::with_capacity(root_count);
        for _ in 0..root_count {
            let handle = r.u32()?;
            if handle as usize >= objects.len() {
                return Err(r.corrupt(format!("root handle {handle} out of range")));
            }
            roots.push(handle);
        }

        if r.remaining() != 0 {
            return Err(r.corrupt(format!(
                "{} trailing bytes after root table",
                r.remaining()
            )));
        }

        Ok(Self {
            schemas,
            objects,
            roots,
        })
    }
}

/// Reconstructs savable graphs from the binary container format.
///
/// Loading is all-or-nothing: the stream is parsed and validated in full,
/// every node is instantiated, and only then does each node read its
/// fields. Any failure discards everything built so far.
#[derive(Debug, Clone)]
pub struct BinaryImporter {
    registry: Arc<SchemaRegistry>,
}

impl BinaryImporter {
    /// Creates an importer resolving schemas through `registry`.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// The registry used to instantiate nodes.
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Reads a whole stream and reconstructs its roots.
    pub fn load<R: Read>(&self, mut reader: R) -> Result<Vec<SavableRef>, ExportError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| ExportError::corrupt(format!("failed to read stream: {e}")))?;
        self.load_from_slice(&data)
    }

    /// Reads a file and reconstructs its roots.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<SavableRef>, ExportError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            ExportError::corrupt(format!("failed to read '{}': {e}", path.display()))
        })?;
        self.load_from_slice(&data)
    }

    /// Reconstructs the roots of an in-memory stream.
    pub fn load_from_slice(&self, data: &[u8]) -> Result<Vec<SavableRef>, ExportError> {
        let timer = Stopwatch::new();
        let graph = ParsedGraph::parse(data)?;

        // Pass 1: build every node so any handle can be bound.
        let mut arena = Vec::with_capacity(graph.objects.len());
        for (handle, object) in graph.objects.iter().enumerate() {
            let (name, saved_version) = &graph.schemas[object.schema_index as usize];
            let node =
                self.registry
                    .instantiate(name)
                    .ok_or_else(|| ExportError::UnknownSchema {
                        schema: name.clone(),
                        handle: handle as u32,
                    })?;
            let supported = self.registry.version_of(name).unwrap_or_default();
            if *saved_version > supported {
                return Err(ExportError::UnsupportedSchemaVersion {
                    schema: name.clone(),
                    handle: handle as u32,
                    found: *saved_version,
                    supported,
                });
            }
            arena.push(node);
        }

        // Pass 2: populate.
        for (handle, object) in graph.objects.iter().enumerate() {
            let (name, saved_version) = &graph.schemas[object.schema_index as usize];
            let mut capsule = BinaryInputCapsule::new(
                name,
                handle as u32,
                *saved_version,
                &object.fields,
                &arena,
            );
            arena[handle].read_fields(&mut capsule)?;

            let unread = capsule.unread_fields();
            if !unread.is_empty() {
                log::trace!("'{name}' (handle {handle}) left fields unread: {unread:?}");
            }
        }

        let roots = graph
            .roots
            .iter()
            .map(|h| arena[*h as usize].clone())
            .collect();

        log::debug!(
            "Loaded {} objects ({} schemas, {} bytes) in {:.2}ms",
            arena.len(),
            graph.schemas.len(),
            data.len(),
            timer.elapsed_ms_f64()
        );
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn importer() -> BinaryImporter {
        BinaryImporter::new(Arc::new(SchemaRegistry::new()))
    }

    #[test]
    fn test_bad_magic_is_corrupt() {
        let result = importer().load_from_slice(b"NOPE\x01\0\0\0\0\0\0\0\0\0\0\0\0");
        match result {
            Err(ExportError::CorruptData { handle: None, detail }) => {
                assert!(detail.contains("magic"), "{detail}")
            }
            other => panic!("expected CorruptData, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_format_version_is_corrupt() {
        let mut data = MAGIC.to_vec();
        data.push(FORMAT_VERSION + 1);
        data.extend_from_slice(&[0; 12]);
        assert!(matches!(
            importer().load_from_slice(&data),
            Err(ExportError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_corrupt() {
        let mut data = MAGIC.to_vec();
        data.push(FORMAT_VERSION);
        data.extend_from_slice(&[0; 13]);
        assert!(matches!(
            importer().load_from_slice(&data),
            Err(ExportError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_empty_stream_loads_no_roots() {
        let mut data = MAGIC.to_vec();
        data.push(FORMAT_VERSION);
        data.extend_from_slice(&[0; 12]);
        assert!(importer().load_from_slice(&data).unwrap().is_empty());
    }
}
