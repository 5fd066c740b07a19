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

use super::codec::{self, LengthOverflow};
use super::format::{FieldValue, FORMAT_VERSION, MAGIC};
use super::importer::BinaryImporter;
use super::output::BinaryOutputCapsule;
use super::resolver::ReferenceTable;
use clockwork_core::export::{ExportError, SavableRef};
use clockwork_core::Stopwatch;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// The schema table of one save, in first-use order.
#[derive(Default)]
struct SchemaTable {
    index: HashMap<&'static str, u32>,
    entries: Vec<(&'static str, u32)>,
}

impl SchemaTable {
    fn intern(&mut self, name: &'static str, version: u32) -> Result<u32, ExportError> {
        if let Some(&idx) = self.index.get(name) {
            let recorded = self.entries[idx as usize].1;
            if recorded != version {
                return Err(ExportError::SchemaConflict {
                    schema: name.to_owned(),
                    first: recorded,
                    second: version,
                });
            }
            return Ok(idx);
        }
        let idx = self.entries.len() as u32;
        self.index.insert(name, idx);
        self.entries.push((name, version));
        Ok(idx)
    }
}

/// A container-level length (not tied to one node's field) that does not
/// fit its `u32` prefix.
fn oversized(what: &str, overflow: LengthOverflow) -> ExportError {
    ExportError::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{what} length {} does not fit a u32 prefix", overflow.0),
    ))
}

struct ObjectRecord {
    schema_index: u32,
    fields: Vec<(String, FieldValue)>,
}

/// Writes savable graphs in the binary container format.
///
/// Output is a pure function of the graph and the nodes' write order, so
/// saving the same graph twice yields identical bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryExporter;

impl BinaryExporter {
    /// Creates an exporter.
    pub fn new() -> Self {
        Self
    }

    /// Serializes the graph reachable from `roots` into `writer`.
    pub fn save<W: Write>(&self, roots: &[SavableRef], mut writer: W) -> Result<(), ExportError> {
        let bytes = self.save_to_vec(roots)?;
        writer.write_all(&bytes)?;
        writer.flush()?;
        Ok(())
    }

    /// Serializes the graph reachable from `roots` into a new buffer.
    pub fn save_to_vec(&self, roots: &[SavableRef]) -> Result<Vec<u8>, ExportError> {
        let timer = Stopwatch::new();
        let mut table = ReferenceTable::new();
        let mut schemas = SchemaTable::default();
        let mut records: Vec<Option<ObjectRecord>> = Vec::new();
        let mut root_handles = Vec::with_capacity(roots.len());

        for root in roots {
            root_handles.push(table.resolve(root));

            while let Some((handle, node)) = table.next_pending() {
                let schema_index = schemas.intern(node.schema_name(), node.schema_version())?;
                let mut capsule = BinaryOutputCapsule::new(node.schema_name(), handle, &mut table);
                node.write_fields(&mut capsule)?;
                let fields = capsule.into_fields();

                let slot = handle as usize;
                if records.len() <= slot {
                    records.resize_with(slot + 1, || None);
                }
                records[slot] = Some(ObjectRecord {
                    schema_index,
                    fields,
                });
            }
        }

        let records: Vec<ObjectRecord> = records
            .into_iter()
            .enumerate()
            .map(|(h, r)| {
                r.ok_or_else(|| ExportError::corrupt(format!("handle {h} was never written")))
            })
            .collect::<Result<_, _>>()?;

        let mut buf = Vec::new();
        buf.extend_from_slice(&MAGIC);
        codec::put_u8(&mut buf, FORMAT_VERSION);

        codec::put_len(&mut buf, schemas.entries.len())
            .map_err(|e| oversized("schema table", e))?;
        for (name, version) in &schemas.entries {
            codec::put_str(&mut buf, name).map_err(|e| oversized("schema name", e))?;
            codec::put_u32(&mut buf, *version);
        }

        codec::put_len(&mut buf, records.len()).map_err(|e| oversized("object table", e))?;
        for (handle, record) in records.iter().enumerate() {
            let schema = schemas.entries[record.schema_index as usize].0;
            let handle = handle as u32;
            codec::put_u32(&mut buf, record.schema_index);
            codec::put_len(&mut buf, record.fields.len())
                .map_err(|e| e.invalid(schema, handle, "<field table>"))?;
            for (name, value) in &record.fields {
                codec::put_str(&mut buf, name)
                    .and_then(|()| value.encode(&mut buf))
                    .map_err(|e| e.invalid(schema, handle, name))?;
            }
        }

        codec::put_len(&mut buf, root_handles.len())
            .map_err(|e| oversized("root table", e))?;
        for handle in &root_handles {
            codec::put_u32(&mut buf, *handle);
        }

        log::debug!(
            "Saved {} objects from {} roots ({} schemas, {} bytes) in {:.2}ms",
            table.len(),
            root_handles.len(),
            schemas.entries.len(),
            buf.len(),
            timer.elapsed_ms_f64()
        );
        Ok(buf)
    }

    /// Serializes the graph into a file, replacing any existing content.
    pub fn save_to_file(
        &self,
        roots: &[SavableRef],
        path: impl AsRef<Path>,
    ) -> Result<(), ExportError> {
        let file = File::create(path.as_ref())?;
        self.save(roots, BufWriter::new(file))
    }

    /// Deep-copies a graph by saving it and loading it back.
    ///
    /// Every node type in the graph must be registered with the importer.
    pub fn save_and_load(
        &self,
        roots: &[SavableRef],
        importer: &BinaryImporter,
    ) -> Result<Vec<SavableRef>, ExportError> {
        let bytes = self.save_to_vec(roots)?;
        importer.load_from_slice(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph_has_header_and_empty_tables() {
        let bytes = BinaryExporter::new().save_to_vec(&[]).unwrap();
        let mut expected = MAGIC.to_vec();
        expected.push(FORMAT_VERSION);
        expected.extend_from_slice(&[0; 12]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_schema_table_rejects_conflicting_versions() {
        let mut table = SchemaTable::default();
        assert_eq!(table.intern("Bone", 1).unwrap(), 0);
        assert_eq!(table.intern("Skin", 0).unwrap(), 1);
        assert_eq!(table.intern("Bone", 1).unwrap(), 0);
        assert!(matches!(
            table.intern("Bone", 2),
            Err(ExportError::SchemaConflict { first: 1, second: 2, .. })
        ));
    }
}
