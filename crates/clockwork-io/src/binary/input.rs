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

use super::format::{FieldKind, FieldValue};
use clockwork_core::export::{ExportError, InputCapsule, SavableRef};
use std::collections::{HashMap, HashSet};

/// The read context for one node during a load.
///
/// Bound to the node's parsed field map and to the arena of instantiated
/// nodes, so handles resolve to the same instance no matter how often or
/// in which order they are read.
pub(crate) struct BinaryInputCapsule<'a> {
    schema: &'a str,
    handle: u32,
    version: u32,
    fields: &'a HashMap<String, FieldValue>,
    arena: &'a [SavableRef],
    consumed: HashSet<&'a str>,
}

impl<'a> BinaryInputCapsule<'a> {
    pub(crate) fn new(
        schema: &'a str,
        handle: u32,
        version: u32,
        fields: &'a HashMap<String, FieldValue>,
        arena: &'a [SavableRef],
    ) -> Self {
        Self {
            schema,
            handle,
            version,
            fields,
            arena,
            consumed: HashSet::new(),
        }
    }

    /// Field names present in the stream that the node's read logic never asked for.
    pub(crate) fn unread_fields(&self) -> Vec<&'a str> {
        let mut unread: Vec<&str> = self
            .fields
            .keys()
            .map(String::as_str)
            .filter(|name| !self.consumed.contains(name))
            .collect();
        unread.sort_unstable();
        unread
    }

    /// Looks up `name`, checking that its stored tag is `expected`.
    fn field(
        &mut self,
        name: &str,
        expected: FieldKind,
    ) -> Result<Option<&'a FieldValue>, ExportError> {
        let fields: &'a HashMap<String, FieldValue> = self.fields;
        let Some((key, value)) = fields.get_key_value(name) else {
            return Ok(None);
        };
        self.consumed.insert(key.as_str());
        if value.kind() != expected {
            return Err(self.malformed(name, expected.name(), value.kind().name()));
        }
        Ok(Some(value))
    }

    fn bind(&self, handle: Option<u32>) -> Result<Option<SavableRef>, ExportError> {
        handle
            .map(|h| {
                self.arena.get(h as usize).cloned().ok_or_else(|| ExportError::CorruptData {
                    handle: Some(self.handle),
                    detail: format!("reference to unknown handle {h}"),
                })
            })
            .transpose()
    }
}

impl InputCapsule for BinaryInputCapsule<'_> {
    fn schema_name(&self) -> &str {
        self.schema
    }

    fn schema_version(&self) -> u32 {
        self.version
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn read_bool(&mut self, name: &str, default: bool) -> Result<bool, ExportError> {
        Ok(match self.field(name, FieldKind::Bool)? {
            Some(FieldValue::Bool(v)) => *v,
            _ => default,
        })
    }

    fn read_i32(&mut self, name: &str, default: i32) -> Result<i32, ExportError> {
        Ok(match self.field(name, FieldKind::I32)? {
            Some(FieldValue::I32(v)) => *v,
            _ => default,
        })
    }

    fn read_i64(&mut self, name: &str, default: i64) -> Result<i64, ExportError> {
        Ok(match self.field(name, FieldKind::I64)? {
            Some(FieldValue::I64(v)) => *v,
            _ => default,
        })
    }

    fn read_f32(&mut self, name: &str, default: f32) -> Result<f32, ExportError> {
        Ok(match self.field(name, FieldKind::F32)? {
            Some(FieldValue::F32(v)) => *v,
            _ => default,
        })
    }

    fn read_f64(&mut self, name: &str, default: f64) -> Result<f64, ExportError> {
        Ok(match self.field(name, FieldKind::F64)? {
            Some(FieldValue::F64(v)) => *v,
            _ => default,
        })
    }

    fn read_string(
        &mut self,
        name: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, ExportError> {
        Ok(match self.field(name, FieldKind::String)? {
            Some(FieldValue::String(v)) => v.clone(),
            _ => default.map(str::to_owned),
        })
    }

    fn read_bytes(&mut self, name: &str, default: &[u8]) -> Result<Vec<u8>, ExportError> {
        Ok(match self.field(name, FieldKind::Bytes)? {
            Some(FieldValue::Bytes(v)) => v.clone(),
            _ => default.to_vec(),
        })
    }

    fn read_i32_array(&mut self, name: &str, default: &[i32]) -> Result<Vec<i32>, ExportError> {
        Ok(match self.field(name, FieldKind::I32Array)? {
            Some(FieldValue::I32Array(v)) => v.clone(),
            _ => default.to_vec(),
        })
    }

    fn read_f32_array(&mut self, name: &str, default: &[f32]) -> Result<Vec<f32>, ExportError> {
        Ok(match self.field(name, FieldKind::F32Array)? {
            Some(FieldValue::F32Array(v)) => v.clone(),
            _ => default.to_vec(),
        })
    }

    fn read_f64_array(&mut self, name: &str, default: &[f64]) -> Result<Vec<f64>, ExportError> {
        Ok(match self.field(name, FieldKind::F64Array)? {
            Some(FieldValue::F64Array(v)) => v.clone(),
            _ => default.to_vec(),
        })
    }

    fn read_string_array(
        &mut self,
        name: &str,
        default: &[String],
    ) -> Result<Vec<String>, ExportError> {
        Ok(match self.field(name, FieldKind::StringArray)? {
            Some(FieldValue::StringArray(v)) => v.clone(),
            _ => default.to_vec(),
        })
    }

    fn read_savable(
        &mut self,
        name: &str,
        default: Option<SavableRef>,
    ) -> Result<Option<SavableRef>, ExportError> {
        match self.field(name, FieldKind::Savable)? {
            Some(FieldValue::Savable(h)) => self.bind(*h),
            _ => Ok(default),
        }
    }

    fn read_savable_list(&mut self, name: &str) -> Result<Vec<Option<SavableRef>>, ExportError> {
        match self.field(name, FieldKind::SavableList)? {
            Some(FieldValue::SavableList(handles)) => {
                handles.iter().map(|h| self.bind(*h)).collect()
            }
            _ => Ok(Vec::new()),
        }
    }

    fn read_savable_map(
        &mut self,
        name: &str,
    ) -> Result<Vec<(String, Option<SavableRef>)>, ExportError> {
        match self.field(name, FieldKind::SavableMap)? {
            Some(FieldValue::SavableMap(entries)) => entries
                .iter()
                .map(|(key, h)| Ok((key.clone(), self.bind(*h)?)))
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    fn malformed(&self, field: &str, expected: &str, found: &str) -> ExportError {
        ExportError::MalformedData {
            schema: self.schema.to_owned(),
            handle: self.handle,
            field: field.to_owned(),
            expected: expected.to_owned(),
            found: found.to_owned(),
        }
    }

    fn invalid(&self, field: &str, message: &str) -> ExportError {
        ExportError::InvalidValue {
            schema: self.schema.to_owned(),
            handle: self.handle,
            field: field.to_owned(),
            message: message.to_owned(),
        }
    }
}
