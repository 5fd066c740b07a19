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

use super::format::FieldValue;
use super::resolver::ReferenceTable;
use clockwork_core::export::{ExportError, OutputCapsule, SavableRef};
use std::collections::HashSet;

/// The write context for one node during a save.
///
/// Fields are buffered in emission order. Node references are resolved
/// through the shared [`ReferenceTable`], which schedules unseen nodes
/// instead of recursing into them.
pub(crate) struct BinaryOutputCapsule<'t> {
    schema: &'static str,
    handle: u32,
    table: &'t mut ReferenceTable,
    fields: Vec<(String, FieldValue)>,
    seen: HashSet<String>,
}

impl<'t> BinaryOutputCapsule<'t> {
    pub(crate) fn new(schema: &'static str, handle: u32, table: &'t mut ReferenceTable) -> Self {
        Self {
            schema,
            handle,
            table,
            fields: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub(crate) fn into_fields(self) -> Vec<(String, FieldValue)> {
        self.fields
    }

    /// Claims `name` for this node; a second claim is an error.
    fn claim(&mut self, name: &str) -> Result<(), ExportError> {
        if self.seen.insert(name.to_owned()) {
            return Ok(());
        }
        Err(ExportError::InvalidValue {
            schema: self.schema.to_owned(),
            handle: self.handle,
            field: name.to_owned(),
            message: "field written more than once".into(),
        })
    }

    fn push(&mut self, name: &str, value: FieldValue) -> Result<(), ExportError> {
        self.claim(name)?;
        self.fields.push((name.to_owned(), value));
        Ok(())
    }

    /// Records `value` unless it equals the default.
    fn push_unless_default(
        &mut self,
        name: &str,
        is_default: bool,
        value: impl FnOnce() -> FieldValue,
    ) -> Result<(), ExportError> {
        if is_default {
            return self.claim(name);
        }
        self.push(name, value())
    }

    fn resolve(&mut self, node: Option<&SavableRef>) -> Option<u32> {
        node.map(|n| self.table.resolve(n))
    }
}

fn bits_eq_f32(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

fn bits_eq_f64(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

impl OutputCapsule for BinaryOutputCapsule<'_> {
    fn write_bool(&mut self, value: bool, name: &str, default: bool) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || FieldValue::Bool(value))
    }

    fn write_i32(&mut self, value: i32, name: &str, default: i32) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || FieldValue::I32(value))
    }

    fn write_i64(&mut self, value: i64, name: &str, default: i64) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || FieldValue::I64(value))
    }

    fn write_f32(&mut self, value: f32, name: &str, default: f32) -> Result<(), ExportError> {
        self.push_unless_default(name, value.to_bits() == default.to_bits(), || {
            FieldValue::F32(value)
        })
    }

    fn write_f64(&mut self, value: f64, name: &str, default: f64) -> Result<(), ExportError> {
        self.push_unless_default(name, value.to_bits() == default.to_bits(), || {
            FieldValue::F64(value)
        })
    }

    fn write_string(
        &mut self,
        value: Option<&str>,
        name: &str,
        default: Option<&str>,
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || {
            FieldValue::String(value.map(str::to_owned))
        })
    }

    fn write_bytes(
        &mut self,
        value: &[u8],
        name: &str,
        default: &[u8],
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || FieldValue::Bytes(value.to_vec()))
    }

    fn write_i32_array(
        &mut self,
        value: &[i32],
        name: &str,
        default: &[i32],
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || {
            FieldValue::I32Array(value.to_vec())
        })
    }

    fn write_f32_array(
        &mut self,
        value: &[f32],
        name: &str,
        default: &[f32],
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, bits_eq_f32(value, default), || {
            FieldValue::F32Array(value.to_vec())
        })
    }

    fn write_f64_array(
        &mut self,
        value: &[f64],
        name: &str,
        default: &[f64],
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, bits_eq_f64(value, default), || {
            FieldValue::F64Array(value.to_vec())
        })
    }

    fn write_string_array(
        &mut self,
        value: &[String],
        name: &str,
        default: &[String],
    ) -> Result<(), ExportError> {
        self.push_unless_default(name, value == default, || {
            FieldValue::StringArray(value.to_vec())
        })
    }

    fn write_savable(&mut self, value: Option<&SavableRef>, name: &str) -> Result<(), ExportError> {
        let handle = self.resolve(value);
        self.push(name, FieldValue::Savable(handle))
    }

    fn write_savable_list(
        &mut self,
        value: &[Option<SavableRef>],
        name: &str,
    ) -> Result<(), ExportError> {
        let handles = value.iter().map(|n| self.resolve(n.as_ref())).collect();
        self.push(name, FieldValue::SavableList(handles))
    }

    fn write_savable_map(
        &mut self,
        value: &[(String, Option<SavableRef>)],
        name: &str,
    ) -> Result<(), ExportError> {
        let entries = value
            .iter()
            .map(|(key, n)| (key.clone(), self.resolve(n.as_ref())))
            .collect();
        self.push(name, FieldValue::SavableMap(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_omitted_and_nulls_are_kept() {
        let mut table = ReferenceTable::new();
        let mut capsule = BinaryOutputCapsule::new("Probe", 0, &mut table);
        let out: &mut dyn OutputCapsule = &mut capsule;

        out.write_i32(0, "count", 0).unwrap();
        out.write_f32(1.5, "scale", 1.0).unwrap();
        out.write_string(None, "label", None).unwrap();
        out.write_savable(None, "parent").unwrap();

        let fields = capsule.into_fields();
        assert_eq!(
            fields,
            vec![
                ("scale".to_owned(), FieldValue::F32(1.5)),
                ("parent".to_owned(), FieldValue::Savable(None)),
            ]
        );
    }

    #[test]
    fn test_negative_zero_is_not_the_positive_zero_default() {
        let mut table = ReferenceTable::new();
        let mut capsule = BinaryOutputCapsule::new("Probe", 0, &mut table);
        capsule.write_f64(-0.0, "offset", 0.0).unwrap();
        assert_eq!(capsule.into_fields().len(), 1);
    }

    #[test]
    fn test_duplicate_field_names_are_rejected() {
        let mut table = ReferenceTable::new();
        let mut capsule = BinaryOutputCapsule::new("Probe", 4, &mut table);
        capsule.write_i32(1, "id", 0).unwrap();

        match capsule.write_i32(0, "id", 0) {
            Err(ExportError::InvalidValue { schema, handle, field, .. }) => {
                assert_eq!(schema, "Probe");
                assert_eq!(handle, 4);
                assert_eq!(field, "id");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
