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

//! Scoped, per-node read and write contexts.
//!
//! A capsule is bound to exactly one node for the duration of that node's
//! [`Savable::write`](super::Savable::write) or
//! [`Savable::read`](super::Savable::read) call. Every accessor is keyed by
//! field name and takes a default: writers may drop a field equal to its
//! default, and readers return the default for a field that is absent.

use super::{ExportError, Node, Savable, SavableRef, WeakNode};
use std::sync::{Arc, Weak};

/// Write side of a capsule.
pub trait OutputCapsule {
    /// Writes a boolean.
    fn write_bool(&mut self, value: bool, name: &str, default: bool) -> Result<(), ExportError>;

    /// Writes a 32-bit integer.
    fn write_i32(&mut self, value: i32, name: &str, default: i32) -> Result<(), ExportError>;

    /// Writes a 64-bit integer.
    fn write_i64(&mut self, value: i64, name: &str, default: i64) -> Result<(), ExportError>;

    /// Writes a 32-bit float. Compared bitwise against `default`.
    fn write_f32(&mut self, value: f32, name: &str, default: f32) -> Result<(), ExportError>;

    /// Writes a 64-bit float. Compared bitwise against `default`.
    fn write_f64(&mut self, value: f64, name: &str, default: f64) -> Result<(), ExportError>;

    /// Writes a nullable string.
    fn write_string(
        &mut self,
        value: Option<&str>,
        name: &str,
        default: Option<&str>,
    ) -> Result<(), ExportError>;

    /// Writes a byte array.
    fn write_bytes(&mut self, value: &[u8], name: &str, default: &[u8])
        -> Result<(), ExportError>;

    /// Writes an array of 32-bit integers.
    fn write_i32_array(
        &mut self,
        value: &[i32],
        name: &str,
        default: &[i32],
    ) -> Result<(), ExportError>;

    /// Writes an array of 32-bit floats.
    fn write_f32_array(
        &mut self,
        value: &[f32],
        name: &str,
        default: &[f32],
    ) -> Result<(), ExportError>;

    /// Writes an array of 64-bit floats.
    fn write_f64_array(
        &mut self,
        value: &[f64],
        name: &str,
        default: &[f64],
    ) -> Result<(), ExportError>;

    /// Writes an array of strings.
    fn write_string_array(
        &mut self,
        value: &[String],
        name: &str,
        default: &[String],
    ) -> Result<(), ExportError>;

    /// Writes a nullable reference to another node.
    ///
    /// `None` is recorded as an explicit null, never omitted, so a reader can
    /// tell it apart from an absent field.
    fn write_savable(&mut self, value: Option<&SavableRef>, name: &str) -> Result<(), ExportError>;

    /// Writes an ordered list of nullable node references.
    fn write_savable_list(
        &mut self,
        value: &[Option<SavableRef>],
        name: &str,
    ) -> Result<(), ExportError>;

    /// Writes string-keyed, nullable node references in the given order.
    fn write_savable_map(
        &mut self,
        value: &[(String, Option<SavableRef>)],
        name: &str,
    ) -> Result<(), ExportError>;
}

/// Read side of a capsule.
pub trait InputCapsule {
    /// The schema name of the node being read.
    fn schema_name(&self) -> &str;

    /// The schema version the stream was written with.
    fn schema_version(&self) -> u32;

    /// Returns `true` if the stream holds a value (possibly null) for `name`.
    fn has_field(&self, name: &str) -> bool;

    /// Reads a boolean.
    fn read_bool(&mut self, name: &str, default: bool) -> Result<bool, ExportError>;

    /// Reads a 32-bit integer.
    fn read_i32(&mut self, name: &str, default: i32) -> Result<i32, ExportError>;

    /// Reads a 64-bit integer.
    fn read_i64(&mut self, name: &str, default: i64) -> Result<i64, ExportError>;

    /// Reads a 32-bit float.
    fn read_f32(&mut self, name: &str, default: f32) -> Result<f32, ExportError>;

    /// Reads a 64-bit float.
    fn read_f64(&mut self, name: &str, default: f64) -> Result<f64, ExportError>;

    /// Reads a nullable string.
    fn read_string(
        &mut self,
        name: &str,
        default: Option<&str>,
    ) -> Result<Option<String>, ExportError>;

    /// Reads a byte array.
    fn read_bytes(&mut self, name: &str, default: &[u8]) -> Result<Vec<u8>, ExportError>;

    /// Reads an array of 32-bit integers.
    fn read_i32_array(&mut self, name: &str, default: &[i32]) -> Result<Vec<i32>, ExportError>;

    /// Reads an array of 32-bit floats.
    fn read_f32_array(&mut self, name: &str, default: &[f32]) -> Result<Vec<f32>, ExportError>;

    /// Reads an array of 64-bit floats.
    fn read_f64_array(&mut self, name: &str, default: &[f64]) -> Result<Vec<f64>, ExportError>;

    /// Reads an array of strings.
    fn read_string_array(
        &mut self,
        name: &str,
        default: &[String],
    ) -> Result<Vec<String>, ExportError>;

    /// Reads a nullable node reference.
    ///
    /// An explicit null yields `None`; an absent field yields `default`.
    fn read_savable(
        &mut self,
        name: &str,
        default: Option<SavableRef>,
    ) -> Result<Option<SavableRef>, ExportError>;

    /// Reads a list of nullable node references; absent reads as empty.
    fn read_savable_list(&mut self, name: &str) -> Result<Vec<Option<SavableRef>>, ExportError>;

    /// Reads string-keyed node references; absent reads as empty.
    fn read_savable_map(
        &mut self,
        name: &str,
    ) -> Result<Vec<(String, Option<SavableRef>)>, ExportError>;

    /// Builds a [`ExportError::MalformedData`] carrying this capsule's
    /// schema and handle.
    fn malformed(&self, field: &str, expected: &str, found: &str) -> ExportError;

    /// Builds a [`ExportError::InvalidValue`] carrying this capsule's
    /// schema and handle. Node read logic uses it to reject values.
    fn invalid(&self, field: &str, message: &str) -> ExportError;
}

impl dyn OutputCapsule + '_ {
    /// Writes a nullable typed node reference.
    pub fn write_node<T: Savable>(
        &mut self,
        node: Option<&Node<T>>,
        name: &str,
    ) -> Result<(), ExportError> {
        let erased = node.map(SavableRef::from_node);
        self.write_savable(erased.as_ref(), name)
    }

    /// Writes a non-owning node reference under its target's handle.
    ///
    /// A target that has already been dropped is written as null.
    pub fn write_weak_node<T: Savable>(
        &mut self,
        node: Option<&WeakNode<T>>,
        name: &str,
    ) -> Result<(), ExportError> {
        let strong = node.and_then(Weak::upgrade);
        self.write_node(strong.as_ref(), name)
    }

    /// Writes a list of typed node references.
    pub fn write_node_list<T: Savable>(
        &mut self,
        nodes: &[Node<T>],
        name: &str,
    ) -> Result<(), ExportError> {
        let erased: Vec<Option<SavableRef>> = nodes
            .iter()
            .map(|n| Some(SavableRef::from_node(n)))
            .collect();
        self.write_savable_list(&erased, name)
    }
}

impl dyn InputCapsule + '_ {
    /// Reads a nullable typed node reference. Absent reads as `None`.
    ///
    /// A node of a different schema than `T` is a
    /// [`ExportError::MalformedData`].
    pub fn read_node<T: Savable>(&mut self, name: &str) -> Result<Option<Node<T>>, ExportError> {
        match self.read_savable(name, None)? {
            Some(erased) => self.downcast_field(name, &erased).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a non-owning node reference. Absent reads as `None`.
    ///
    /// The target stays alive only while a root or another strong edge of
    /// the loaded graph holds it.
    pub fn read_weak_node<T: Savable>(
        &mut self,
        name: &str,
    ) -> Result<Option<WeakNode<T>>, ExportError> {
        Ok(self.read_node::<T>(name)?.as_ref().map(Arc::downgrade))
    }

    /// Reads a list of typed node references. Absent reads as empty.
    ///
    /// Null entries and entries of another schema are rejected.
    pub fn read_node_list<T: Savable>(&mut self, name: &str) -> Result<Vec<Node<T>>, ExportError> {
        let erased = self.read_savable_list(name)?;
        erased
            .iter()
            .map(|entry| match entry {
                Some(r) => self.downcast_field(name, r),
                None => Err(self.malformed(name, T::SCHEMA_NAME, "null")),
            })
            .collect()
    }

    fn downcast_field<T: Savable>(
        &self,
        name: &str,
        erased: &SavableRef,
    ) -> Result<Node<T>, ExportError> {
        erased
            .downcast::<T>()
            .ok_or_else(|| self.malformed(name, T::SCHEMA_NAME, erased.schema_name()))
    }
}
