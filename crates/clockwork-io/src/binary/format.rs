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

//! The binary container layout and the typed field encoding.
//!
//! ```text
//! magic     [u8; 4] = b"CWBN"
//! version   u8      = FORMAT_VERSION
//! schemas   u32 count, then (str name, u32 version)
//! objects   u32 count, then per handle:
//!             u32 schema_index, u32 field_count,
//!             fields: (str name, u8 tag, payload)
//! roots     u32 count, then u32 handle each
//! ```

use super::codec::{self, ByteReader, LengthOverflow};
use clockwork_core::export::ExportError;
use std::fmt;

/// Magic bytes at the start of every binary graph.
pub const MAGIC: [u8; 4] = *b"CWBN";

/// Current container format version.
///
/// Version history:
/// - v1: initial layout.
pub const FORMAT_VERSION: u8 = 1;

/// The type tag stored before every field payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    /// `u8` 0 or 1.
    Bool = 1,
    /// Little-endian `i32`.
    I32 = 2,
    /// Little-endian `i64`.
    I64 = 3,
    /// Little-endian `f32`.
    F32 = 4,
    /// Little-endian `f64`.
    F64 = 5,
    /// Presence byte, then a length-prefixed UTF-8 string.
    String = 6,
    /// Length-prefixed raw bytes.
    Bytes = 7,
    /// Length-prefixed `i32` array.
    I32Array = 8,
    /// Length-prefixed `f32` array.
    F32Array = 9,
    /// Length-prefixed `f64` array.
    F64Array = 10,
    /// Length-prefixed array of strings.
    StringArray = 11,
    /// Nullable node handle.
    Savable = 12,
    /// Length-prefixed list of nullable node handles.
    SavableList = 13,
    /// Length-prefixed list of (string key, nullable node handle).
    SavableMap = 14,
}

impl FieldKind {
    /// The on-disk tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parses an on-disk tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Bool,
            2 => Self::I32,
            3 => Self::I64,
            4 => Self::F32,
            5 => Self::F64,
            6 => Self::String,
            7 => Self::Bytes,
            8 => Self::I32Array,
            9 => Self::F32Array,
            10 => Self::F64Array,
            11 => Self::StringArray,
            12 => Self::Savable,
            13 => Self::SavableList,
            14 => Self::SavableMap,
            _ => return None,
        })
    }

    /// Human-readable name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::I32Array => "i32[]",
            Self::F32Array => "f32[]",
            Self::F64Array => "f64[]",
            Self::StringArray => "string[]",
            Self::Savable => "savable",
            Self::SavableList => "savable[]",
            Self::SavableMap => "savable{}",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded field payload. Node references are raw handles until the
/// importer binds them to the arena.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldValue {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    String(Option<String>),
    Bytes(Vec<u8>),
    I32Array(Vec<i32>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
    StringArray(Vec<String>),
    Savable(Option<u32>),
    SavableList(Vec<Option<u32>>),
    SavableMap(Vec<(String, Option<u32>)>),
}

impl FieldValue {
    pub(crate) fn kind(&self) -> FieldKind {
        match self {
            Self::Bool(_) => FieldKind::Bool,
            Self::I32(_) => FieldKind::I32,
            Self::I64(_) => FieldKind::I64,
            Self::F32(_) => FieldKind::F32,
            Self::F64(_) => FieldKind::F64,
            Self::String(_) => FieldKind::String,
            Self::Bytes(_) => FieldKind::Bytes,
            Self::I32Array(_) => FieldKind::I32Array,
            Self::F32Array(_) => FieldKind::F32Array,
            Self::F64Array(_) => FieldKind::F64Array,
            Self::StringArray(_) => FieldKind::StringArray,
            Self::Savable(_) => FieldKind::Savable,
            Self::SavableList(_) => FieldKind::SavableList,
            Self::SavableMap(_) => FieldKind::SavableMap,
        }
    }

    /// Appends the tag and payload.
    pub(crate) fn encode(&self, buf: &mut Vec<u8>) -> Result<(), LengthOverflow> {
        codec::put_u8(buf, self.kind().tag());
        match self {
            Self::Bool(v) => codec::put_u8(buf, u8::from(*v)),
            Self::I32(v) => codec::put_i32(buf, *v),
            Self::I64(v) => codec::put_i64(buf, *v),
            Self::F32(v) => codec::put_f32(buf, *v),
            Self::F64(v) => codec::put_f64(buf, *v),
            Self::String(v) => match v {
                Some(s) => {
                    codec::put_u8(buf, 1);
                    codec::put_str(buf, s)?;
                }
                None => codec::put_u8(buf, 0),
            },
            Self::Bytes(v) => {
                codec::put_len(buf, v.len())?;
                buf.extend_from_slice(v);
            }
            Self::I32Array(v) => {
                codec::put_len(buf, v.len())?;
                v.iter().for_each(|x| codec::put_i32(buf, *x));
            }
            Self::F32Array(v) => {
                codec::put_len(buf, v.len())?;
                v.iter().for_each(|x| codec::put_f32(buf, *x));
            }
            Self::F64Array(v) => {
                codec::put_len(buf, v.len())?;
                v.iter().for_each(|x| codec::put_f64(buf, *x));
            }
            Self::StringArray(v) => {
                codec::put_len(buf, v.len())?;
                for s in v {
                    codec::put_str(buf, s)?;
                }
            }
            Self::Savable(h) => codec::put_handle(buf, *h),
            Self::SavableList(v) => {
                codec::put_len(buf, v.len())?;
                v.iter().for_each(|h| codec::put_handle(buf, *h));
            }
            Self::SavableMap(v) => {
                codec::put_len(buf, v.len())?;
                for (key, h) in v {
                    codec::put_str(buf, key)?;
                    codec::put_handle(buf, *h);
                }
            }
        }
        Ok(())
    }

    /// Reads a tag and its payload.
    pub(crate) fn decode(r: &mut ByteReader<'_>) -> Result<Self, ExportError> {
        let tag = r.u8()?;
        let kind = FieldKind::from_tag(tag)
            .ok_or_else(|| r.corrupt(format!("unknown field tag {tag}")))?;

        Ok(match kind {
            FieldKind::Bool => Self::Bool(r.bool()?),
            FieldKind::I32 => Self::I32(r.i32()?),
            FieldKind::I64 => Self::I64(r.i64()?),
            FieldKind::F32 => Self::F32(r.f32()?),
            FieldKind::F64 => Self::F64(r.f64()?),
            FieldKind::String => Self::String(match r.bool()? {
                true => Some(r.str()?),
                false => None,
            }),
            FieldKind::Bytes => Self::Bytes(r.bytes()?),
            FieldKind::I32Array => {
                let n = r.count(4)?;
                Self::I32Array((0..n).map(|_| r.i32()).collect::<Result<_, _>>()?)
            }
            FieldKind::F32Array => {
                let n = r.count(4)?;
                Self::F32Array((0..n).map(|_| r.f32()).collect::<Result<_, _>>()?)
            }
            FieldKind::F64Array => {
                let n = r.count(8)?;
                Self::F64Array((0..n).map(|_| r.f64()).collect::<Result<_, _>>()?)
            }
            FieldKind::StringArray => {
                let n = r.count(4)?;
                Self::StringArray((0..n).map(|_| r.str()).collect::<Result<_, _>>()?)
            }
            FieldKind::Savable => Self::Savable(r.handle()?),
            FieldKind::SavableList => {
                let n = r.count(1)?;
                Self::SavableList((0..n).map(|_| r.handle()).collect::<Result<_, _>>()?)
            }
            FieldKind::SavableMap => {
                let n = r.count(5)?;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let key = r.str()?;
                    entries.push((key, r.handle()?));
                }
                Self::SavableMap(entries)
            }
        })
    }

    /// Every non-null handle this field references.
    pub(crate) fn handles(&self) -> Vec<u32> {
        match self {
            Self::Savable(h) => h.iter().copied().collect(),
            Self::SavableList(v) => v.iter().flatten().copied().collect(),
            Self::SavableMap(v) => v.iter().filter_map(|(_, h)| *h).collect(),
            _ => Vec::new(),
        }
    }
}
