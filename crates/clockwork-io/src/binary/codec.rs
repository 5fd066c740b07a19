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

//! Little-endian primitive encoding over in-memory buffers.
//!
//! Strings and arrays are prefixed with a `u32` element count. Node
//! references are a presence byte (`0` = null, `1` = present) followed by
//! a `u32` handle when present. Decoding works on a fully buffered slice so
//! every length can be checked against the bytes that actually remain.

use clockwork_core::export::ExportError;

// ── Writers ─────────────────────────────────────────────────────

pub(crate) fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

pub(crate) fn put_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i64(buf: &mut Vec<u8>, v: i64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_f32(buf: &mut Vec<u8>, v: f32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_f64(buf: &mut Vec<u8>, v: f64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// A string or array too long for its `u32` length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LengthOverflow(pub(crate) usize);

impl LengthOverflow {
    /// Reports the overflow against the field being written.
    pub(crate) fn invalid(self, schema: &str, handle: u32, field: &str) -> ExportError {
        ExportError::InvalidValue {
            schema: schema.to_owned(),
            handle,
            field: field.to_owned(),
            message: format!("length {} does not fit a u32 prefix", self.0),
        }
    }
}

pub(crate) fn put_len(buf: &mut Vec<u8>, len: usize) -> Result<(), LengthOverflow> {
    let prefix = u32::try_from(len).map_err(|_| LengthOverflow(len))?;
    put_u32(buf, prefix);
    Ok(())
}

pub(crate) fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<(), LengthOverflow> {
    put_len(buf, s.len())?;
    buf.extend_from_slice(s.as_bytes());
    Ok(())
}

pub(crate) fn put_handle(buf: &mut Vec<u8>, handle: Option<u32>) {
    match handle {
        Some(h) => {
            put_u8(buf, 1);
            put_u32(buf, h);
        }
        None => put_u8(buf, 0),
    }
}

// ── Reader ──────────────────────────────────────────────────────

/// A bounds-checked cursor over an encoded stream.
///
/// Every failure is a [`ExportError::CorruptData`] tagged with the handle
/// of the object being decoded, if one is set.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    handle: Option<u32>,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            handle: None,
        }
    }

    /// Tags subsequent errors with the handle of the object being decoded.
    pub(crate) fn set_handle(&mut self, handle: Option<u32>) {
        self.handle = handle;
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn corrupt(&self, detail: impl Into<String>) -> ExportError {
        ExportError::CorruptData {
            handle: self.handle,
            detail: detail.into(),
        }
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ExportError> {
        if n > self.remaining() {
            return Err(self.corrupt(format!(
                "truncated stream: needed {n} bytes at offset {}, {} remaining",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ExportError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ExportError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ExportError> {
        self.array().map(u32::from_le_bytes)
    }

    pub(crate) fn i32(&mut self) -> Result<i32, ExportError> {
        self.array().map(i32::from_le_bytes)
    }

    pub(crate) fn i64(&mut self) -> Result<i64, ExportError> {
        self.array().map(i64::from_le_bytes)
    }

    pub(crate) fn f32(&mut self) -> Result<f32, ExportError> {
        self.array().map(f32::from_le_bytes)
    }

    pub(crate) fn f64(&mut self) -> Result<f64, ExportError> {
        self.array().map(f64::from_le_bytes)
    }

    pub(crate) fn bool(&mut self) -> Result<bool, ExportError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.corrupt(format!("invalid boolean byte {other}"))),
        }
    }

    /// Reads an element count and checks that `count * min_elem_size`
    /// bytes can still follow, so a corrupt count never drives a huge
    /// allocation.
    pub(crate) fn count(&mut self, min_elem_size: usize) -> Result<usize, ExportError> {
        let count = self.u32()? as usize;
        if count.saturating_mul(min_elem_size) > self.remaining() {
            return Err(self.corrupt(format!(
                "declared {count} elements but only {} bytes remain",
                self.remaining()
            )));
        }
        Ok(count)
    }

    pub(crate) fn str(&mut self) -> Result<String, ExportError> {
        let len = self.count(1)?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| self.corrupt(format!("invalid UTF-8 string: {e}")))
    }

    pub(crate) fn bytes(&mut self) -> Result<Vec<u8>, ExportError> {
        let len = self.count(1)?;
        Ok(self.take(len)?.to_vec())
    }

    pub(crate) fn handle(&mut self) -> Result<Option<u32>, ExportError> {
        match self.u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.u32()?)),
            flag => Err(self.corrupt(format!("invalid reference presence flag {flag}"))),
        }
    }
}
