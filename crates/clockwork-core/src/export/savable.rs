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

//! The capability every persistable node type implements.

use super::{ExportError, InputCapsule, OutputCapsule};

/// A node type that can be written to and rebuilt from a capsule.
///
/// Implementors write each field under a stable name in [`Savable::write`] and
/// read it back under the same name in [`Savable::read`]. Reads are keyed by
/// name, not by position, so fields may be added, dropped or reordered
/// between versions: a missing field simply yields the default passed to the
/// read call.
///
/// Loading builds every node from [`Default`] through the schema registry
/// before any `read` runs, so references to other nodes (including cycles)
/// are always resolvable from inside `read`.
///
/// # Example
///
/// ```
/// use clockwork_core::export::{ExportError, InputCapsule, OutputCapsule, Savable};
///
/// #[derive(Default)]
/// struct Light {
///     intensity: f32,
///     name: Option<String>,
/// }
///
/// impl Savable for Light {
///     const SCHEMA_NAME: &'static str = "Light";
///
///     fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
///         out.write_f32(self.intensity, "intensity", 1.0)?;
///         out.write_string(self.name.as_deref(), "name", None)
///     }
///
///     fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
///         self.intensity = input.read_f32("intensity", 1.0)?;
///         self.name = input.read_string("name", None)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Savable: Send + Sync + 'static {
    /// Stable identifier written to disk and used to find the factory on load.
    const SCHEMA_NAME: &'static str;

    /// Layout version of this schema. Bump it whenever [`Savable::read`]
    /// needs to interpret older streams differently.
    const SCHEMA_VERSION: u32 = 0;

    /// Writes every field of this node into `out`.
    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError>;

    /// Populates this (default-constructed) node from `input`.
    ///
    /// [`InputCapsule::schema_version`] reports the version the stream was
    /// written with, so older layouts can be migrated here.
    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError>;
}
