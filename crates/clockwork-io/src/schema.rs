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

//! Name-to-factory resolution for loading savable graphs.

use clockwork_core::export::{Savable, SavableRef};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Builds a fresh, default-constructed node for a schema.
pub type SchemaFactory = Arc<dyn Fn() -> SavableRef + Send + Sync>;

#[derive(Clone)]
struct SchemaEntry {
    version: u32,
    factory: SchemaFactory,
}

/// Maps on-disk schema names to node factories and their supported version.
///
/// Registries are plain values: tests build isolated instances, while an
/// application may install one process-wide with [`SchemaRegistry::install_global`].
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, SchemaEntry>,
}

static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under its own schema name.
    pub fn register<T: Savable + Default>(&mut self) -> &mut Self {
        self.register_alias::<T>(T::SCHEMA_NAME)
    }

    /// Registers `T` under an additional, usually older, schema name.
    pub fn register_alias<T: Savable + Default>(&mut self, name: &str) -> &mut Self {
        self.register_factory(name, T::SCHEMA_VERSION, || SavableRef::new(T::default()))
    }

    /// Registers a hand-built factory.
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_factory<F>(&mut self, name: &str, version: u32, factory: F) -> &mut Self
    where
        F: Fn() -> SavableRef + Send + Sync + 'static,
    {
        let previous = self.entries.insert(
            name.to_owned(),
            SchemaEntry {
                version,
                factory: Arc::new(factory),
            },
        );
        if previous.is_some() {
            log::warn!("Schema '{name}' registered twice; the last registration wins");
        }
        self
    }

    /// Returns `true` if `name` can be instantiated.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The highest schema version the factory for `name` reads.
    pub fn version_of(&self, name: &str) -> Option<u32> {
        self.entries.get(name).map(|e| e.version)
    }

    /// Builds a default node for `name`.
    pub fn instantiate(&self, name: &str) -> Option<SavableRef> {
        self.entries.get(name).map(|e| (e.factory)())
    }

    /// Number of registered names, aliases included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All registered names, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Installs the process-wide registry. Only the first call succeeds;
    /// later calls hand the rejected registry back.
    pub fn install_global(registry: SchemaRegistry) -> Result<(), SchemaRegistry> {
        GLOBAL
            .set(Arc::new(registry))
            .map_err(|rejected| Arc::try_unwrap(rejected).unwrap_or_else(|arc| (*arc).clone()))
    }

    /// The process-wide registry, if one was installed.
    pub fn global() -> Option<Arc<SchemaRegistry>> {
        GLOBAL.get().cloned()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.schema_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clockwork_core::export::{ExportError, InputCapsule, OutputCapsule};

    #[derive(Default)]
    struct Emitter;

    impl Savable for Emitter {
        const SCHEMA_NAME: &'static str = "Emitter";
        const SCHEMA_VERSION: u32 = 3;

        fn write(&self, _out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
            Ok(())
        }

        fn read(&mut self, _input: &mut dyn InputCapsule) -> Result<(), ExportError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_instantiate() {
        let mut registry = SchemaRegistry::new();
        registry.register::<Emitter>().register_alias::<Emitter>("ParticleEmitter");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.schema_names(), vec!["Emitter", "ParticleEmitter"]);
        assert_eq!(registry.version_of("ParticleEmitter"), Some(3));

        let node = registry.instantiate("ParticleEmitter").expect("alias registered");
        assert_eq!(node.schema_name(), "Emitter");
        assert!(node.downcast::<Emitter>().is_some());
        assert!(registry.instantiate("Missing").is_none());
    }

    #[test]
    fn test_each_instantiation_is_a_distinct_node() {
        let mut registry = SchemaRegistry::new();
        registry.register::<Emitter>();
        let a = registry.instantiate("Emitter").unwrap();
        let b = registry.instantiate("Emitter").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_global_installs_once() {
        let mut first = SchemaRegistry::new();
        first.register::<Emitter>();
        let _ = SchemaRegistry::install_global(first);

        let rejected = SchemaRegistry::install_global(SchemaRegistry::new());
        assert!(rejected.is_err());
        assert!(SchemaRegistry::global().is_some());
    }
}
