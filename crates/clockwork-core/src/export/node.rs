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

//! Shared, type-erased handles over savable nodes.

use super::{ExportError, InputCapsule, OutputCapsule, Savable};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// The shared, interior-mutable form of a savable node.
///
/// A node referenced from several parents (or from itself through a cycle)
/// is a single allocation. Owning edges hold a `Node<T>`; edges that close a
/// cycle, such as a child's link back to its parent, should hold a
/// [`WeakNode`] so the graph is freed once its roots are dropped.
pub type Node<T> = Arc<RwLock<T>>;

/// A non-owning edge to a savable node.
///
/// It is written under the same handle as the strong references to its
/// target, and resolves to the same allocation on load.
pub type WeakNode<T> = Weak<RwLock<T>>;

/// Wraps `value` into a fresh [`Node`].
pub fn new_node<T: Savable>(value: T) -> Node<T> {
    Arc::new(RwLock::new(value))
}

/// Object-safe view of a `RwLock<T: Savable>`.
///
/// This is what lets the exporter and importer drive nodes of arbitrary
/// concrete types through one handle type.
pub trait ErasedSavable: Send + Sync + 'static {
    /// The schema name of the concrete type.
    fn schema_name(&self) -> &'static str;

    /// The schema version the concrete type writes.
    fn schema_version(&self) -> u32;

    /// Runs the node's write logic under a shared lock.
    fn write_fields(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError>;

    /// Runs the node's read logic under an exclusive lock.
    fn read_fields(&self, input: &mut dyn InputCapsule) -> Result<(), ExportError>;

    /// Converts the shared allocation into an `Any` for downcasting.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Savable> ErasedSavable for RwLock<T> {
    fn schema_name(&self) -> &'static str {
        T::SCHEMA_NAME
    }

    fn schema_version(&self) -> u32 {
        T::SCHEMA_VERSION
    }

    fn write_fields(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        let guard = self.read().map_err(|_| ExportError::Poisoned {
            schema: T::SCHEMA_NAME,
        })?;
        guard.write(out)
    }

    fn read_fields(&self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        let mut guard = self.write().map_err(|_| ExportError::Poisoned {
            schema: T::SCHEMA_NAME,
        })?;
        guard.read(input)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A cloneable, type-erased reference to a node in a savable graph.
///
/// Equality of two `SavableRef`s is *identity*: they are the same node only
/// when they point at the same allocation. This is the identity the
/// exporter's reference table keys on.
#[derive(Clone)]
pub struct SavableRef(Arc<dyn ErasedSavable>);

impl SavableRef {
    /// Wraps a value into a new node and returns a reference to it.
    pub fn new<T: Savable>(value: T) -> Self {
        Self(new_node(value))
    }

    /// Returns a reference sharing the allocation of `node`.
    pub fn from_node<T: Savable>(node: &Node<T>) -> Self {
        let erased: Arc<dyn ErasedSavable> = node.clone();
        Self(erased)
    }

    /// Recovers the typed node, or `None` if it is of another type.
    pub fn downcast<T: Savable>(&self) -> Option<Node<T>> {
        self.0.clone().into_any().downcast::<RwLock<T>>().ok()
    }

    /// The schema name of the referenced node.
    pub fn schema_name(&self) -> &'static str {
        self.0.schema_name()
    }

    /// The schema version the referenced node's type writes.
    pub fn schema_version(&self) -> u32 {
        self.0.schema_version()
    }

    /// Identity of the node: the address of its shared allocation.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Returns `true` if both references point at the same node.
    pub fn ptr_eq(&self, other: &SavableRef) -> bool {
        self.identity() == other.identity()
    }

    /// Runs the node's write logic.
    pub fn write_fields(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        self.0.write_fields(out)
    }

    /// Runs the node's read logic.
    pub fn read_fields(&self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.0.read_fields(input)
    }
}

impl<T: Savable> From<Node<T>> for SavableRef {
    fn from(node: Node<T>) -> Self {
        let erased: Arc<dyn ErasedSavable> = node;
        Self(erased)
    }
}

impl PartialEq for SavableRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SavableRef {}

impl fmt::Debug for SavableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SavableRef({}@{:#x})", self.schema_name(), self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Marker(u32);

    impl Savable for Marker {
        const SCHEMA_NAME: &'static str = "Marker";
        const SCHEMA_VERSION: u32 = 2;

        fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
            out.write_i32(self.0 as i32, "value", 0)
        }

        fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
            self.0 = input.read_i32("value", 0)? as u32;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Other;

    impl Savable for Other {
        const SCHEMA_NAME: &'static str = "Other";

        fn write(&self, _out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
            Ok(())
        }

        fn read(&mut self, _input: &mut dyn InputCapsule) -> Result<(), ExportError> {
            Ok(())
        }
    }

    #[test]
    fn identity_follows_the_allocation_not_the_value() {
        let node = new_node(Marker(1));
        let a = SavableRef::from_node(&node);
        let b = SavableRef::from(node.clone());
        let c = SavableRef::new(Marker(1));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.schema_name(), "Marker");
        assert_eq!(a.schema_version(), 2);
    }

    #[test]
    fn downcast_recovers_the_typed_node() {
        let node = new_node(Marker(9));
        let erased = SavableRef::from_node(&node);

        let typed = erased.downcast::<Marker>().expect("same type");
        assert!(Arc::ptr_eq(&typed, &node));
        assert_eq!(typed.read().unwrap().0, 9);
        assert!(erased.downcast::<Other>().is_none());
    }
}
