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

//! Savable node types shared by the integration tests.

#![allow(dead_code)]

use clockwork_core::export::{
    new_node, ExportError, InputCapsule, Node, OutputCapsule, Savable, SavableRef, WeakNode,
};
use clockwork_io::SchemaRegistry;
use std::sync::Arc;

/// A joint in a skeleton. Children are owned; the parent link closes the cycle.
#[derive(Default)]
pub struct Bone {
    pub name: String,
    pub length: f32,
    pub parent: Option<WeakNode<Bone>>,
    pub children: Vec<Node<Bone>>,
}

impl Bone {
    /// The parent bone, if it is still alive.
    pub fn parent(&self) -> Option<Node<Bone>> {
        self.parent.as_ref().and_then(|p| p.upgrade())
    }

    pub fn named(name: &str, length: f32) -> Node<Bone> {
        new_node(Bone {
            name: name.to_owned(),
            length,
            ..Default::default()
        })
    }
}

/// Links `child` under `parent` in both directions.
pub fn attach(parent: &Node<Bone>, child: &Node<Bone>) {
    child.write().unwrap().parent = Some(Arc::downgrade(parent));
    parent.write().unwrap().children.push(child.clone());
}

impl Savable for Bone {
    const SCHEMA_NAME: &'static str = "Bone";

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_string(Some(&self.name), "name", None)?;
        out.write_f32(self.length, "length", 1.0)?;
        out.write_weak_node(self.parent.as_ref(), "parent")?;
        out.write_node_list(&self.children, "children")
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.name = input.read_string("name", None)?.unwrap_or_default();
        self.length = input.read_f32("length", 1.0)?;
        if self.length < 0.0 {
            return Err(input.invalid("length", "bone length must be non-negative"));
        }
        self.parent = input.read_weak_node("parent")?;
        self.children = input.read_node_list("children")?;
        Ok(())
    }
}

/// A named set of bones plus assorted array and map fields.
#[derive(Default)]
pub struct Skeleton {
    pub name: String,
    pub bones: Vec<Node<Bone>>,
    pub bind_pose: Vec<f32>,
    pub tags: Vec<String>,
    pub sockets: Vec<(String, Option<SavableRef>)>,
}

impl Savable for Skeleton {
    const SCHEMA_NAME: &'static str = "Skeleton";
    const SCHEMA_VERSION: u32 = 2;

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_string(Some(&self.name), "name", None)?;
        out.write_node_list(&self.bones, "bones")?;
        out.write_f32_array(&self.bind_pose, "bindPose", &[])?;
        out.write_string_array(&self.tags, "tags", &[])?;
        out.write_savable_map(&self.sockets, "sockets")
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.name = input.read_string("name", None)?.unwrap_or_default();
        self.bones = input.read_node_list("bones")?;
        self.bind_pose = input.read_f32_array("bindPose", &[])?;
        self.tags = input.read_string_array("tags", &[])?;
        self.sockets = input.read_savable_map("sockets")?;
        Ok(())
    }
}

/// A particle emitter. Version 1 renamed `startVelocity` to `initialVelocity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    pub initial_velocity: f32,
    pub rate: i32,
    pub seed: i64,
    pub enabled: bool,
    pub texture: Option<String>,
    pub curve: Vec<f64>,
    pub indices: Vec<i32>,
    pub payload: Vec<u8>,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            initial_velocity: 0.0,
            rate: 10,
            seed: 0,
            enabled: true,
            texture: None,
            curve: Vec::new(),
            indices: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl Savable for Emitter {
    const SCHEMA_NAME: &'static str = "Emitter";
    const SCHEMA_VERSION: u32 = 1;

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_f32(self.initial_velocity, "initialVelocity", 0.0)?;
        out.write_i32(self.rate, "rate", 10)?;
        out.write_i64(self.seed, "seed", 0)?;
        out.write_bool(self.enabled, "enabled", true)?;
        out.write_string(self.texture.as_deref(), "texture", None)?;
        out.write_f64_array(&self.curve, "curve", &[])?;
        out.write_i32_array(&self.indices, "indices", &[])?;
        out.write_bytes(&self.payload, "payload", &[])
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.initial_velocity = match input.schema_version() {
            0 => input.read_f32("startVelocity", 0.0)?,
            _ => input.read_f32("initialVelocity", 0.0)?,
        };
        self.rate = input.read_i32("rate", 10)?;
        self.seed = input.read_i64("seed", 0)?;
        self.enabled = input.read_bool("enabled", true)?;
        self.texture = input.read_string("texture", None)?;
        self.curve = input.read_f64_array("curve", &[])?;
        self.indices = input.read_i32_array("indices", &[])?;
        self.payload = input.read_bytes("payload", &[])?;
        Ok(())
    }
}

/// The version 0 layout of [`Emitter`], as older builds wrote it.
#[derive(Default)]
pub struct EmitterV0 {
    pub start_velocity: f32,
}

impl Savable for EmitterV0 {
    const SCHEMA_NAME: &'static str = "Emitter";

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_f32(self.start_velocity, "startVelocity", 0.0)
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.start_velocity = input.read_f32("startVelocity", 0.0)?;
        Ok(())
    }
}

/// An emitter written by a build newer than this one.
#[derive(Default)]
pub struct EmitterV9;

impl Savable for EmitterV9 {
    const SCHEMA_NAME: &'static str = "Emitter";
    const SCHEMA_VERSION: u32 = 9;

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_f32(3.0, "launchSpeed", 0.0)
    }

    fn read(&mut self, _input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Builds an isolated registry holding every test type.
pub fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry
        .register::<Bone>()
        .register::<Skeleton>()
        .register::<Emitter>();
    Arc::new(registry)
}
