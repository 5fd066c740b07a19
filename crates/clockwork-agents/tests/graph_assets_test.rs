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

use anyhow::Result;
use clockwork_agents::asset_agent::{AssetAgent, MemoryLocator};
use clockwork_core::asset::AssetKey;
use clockwork_core::export::{
    new_node, ExportError, InputCapsule, Node, OutputCapsule, Savable, SavableRef,
};
use clockwork_data::{CacheConfig, CachePolicy};
use clockwork_io::{BinaryExporter, SavableGraph, SchemaRegistry};
use std::sync::Arc;

#[derive(Default)]
struct Light {
    intensity: f32,
    color: Vec<f32>,
    target: Option<Node<Light>>,
}

impl Savable for Light {
    const SCHEMA_NAME: &'static str = "Light";

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_f32(self.intensity, "intensity", 1.0)?;
        out.write_f32_array(&self.color, "color", &[1.0, 1.0, 1.0])?;
        out.write_node(self.target.as_ref(), "target")
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.intensity = input.read_f32("intensity", 1.0)?;
        self.color = input.read_f32_array("color", &[1.0, 1.0, 1.0])?;
        self.target = input.read_node("target")?;
        Ok(())
    }
}

fn graph_agent(policy: CachePolicy) -> Result<AssetAgent> {
    let mut registry = SchemaRegistry::new();
    registry.register::<Light>();
    let registry = Arc::new(registry);

    let key_light = new_node(Light {
        intensity: 3.0,
        color: vec![1.0, 0.9, 0.8],
        target: None,
    });
    let fill = new_node(Light {
        intensity: 0.5,
        target: Some(key_light.clone()),
        ..Default::default()
    });
    let bytes = BinaryExporter::new().save_to_vec(&[
        SavableRef::from_node(&key_light),
        SavableRef::from_node(&fill),
    ])?;

    let locator = MemoryLocator::new();
    locator.insert("scenes/studio.cwb", bytes);

    let cache = CacheConfig {
        policy,
        ..Default::default()
    }
    .build()?;
    let mut agent = AssetAgent::new(cache);
    agent.register_locator(locator);
    agent.register_graph_loader(registry);
    Ok(agent)
}

#[test]
fn test_cloned_graphs_are_independent_deep_copies() -> Result<()> {
    let agent = graph_agent(CachePolicy::Simple)?;
    let key = AssetKey::new("scenes/studio.cwb");

    let first = agent.load_cloned::<SavableGraph>(&key)?;
    let second = agent.load_cloned::<SavableGraph>(&key)?;
    let master = agent.load_shared::<SavableGraph>(&key)?;

    assert!(!first.ptr_eq(&second));
    assert_ne!(first.roots()[0], second.roots()[0]);
    assert_ne!(first.roots()[0], master.roots()[0]);

    // Shared structure survives the copy.
    let key_light = first.root_as::<Light>(0).unwrap();
    let fill = first.root_as::<Light>(1).unwrap();
    let target = fill.read().unwrap().target.clone().unwrap();
    assert!(Arc::ptr_eq(&target, &key_light));

    key_light.write().unwrap().intensity = 10.0;
    let untouched = second.root_as::<Light>(0).unwrap();
    assert_eq!(untouched.read().unwrap().intensity, 3.0);

    let stats = agent.stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.hits, 2);
    assert!(agent.check_consistency().is_empty());
    Ok(())
}

#[test]
fn test_weak_clone_cache_drops_master_with_its_last_clone() -> Result<()> {
    let agent = graph_agent(CachePolicy::WeakRefClone)?;
    let key = AssetKey::new("scenes/studio.cwb");

    let first = agent.load_cloned::<SavableGraph>(&key)?;
    let second = agent.load_cloned::<SavableGraph>(&key)?;
    assert_eq!(agent.cache().len(), 1);
    assert_eq!(agent.stats().loads, 1);

    drop(first);
    assert_eq!(agent.cache().len(), 1);
    drop(second);
    assert_eq!(agent.cache().len(), 0);

    // The next request repopulates.
    let _third = agent.load_cloned::<SavableGraph>(&key)?;
    assert_eq!(agent.stats().loads, 2);
    Ok(())
}
