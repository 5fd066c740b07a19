use clockwork_core::export::{
    new_node, ExportError, InputCapsule, Node, OutputCapsule, Savable, SavableRef, WeakNode,
};
use clockwork_io::{BinaryExporter, BinaryImporter, SchemaRegistry};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;

#[derive(Default)]
struct Joint {
    name: String,
    weights: Vec<f32>,
    parent: Option<WeakNode<Joint>>,
    children: Vec<Node<Joint>>,
}

impl Savable for Joint {
    const SCHEMA_NAME: &'static str = "Joint";

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), ExportError> {
        out.write_string(Some(&self.name), "name", None)?;
        out.write_f32_array(&self.weights, "weights", &[])?;
        out.write_weak_node(self.parent.as_ref(), "parent")?;
        out.write_node_list(&self.children, "children")
    }

    fn read(&mut self, input: &mut dyn InputCapsule) -> Result<(), ExportError> {
        self.name = input.read_string("name", None)?.unwrap_or_default();
        self.weights = input.read_f32_array("weights", &[])?;
        self.parent = input.read_weak_node("parent")?;
        self.children = input.read_node_list("children")?;
        Ok(())
    }
}

/// A ten-ary tree of joints, each linked back to its parent.
fn build_tree(count: usize) -> SavableRef {
    let joints: Vec<Node<Joint>> = (0..count)
        .map(|i| {
            new_node(Joint {
                name: format!("joint_{i}"),
                weights: vec![i as f32; 8],
                ..Default::default()
            })
        })
        .collect();
    for (i, joint) in joints.iter().enumerate().skip(1) {
        let parent = &joints[(i - 1) / 10];
        joint.write().unwrap().parent = Some(Arc::downgrade(parent));
        parent.write().unwrap().children.push(joint.clone());
    }
    SavableRef::from_node(&joints[0])
}

fn bench_export(c: &mut Criterion) {
    let root = build_tree(10_000);
    let mut registry = SchemaRegistry::new();
    registry.register::<Joint>();
    let importer = BinaryImporter::new(Arc::new(registry));
    let exporter = BinaryExporter::new();
    let bytes = exporter.save_to_vec(&[root.clone()]).unwrap();

    let mut group = c.benchmark_group("Binary Graph");

    group.bench_function("Save (10k joints, cyclic)", |b| {
        b.iter(|| black_box(exporter.save_to_vec(black_box(&[root.clone()])).unwrap()));
    });

    group.bench_function("Load (10k joints, cyclic)", |b| {
        b.iter(|| black_box(importer.load_from_slice(black_box(&bytes)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_export);
criterion_main!(benches);
