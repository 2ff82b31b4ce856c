use asset_cache::{diff, merge, AssetRegistry, Descriptor, JsonLoader};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn bench_namespace_acquire_release(c: &mut Criterion) {
    c.bench_function("namespace_acquire_release", |b| {
        let registry = AssetRegistry::new();
        let namespace = registry.namespace::<JsonLoader>();
        let keys: Vec<String> = (0..1000).map(|i| format!("mesh_{i}.json")).collect();
        let mut i = 0;

        b.iter(|| {
            // Acquire then release the last ref, which evicts the entry
            let key = &keys[i % keys.len()];
            let mut table = namespace.lock();
            table.get_or_create(black_box(key)).acquire();
            if let Some(entry) = table.get_mut(key) {
                if entry.release() == 0 {
                    table.delete(key);
                }
            }
            i += 1;
        });
    });
}

fn bench_namespace_hit(c: &mut Criterion) {
    let registry = AssetRegistry::new();
    let namespace = registry.namespace::<JsonLoader>();

    // Pre-populate
    for i in 0..1000 {
        namespace
            .lock()
            .get_or_create(&format!("mesh_{i}.json"))
            .acquire();
    }

    c.bench_function("namespace_hit", |b| {
        b.iter(|| {
            namespace.lock().get_or_create(black_box("mesh_500.json")).refs();
        });
    });
}

fn bench_descriptor_defaults(c: &mut Criterion) {
    let defaults = json!({
        "scale": 1.0,
        "material": { "albedo": [1.0, 1.0, 1.0], "roughness": 0.5 },
        "cast_shadows": true,
    });
    let defaults_map = defaults.as_object().cloned().unwrap_or_default();
    let descriptor = Descriptor::new("mesh.json")
        .with("scale", 2.0)
        .with("material", json!({ "roughness": 0.8 }));

    c.bench_function("descriptor_with_defaults", |b| {
        b.iter(|| black_box(&descriptor).with_defaults(black_box(&defaults_map)));
    });

    let merged = merge(&defaults, &descriptor.to_value());
    c.bench_function("descriptor_diff", |b| {
        b.iter(|| diff(black_box(&defaults), black_box(&merged)));
    });
}

criterion_group!(
    benches,
    bench_namespace_acquire_release,
    bench_namespace_hit,
    bench_descriptor_defaults
);
criterion_main!(benches);
