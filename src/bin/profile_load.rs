#![allow(dead_code, unused_imports)]

use asset_cache::{Asset, AssetConfig, AssetLoader, AssetRegistry, Descriptor};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Serves generated documents without touching the disk
struct InMemoryLoader;

impl AssetLoader for InMemoryLoader {
    type Data = Value;
    type Instance = usize;

    async fn load(&self, key: &str, _cancel: CancellationToken) -> asset_cache::Result<Value> {
        tokio::task::yield_now().await;
        Ok(json!({ "key": key, "vertices": vec![0.0f32; 64] }))
    }

    async fn create_instance(&self, data: &Arc<Value>) -> asset_cache::Result<usize> {
        Ok(data["vertices"].as_array().map_or(0, Vec::len))
    }
}

#[cfg(feature = "profiling")]
#[tracing::instrument(skip(loader, registry))]
async fn profile_loads(
    loader: Arc<InMemoryLoader>,
    registry: Arc<AssetRegistry>,
    handles: usize,
    keys: usize,
) {
    let assets: Vec<_> = (0..handles)
        .map(|i| {
            Asset::builder(loader.clone(), Descriptor::new(format!("mesh_{}.json", i % keys)))
                .registry(registry.clone())
                .build()
        })
        .collect();

    for (i, asset) in assets.iter().enumerate() {
        if i % 1_000 == 0 {
            tracing::info!("Waiting on asset {}/{}", i, handles);
        }
        asset.loaded().await;
    }

    let stats = registry.namespace::<InMemoryLoader>().stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_ratio = stats.hit_ratio(),
        "cache stats"
    );

    for asset in &assets {
        asset.unload();
    }
}

#[cfg(feature = "profiling")]
#[tokio::main(flavor = "current_thread")]
async fn main() -> asset_cache::Result<()> {
    let config = AssetConfig {
        log_filter: "trace".to_string(),
        log_file: Some("trace.json".into()),
        ..AssetConfig::default()
    };
    let _guard = asset_cache::profiling::init_tracing(&config)?;

    let loader = Arc::new(InMemoryLoader);
    let registry = Arc::new(AssetRegistry::new());

    println!("Warming up...");
    {
        let asset = Asset::builder(loader.clone(), Descriptor::new("warmup.json"))
            .registry(registry.clone())
            .build();
        asset.loaded().await;
    }

    println!("Profiling 10k handles over 100 keys...");
    let start = Instant::now();
    profile_loads(loader, registry, 10_000, 100).await;
    println!("Loaded 10k handles in: {:?}", start.elapsed());
    Ok(())
}

#[cfg(not(feature = "profiling"))]
fn main() {
    println!("profile_load binary requires --features profiling");
}
