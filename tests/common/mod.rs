#![allow(dead_code)]

use asset_cache::{Asset, AssetError, AssetLoader, AssetRegistry, Descriptor};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Loader whose loads block until `open()` is called
pub struct MockLoader {
    loads: AtomicUsize,
    instances: AtomicUsize,
    gate: watch::Sender<bool>,
    fail_load: AtomicBool,
    fail_instance: AtomicBool,
}

impl MockLoader {
    pub fn gated() -> Arc<Self> {
        Self::with_gate(false)
    }

    pub fn open_gate() -> Arc<Self> {
        Self::with_gate(true)
    }

    fn with_gate(open: bool) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            instances: AtomicUsize::new(0),
            gate: watch::channel(open).0,
            fail_load: AtomicBool::new(false),
            fail_instance: AtomicBool::new(false),
        })
    }

    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn fail_loads(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    pub fn fail_instances(&self) {
        self.fail_instance.store(true, Ordering::SeqCst);
    }

    /// Let subsequent loads and instances succeed again
    pub fn heal(&self) {
        self.fail_load.store(false, Ordering::SeqCst);
        self.fail_instance.store(false, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn instances(&self) -> usize {
        self.instances.load(Ordering::SeqCst)
    }
}

impl AssetLoader for MockLoader {
    type Data = Value;
    type Instance = String;

    async fn load(&self, key: &str, cancel: CancellationToken) -> asset_cache::Result<Value> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => return Err(AssetError::Cancelled),
            _ = gate.wait_for(|open| *open) => {}
        }

        if self.fail_load.load(Ordering::SeqCst) {
            return Err(AssetError::LoadFailed(format!("{key}: backend unavailable")));
        }
        Ok(json!({ "key": key }))
    }

    async fn create_instance(&self, data: &Arc<Value>) -> asset_cache::Result<String> {
        self.instances.fetch_add(1, Ordering::SeqCst);
        if self.fail_instance.load(Ordering::SeqCst) {
            return Err(AssetError::InstanceFailed("mesh upload rejected".into()));
        }
        Ok(format!("instance of {}", data["key"]))
    }
}

pub fn spawn(
    loader: &Arc<MockLoader>,
    registry: &Arc<AssetRegistry>,
    path: &str,
) -> Asset<MockLoader> {
    Asset::builder(loader.clone(), Descriptor::new(path))
        .registry(registry.clone())
        .build()
}

pub fn refs(registry: &AssetRegistry, key: &str) -> usize {
    registry
        .existing_namespace::<MockLoader>()
        .map_or(0, |namespace| namespace.refs(key))
}

pub fn contains(registry: &AssetRegistry, key: &str) -> bool {
    registry
        .existing_namespace::<MockLoader>()
        .is_some_and(|namespace| namespace.contains(key))
}
