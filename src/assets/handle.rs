// Copyright 2024 Saptak Santra
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

//! Asset handles
//!
//! An [`Asset`] is one consumer's view of a cached resource. Constructing it
//! takes a reference on the cache entry for its key and either attaches to
//! the load already in flight for that key or starts one. Every handle on the
//! key awaits the same operation, then builds its own private instance.
//!
//! Reference bookkeeping happens synchronously, under the namespace lock, before
//! the constructor (or `set`) returns. Only the wait for data and instance
//! creation run on a spawned Tokio task.

use crate::assets::cache::{CacheNamespace, LoadOutcome, SharedLoad};
use crate::assets::loader::AssetLoader;
use crate::assets::registry::AssetRegistry;
use crate::assets::state::{AssetFailure, AssetState};
use crate::descriptor::{Defaults, Descriptor};
use crate::error::AssetError;
use crate::event::{AssetEvent, AssetEventKind};
use crate::watchable::{WatchId, Watchable};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Event type emitted by handles of loader `L`
pub type AssetEventOf<L> = AssetEvent<<L as AssetLoader>::Data, <L as AssetLoader>::Instance>;

/// How a handle got hold of the data for its key
enum Attachment<D> {
    Resolved(Arc<D>),
    Pending {
        namespace: Arc<CacheNamespace<D>>,
        id: u64,
        load: SharedLoad<D>,
    },
}

/// A reference taken on `key` in one particular namespace. A namespace
/// discarded by `clear_cache` never sees the release.
struct HeldRef<D> {
    namespace: Arc<CacheNamespace<D>>,
    key: String,
}

/// Last published state. `seq` orders publications so waiters can tell
/// when the matching event has been delivered.
#[derive(Clone)]
struct Published {
    seq: u64,
    state: AssetState,
}

struct HandleSlot<L: AssetLoader> {
    descriptor: Descriptor,
    key: String,
    held: Option<HeldRef<L::Data>>,
    instance: Option<Arc<L::Instance>>,
    unloaded: bool,
    /// Bumped by every load run; older runs finish silently
    generation: u64,
    /// Sequence number of the last published state
    published: u64,
    task: Option<JoinHandle<()>>,
}

struct AssetInner<L: AssetLoader> {
    loader: Arc<L>,
    registry: Arc<AssetRegistry>,
    defaults: Option<Defaults>,
    entity: Option<String>,
    referer: Vec<String>,
    events: Watchable<AssetEventOf<L>>,
    state: watch::Sender<Published>,
    /// Highest `seq` whose event has been delivered to watchers
    delivered: watch::Sender<u64>,
    slot: Mutex<HandleSlot<L>>,
}

/// Reference-counted handle to a cached asset
pub struct Asset<L: AssetLoader> {
    inner: Arc<AssetInner<L>>,
}

/// Configures an [`Asset`] before its first load starts
pub struct AssetBuilder<L: AssetLoader> {
    loader: Arc<L>,
    descriptor: Descriptor,
    defaults: Option<Defaults>,
    entity: Option<String>,
    referer: Vec<String>,
    registry: Option<Arc<AssetRegistry>>,
    events: Watchable<AssetEventOf<L>>,
}

impl<L: AssetLoader> AssetBuilder<L> {
    /// Fields merged under the descriptor wherever it omits them
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Entity whose component this handle is
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Keys of the assets that referenced this one
    pub fn referer<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.referer = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Use `registry` instead of [`AssetRegistry::global`]
    pub fn registry(mut self, registry: Arc<AssetRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Subscribe before the first load starts, so no event can be missed
    pub fn watch<F>(self, kind: AssetEventKind, callback: F) -> Self
    where
        F: Fn(&AssetEventOf<L>) + Send + Sync + 'static,
    {
        self.events.watch(kind.name(), callback);
        self
    }

    pub fn watch_all<F>(self, callback: F) -> Self
    where
        F: Fn(&AssetEventOf<L>) + Send + Sync + 'static,
    {
        self.events.watch_all(callback);
        self
    }

    /// Create the handle and begin loading.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn build(self) -> Asset<L> {
        let descriptor = match &self.defaults {
            Some(defaults) => self.descriptor.with_defaults(defaults),
            None => self.descriptor,
        };
        let key = descriptor.key();
        let (state, _) = watch::channel(Published {
            seq: 0,
            state: AssetState::Loading,
        });
        let (delivered, _) = watch::channel(0);

        let inner = Arc::new(AssetInner {
            loader: self.loader,
            registry: self.registry.unwrap_or_else(AssetRegistry::global),
            defaults: self.defaults,
            entity: self.entity,
            referer: self.referer,
            events: self.events,
            state,
            delivered,
            slot: Mutex::new(HandleSlot {
                descriptor,
                key,
                held: None,
                instance: None,
                unloaded: false,
                generation: 0,
                published: 0,
                task: None,
            }),
        });

        inner.begin_load();
        Asset { inner }
    }
}

impl<L: AssetLoader> Asset<L> {
    /// Create a handle in the global registry and begin loading.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(loader: Arc<L>, descriptor: Descriptor) -> Self {
        Self::builder(loader, descriptor).build()
    }

    pub fn builder(loader: Arc<L>, descriptor: Descriptor) -> AssetBuilder<L> {
        AssetBuilder {
            loader,
            descriptor,
            defaults: None,
            entity: None,
            referer: Vec::new(),
            registry: None,
            events: Watchable::new(),
        }
    }

    /// Replace the descriptor. Reloads only when the derived key changes.
    pub fn set(&self, descriptor: Descriptor) {
        let descriptor = match &self.inner.defaults {
            Some(defaults) => descriptor.with_defaults(defaults),
            None => descriptor,
        };
        let key = descriptor.key();

        let changed = {
            let mut slot = self.inner.slot.lock();
            let changed = slot.key != key;
            slot.descriptor = descriptor;
            slot.key = key;
            changed
        };

        if changed {
            self.inner.begin_load();
        }
    }

    /// Release this handle's reference. The last reference on a key cancels
    /// its in-flight load and evicts the entry. No-op if nothing is held.
    pub fn unload(&self) {
        self.inner.unload();
    }

    /// Wait until no load is in progress (`Ready`, `Unloaded` or `Error`)
    pub async fn loaded(&self) -> AssetState {
        self.wait_for(AssetState::is_settled).await
    }

    /// Wait until the state satisfies `predicate`, returning that state.
    /// Resolves only after watchers have received the event that came with
    /// the state.
    pub async fn wait_for<F>(&self, mut predicate: F) -> AssetState
    where
        F: FnMut(&AssetState) -> bool,
    {
        let mut states = self.inner.state.subscribe();
        let matched = match states.wait_for(|published| predicate(&published.state)).await {
            Ok(published) => published.clone(),
            Err(_) => return self.state(),
        };

        let mut delivered = self.inner.delivered.subscribe();
        let _ = delivered.wait_for(|seq| *seq >= matched.seq).await;
        matched.state
    }

    pub fn state(&self) -> AssetState {
        self.inner.state.borrow().state.clone()
    }

    pub fn error(&self) -> Option<AssetFailure> {
        self.inner.state.borrow().state.failure().cloned()
    }

    /// Descriptor with defaults applied
    pub fn descriptor(&self) -> Descriptor {
        self.inner.slot.lock().descriptor.clone()
    }

    /// Cache identity of this handle
    pub fn key(&self) -> String {
        self.inner.slot.lock().key.clone()
    }

    /// Stringified descriptor path
    pub fn path(&self) -> String {
        self.key()
    }

    pub fn defaults(&self) -> Option<&Defaults> {
        self.inner.defaults.as_ref()
    }

    pub fn entity(&self) -> Option<&str> {
        self.inner.entity.as_deref()
    }

    pub fn referer(&self) -> &[String] {
        &self.inner.referer
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.inner.loader
    }

    pub fn registry(&self) -> &Arc<AssetRegistry> {
        &self.inner.registry
    }

    /// Shared data for the current key, if resolved. Never creates an entry.
    pub fn data(&self) -> Option<Arc<L::Data>> {
        let key = self.key();
        self.inner
            .registry
            .existing_namespace::<L>()?
            .data(&key)
    }

    /// This handle's private instance
    pub fn instance(&self) -> Option<Arc<L::Instance>> {
        self.inner.slot.lock().instance.clone()
    }

    /// Subscribe to one kind of lifecycle event
    pub fn watch<F>(&self, kind: AssetEventKind, callback: F) -> WatchId
    where
        F: Fn(&AssetEventOf<L>) + Send + Sync + 'static,
    {
        self.inner.events.watch(kind.name(), callback)
    }

    pub fn watch_all<F>(&self, callback: F) -> WatchId
    where
        F: Fn(&AssetEventOf<L>) + Send + Sync + 'static,
    {
        self.inner.events.watch_all(callback)
    }

    pub fn unwatch(&self, id: WatchId) -> bool {
        self.inner.events.unwatch(id)
    }

    /// Storable form: the descriptor minus fields equal to the defaults
    pub fn to_json(&self) -> Value {
        self.inner
            .slot
            .lock()
            .descriptor
            .diff_from(self.inner.defaults.as_ref())
    }

    /// Cancel every in-flight load of this type in the global registry.
    /// Entries and ref counts are left as they are.
    pub fn abort_all() -> usize {
        AssetRegistry::global().abort_all::<L>()
    }

    /// Abort and discard this type's namespace in the global registry
    pub fn clear_cache() {
        AssetRegistry::global().clear_cache::<L>();
    }
}

impl<L: AssetLoader> AssetInner<L> {
    /// Steps that must not interleave with other handles: release the
    /// previous reference, take one on the current key, start or attach to
    /// the load. The rest runs on a spawned task.
    fn begin_load(self: &Arc<Self>) {
        let mut slot = self.slot.lock();

        let previous = slot.instance.take();
        self.release(&mut slot);

        slot.unloaded = false;
        slot.generation += 1;
        let generation = slot.generation;
        let key = slot.key.clone();

        let namespace = self.registry.namespace::<L>();
        let attachment = self.attach(&namespace, &key);
        slot.held = Some(HeldRef {
            namespace,
            key: key.clone(),
        });
        let seq = self.publish(&mut slot, AssetState::Loading);

        if let Some(task) = slot.task.take() {
            task.abort();
        }
        let inner = Arc::clone(self);
        slot.task = Some(tokio::spawn(inner.finish_load(
            generation,
            key,
            attachment,
            previous.clone(),
        )));
        drop(slot);

        if previous.is_some() {
            self.events.notify(&AssetEvent::Unload);
        }
        self.mark_delivered(seq);
    }

    /// Take a reference on `key` and return the data or the shared load
    fn attach(
        &self,
        namespace: &Arc<CacheNamespace<L::Data>>,
        key: &str,
    ) -> Attachment<L::Data> {
        let mut table = namespace.lock();

        let entry = table.get_or_create(key);
        let refs = entry.acquire();
        let existing = match (entry.data(), entry.pending()) {
            (Some(data), _) => Some(Attachment::Resolved(data)),
            (None, Some((id, load))) => Some(Attachment::Pending {
                namespace: Arc::clone(namespace),
                id,
                load,
            }),
            (None, None) => None,
        };

        if let Some(attachment) = existing {
            table.record_hit();
            trace!(key, refs, "attached to cached asset");
            return attachment;
        }

        let id = table.next_operation_id();
        let cancel = CancellationToken::new();
        let load = self.start_load(key, cancel.clone());
        table.get_or_create(key).set_pending(id, load.clone(), cancel);
        table.record_miss();
        debug!(asset_type = table.type_name(), key, "load started");

        Attachment::Pending {
            namespace: Arc::clone(namespace),
            id,
            load,
        }
    }

    fn start_load(&self, key: &str, cancel: CancellationToken) -> SharedLoad<L::Data> {
        let loader = Arc::clone(&self.loader);
        let key = key.to_string();

        #[cfg(feature = "profiling")]
        let span = tracing::info_span!("asset.load", key = %key);

        let load = async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AssetError::Cancelled),
                loaded = loader.load(&key, cancel.clone()) => loaded.map(Arc::new),
            }
        };

        #[cfg(feature = "profiling")]
        let load = tracing::Instrument::instrument(load, span);

        load.boxed().shared()
    }

    async fn finish_load(
        self: Arc<Self>,
        generation: u64,
        key: String,
        attachment: Attachment<L::Data>,
        previous: Option<Arc<L::Instance>>,
    ) {
        let outcome = match attachment {
            Attachment::Resolved(data) => Ok(data),
            Attachment::Pending {
                namespace,
                id,
                load,
            } => {
                let outcome = load.await;
                Self::reconcile(&namespace, &key, id, &outcome);
                outcome
            }
        };

        let data = match outcome {
            Ok(data) => data,
            Err(err) => return self.fail(generation, &key, err),
        };

        let Some(seq) = self.advance(generation, AssetState::Creating) else {
            return;
        };
        self.events.notify(&AssetEvent::DataLoad(Arc::clone(&data)));
        self.mark_delivered(seq);

        let instance = match self.loader.create_instance(&data).await {
            Ok(instance) => Arc::new(instance),
            Err(err) => return self.fail(generation, &key, err),
        };

        let seq = {
            let mut slot = self.slot.lock();
            if !Self::is_current(&slot, generation) {
                return;
            }
            slot.instance = Some(Arc::clone(&instance));
            self.publish(&mut slot, AssetState::Ready)
        };

        trace!(key = %key, "asset ready");
        self.events
            .notify(&AssetEvent::InstanceCreate { instance, previous });
        self.mark_delivered(seq);
    }

    /// Record the outcome of load `id` on the entry, unless the entry has
    /// since been evicted or moved on to another load
    fn reconcile(
        namespace: &CacheNamespace<L::Data>,
        key: &str,
        id: u64,
        outcome: &LoadOutcome<L::Data>,
    ) {
        let mut table = namespace.lock();
        let Some(entry) = table.get_mut(key) else {
            return;
        };
        if entry.pending_id() != Some(id) {
            return;
        }
        match outcome {
            Ok(data) => entry.resolve(Arc::clone(data)),
            Err(_) => {
                entry.clear_pending();
            }
        }
    }

    fn is_current(slot: &HandleSlot<L>, generation: u64) -> bool {
        slot.generation == generation && !slot.unloaded
    }

    /// Publish `state` and return its sequence number. Call
    /// [`mark_delivered`](Self::mark_delivered) once the matching event has
    /// gone out.
    fn publish(&self, slot: &mut HandleSlot<L>, state: AssetState) -> u64 {
        slot.published += 1;
        let seq = slot.published;
        self.state.send_replace(Published { seq, state });
        seq
    }

    fn mark_delivered(&self, seq: u64) {
        self.delivered.send_if_modified(|delivered| {
            if seq > *delivered {
                *delivered = seq;
                true
            } else {
                false
            }
        });
    }

    fn advance(&self, generation: u64, state: AssetState) -> Option<u64> {
        let mut slot = self.slot.lock();
        if !Self::is_current(&slot, generation) {
            return None;
        }
        Some(self.publish(&mut slot, state))
    }

    /// Failures surface on unloaded handles too: error outranks unloaded
    fn fail(&self, generation: u64, key: &str, err: AssetError) {
        let failure = AssetFailure::from(err);
        let seq = {
            let mut slot = self.slot.lock();
            if slot.generation != generation {
                return;
            }
            self.publish(&mut slot, AssetState::Error(failure.clone()))
        };

        match &failure {
            AssetFailure::Aborted => debug!(key, "asset load aborted"),
            AssetFailure::LoadFailed { detail } => warn!(key, %detail, "asset load failed"),
        }
        self.events.notify(&AssetEvent::Error(failure));
        self.mark_delivered(seq);
    }

    fn unload(&self) {
        let seq = {
            let mut slot = self.slot.lock();
            if !self.release(&mut slot) {
                return;
            }
            slot.instance = None;
            slot.unloaded = true;

            let error = self.state.borrow().state.failure().cloned();
            let state = AssetState::derive(error.as_ref(), true, false, false);
            self.publish(&mut slot, state)
        };
        self.events.notify(&AssetEvent::Unload);
        self.mark_delivered(seq);
    }

    /// Give back the reference this handle holds, in the namespace it was
    /// taken from. At zero refs the entry's load is cancelled and the entry
    /// removed. Returns false if nothing was released.
    fn release(&self, slot: &mut HandleSlot<L>) -> bool {
        let Some(HeldRef { namespace, key }) = slot.held.take() else {
            return false;
        };
        let mut table = namespace.lock();
        let Some(entry) = table.get_mut(&key) else {
            return false;
        };
        if entry.refs() == 0 {
            return false;
        }

        if entry.release() == 0 {
            let cancelled = entry.cancel();
            table.delete(&key);
            if cancelled {
                table.record_cancellation();
                debug!(key = %key, "last reference released, load cancelled");
            }
        }
        true
    }
}

impl<L: AssetLoader> Drop for Asset<L> {
    fn drop(&mut self) {
        let mut slot = self.inner.slot.lock();
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        self.inner.release(&mut slot);
    }
}

impl<L: AssetLoader> Serialize for Asset<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<L: AssetLoader> fmt::Debug for Asset<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("key", &self.key())
            .field("state", &self.state())
            .field("entity", &self.inner.entity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves `{ "key": <key> }` once the gate opens
    struct GatedLoader {
        loads: AtomicUsize,
        gate: watch::Sender<bool>,
    }

    impl GatedLoader {
        fn new(open: bool) -> Arc<Self> {
            Arc::new(Self {
                loads: AtomicUsize::new(0),
                gate: watch::channel(open).0,
            })
        }

        fn open(&self) {
            self.gate.send_replace(true);
        }
    }

    impl AssetLoader for GatedLoader {
        type Data = Value;
        type Instance = Vec<String>;

        async fn load(&self, key: &str, _cancel: CancellationToken) -> crate::Result<Value> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let mut gate = self.gate.subscribe();
            let _ = gate.wait_for(|open| *open).await;
            Ok(json!({ "key": key }))
        }

        async fn create_instance(&self, data: &Arc<Value>) -> crate::Result<Vec<String>> {
            Ok(vec![data["key"].to_string()])
        }
    }

    fn handle(
        loader: &Arc<GatedLoader>,
        registry: &Arc<AssetRegistry>,
        path: &str,
    ) -> Asset<GatedLoader> {
        Asset::builder(loader.clone(), Descriptor::new(path))
            .registry(registry.clone())
            .build()
    }

    #[tokio::test]
    async fn test_refs_taken_before_constructor_returns() {
        let loader = GatedLoader::new(false);
        let registry = Arc::new(AssetRegistry::new());

        let a = handle(&loader, &registry, "a.json");
        assert_eq!(registry.namespace::<GatedLoader>().refs("a.json"), 1);
        assert_eq!(a.state(), AssetState::Loading);

        loader.open();
        assert_eq!(a.loaded().await, AssetState::Ready);
        assert_eq!(a.instance().as_deref(), Some(&vec!["\"a.json\"".to_string()]));
        assert_eq!(a.data().as_deref(), Some(&json!({ "key": "a.json" })));
    }

    #[tokio::test]
    async fn test_second_unload_is_noop() {
        let loader = GatedLoader::new(true);
        let registry = Arc::new(AssetRegistry::new());
        let a = handle(&loader, &registry, "a.json");
        let b = handle(&loader, &registry, "a.json");
        a.loaded().await;
        b.loaded().await;

        a.unload();
        a.unload();
        assert_eq!(registry.namespace::<GatedLoader>().refs("a.json"), 1);
        assert_eq!(b.state(), AssetState::Ready);
    }

    #[tokio::test]
    async fn test_drop_releases_reference() {
        let loader = GatedLoader::new(true);
        let registry = Arc::new(AssetRegistry::new());
        let a = handle(&loader, &registry, "a.json");
        a.loaded().await;

        drop(a);
        assert!(!registry.namespace::<GatedLoader>().contains("a.json"));
    }

    #[tokio::test]
    async fn test_defaults_applied_and_diffed() {
        let loader = GatedLoader::new(true);
        let registry = Arc::new(AssetRegistry::new());
        let defaults = json!({ "scale": 1.0, "cast_shadows": true });

        let asset = Asset::builder(loader, Descriptor::new("a.json").with("scale", 2.0))
            .defaults(defaults.as_object().cloned().unwrap_or_default())
            .entity("player")
            .referer(["level.json"])
            .registry(registry)
            .build();

        assert_eq!(asset.descriptor().get("cast_shadows"), Some(&json!(true)));
        assert_eq!(asset.to_json(), json!({ "path": "a.json", "scale": 2.0 }));
        assert_eq!(
            serde_json::to_value(&asset).unwrap(),
            json!({ "path": "a.json", "scale": 2.0 })
        );
        assert_eq!(asset.entity(), Some("player"));
        assert_eq!(asset.referer(), ["level.json".to_string()]);
    }
}
