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

//! Per-type cache tables
//!
//! A [`CacheNamespace`] maps keys to [`CacheEntry`] values for one asset type.
//! Entries only do bookkeeping (reference count, the shared in-flight load,
//! the resolved data). Deciding when to start, share, cancel or evict a load
//! is up to the asset handle, which does it while holding the table lock.

use crate::error::AssetError;
use ahash::AHashMap;
use futures::future::{BoxFuture, Shared};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Result of a shared load
pub type LoadOutcome<D> = Result<Arc<D>, AssetError>;

/// Load operation every handle on a key awaits
pub type SharedLoad<D> = Shared<BoxFuture<'static, LoadOutcome<D>>>;

/// In-flight operation stored on an entry
struct PendingLoad<D> {
    id: u64,
    load: SharedLoad<D>,
    cancel: CancellationToken,
}

/// Bookkeeping for one key
pub struct CacheEntry<D> {
    refs: usize,
    pending: Option<PendingLoad<D>>,
    data: Option<Arc<D>>,
}

impl<D> CacheEntry<D> {
    fn new() -> Self {
        Self {
            refs: 0,
            pending: None,
            data: None,
        }
    }

    pub fn refs(&self) -> usize {
        self.refs
    }

    /// Increment the reference count, returning the new count
    pub fn acquire(&mut self) -> usize {
        self.refs += 1;
        self.refs
    }

    /// Decrement the reference count, returning the new count
    pub fn release(&mut self) -> usize {
        self.refs = self.refs.saturating_sub(1);
        self.refs
    }

    /// Id and handle of the in-flight load
    pub fn pending(&self) -> Option<(u64, SharedLoad<D>)> {
        self.pending
            .as_ref()
            .map(|pending| (pending.id, pending.load.clone()))
    }

    pub fn pending_id(&self) -> Option<u64> {
        self.pending.as_ref().map(|pending| pending.id)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Store a new in-flight load together with its cancellation token
    pub fn set_pending(&mut self, id: u64, load: SharedLoad<D>, cancel: CancellationToken) {
        self.pending = Some(PendingLoad { id, load, cancel });
    }

    /// Drop the in-flight load without cancelling it
    pub fn clear_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn data(&self) -> Option<Arc<D>> {
        self.data.clone()
    }

    /// Store resolved data; clears the in-flight load
    pub fn resolve(&mut self, data: Arc<D>) {
        self.pending = None;
        self.data = Some(data);
    }

    pub fn clear_data(&mut self) {
        self.data = None;
    }

    /// Trigger cancellation of the in-flight load. Returns false when
    /// nothing was in flight or it was already cancelled.
    pub fn cancel(&self) -> bool {
        match &self.pending {
            Some(pending) if !pending.cancel.is_cancelled() => {
                pending.cancel.cancel();
                true
            }
            _ => false,
        }
    }
}

/// Cache statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Acquisitions that attached to existing data or an in-flight load
    pub hits: u64,
    /// Acquisitions that had to start a load
    pub misses: u64,
    /// Entries removed from the table
    pub evictions: u64,
    /// In-flight loads cancelled
    pub cancellations: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }
}

/// Key → entry table for one asset type
pub struct CacheTable<D> {
    type_name: &'static str,
    entries: AHashMap<String, CacheEntry<D>>,
    next_operation: u64,
    stats: CacheStats,
}

impl<D> CacheTable<D> {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            entries: AHashMap::new(),
            next_operation: 1,
            stats: CacheStats::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry<D>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry<D>> {
        self.entries.get_mut(key)
    }

    /// Existing entry for `key`, or a fresh zero-ref entry
    pub fn get_or_create(&mut self, key: &str) -> &mut CacheEntry<D> {
        let type_name = self.type_name;
        self.entries.entry(key.to_string()).or_insert_with(|| {
            trace!(asset_type = type_name, key, "cache entry created");
            CacheEntry::new()
        })
    }

    /// Remove an entry unconditionally
    pub fn delete(&mut self, key: &str) -> Option<CacheEntry<D>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.stats.evictions += 1;
            debug!(asset_type = self.type_name, key, "cache entry evicted");
        }
        removed
    }

    /// Cancel every in-flight load. Entries and ref counts are left alone.
    pub fn abort_all(&mut self) -> usize {
        let cancelled = self.entries.values().filter(|entry| entry.cancel()).count();
        self.stats.cancellations += cancelled as u64;
        if cancelled > 0 {
            debug!(asset_type = self.type_name, cancelled, "aborted in-flight loads");
        }
        cancelled
    }

    /// Abort everything, then empty the table
    pub fn clear_all(&mut self) {
        self.abort_all();
        let cleared = self.entries.len();
        self.entries.clear();
        debug!(asset_type = self.type_name, cleared, "cache cleared");
    }

    /// Fresh id for a load operation
    pub fn next_operation_id(&mut self) -> u64 {
        let id = self.next_operation;
        self.next_operation += 1;
        id
    }

    pub fn record_hit(&mut self) {
        self.stats.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.stats.misses += 1;
    }

    pub fn record_cancellation(&mut self) {
        self.stats.cancellations += 1;
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lock-guarded [`CacheTable`] shared by every handle of one asset type
pub struct CacheNamespace<D> {
    table: Mutex<CacheTable<D>>,
}

impl<D> CacheNamespace<D> {
    /// Create an empty namespace. `type_name` only labels log output.
    pub fn new(type_name: &'static str) -> Self {
        Self {
            table: Mutex::new(CacheTable::new(type_name)),
        }
    }

    /// Lock the table. Never hold the guard across an `.await`.
    pub fn lock(&self) -> MutexGuard<'_, CacheTable<D>> {
        self.table.lock()
    }

    pub fn abort_all(&self) -> usize {
        self.lock().abort_all()
    }

    pub fn clear_all(&self) {
        self.lock().clear_all();
    }

    /// Reference count for `key`; 0 when absent
    pub fn refs(&self, key: &str) -> usize {
        self.lock().get(key).map_or(0, CacheEntry::refs)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().get(key).is_some()
    }

    /// Resolved data for `key`, without creating an entry
    pub fn data(&self, key: &str) -> Option<Arc<D>> {
        self.lock().get(key).and_then(CacheEntry::data)
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
