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

//! Registry of cache namespaces, one per asset loader type

use crate::assets::cache::CacheNamespace;
use crate::assets::loader::AssetLoader;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Type-erased view of a namespace for registry-wide maintenance
trait ErasedNamespace: Send + Sync {
    fn abort_all(&self) -> usize;
    fn clear_all(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<D: Send + Sync + 'static> ErasedNamespace for CacheNamespace<D> {
    fn abort_all(&self) -> usize {
        CacheNamespace::abort_all(self)
    }

    fn clear_all(&self) {
        CacheNamespace::clear_all(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

static GLOBAL: OnceLock<Arc<AssetRegistry>> = OnceLock::new();

/// Maps asset loader types to their cache namespace.
///
/// Two loader types never share entries, even for textually equal keys.
/// Namespaces are created on first use and live until cleared.
pub struct AssetRegistry {
    namespaces: RwLock<AHashMap<TypeId, Arc<dyn ErasedNamespace>>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(AHashMap::new()),
        }
    }

    /// Process-wide registry used by handles built without an explicit one
    pub fn global() -> Arc<AssetRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(AssetRegistry::new())))
    }

    /// Namespace for `L`, created if absent
    pub fn namespace<L: AssetLoader>(&self) -> Arc<CacheNamespace<L::Data>> {
        if let Some(namespace) = self.existing_namespace::<L>() {
            return namespace;
        }

        let mut namespaces = self.namespaces.write();
        // `TypeId::of::<L>()` fixes `L::Data`, so a stored namespace always downcasts
        if let Some(erased) = namespaces.get(&TypeId::of::<L>()) {
            if let Ok(namespace) = Arc::clone(erased).into_any().downcast() {
                return namespace;
            }
        }

        let type_name = std::any::type_name::<L>();
        let namespace = Arc::new(CacheNamespace::<L::Data>::new(type_name));
        namespaces.insert(TypeId::of::<L>(), namespace.clone());
        debug!(asset_type = type_name, "namespace created");
        namespace
    }

    /// Namespace for `L` if one has been created
    pub fn existing_namespace<L: AssetLoader>(&self) -> Option<Arc<CacheNamespace<L::Data>>> {
        let erased = self.namespaces.read().get(&TypeId::of::<L>())?.clone();
        erased.into_any().downcast::<CacheNamespace<L::Data>>().ok()
    }

    /// Cancel every in-flight load of type `L`. Ref counts and entries stay.
    pub fn abort_all<L: AssetLoader>(&self) -> usize {
        self.existing_namespace::<L>()
            .map_or(0, |namespace| namespace.abort_all())
    }

    /// Abort and discard the whole namespace of type `L`, regardless of refs
    pub fn clear_cache<L: AssetLoader>(&self) {
        let removed = self.namespaces.write().remove(&TypeId::of::<L>());
        if let Some(namespace) = removed {
            namespace.clear_all();
        }
    }

    /// Abort and discard every namespace
    pub fn clear_all(&self) {
        let drained: Vec<_> = self.namespaces.write().drain().map(|(_, ns)| ns).collect();
        for namespace in drained {
            namespace.clear_all();
        }
    }

    /// Cancel in-flight loads of every type
    pub fn abort_everything(&self) -> usize {
        let namespaces: Vec<_> = self.namespaces.read().values().cloned().collect();
        namespaces.iter().map(|namespace| namespace.abort_all()).sum()
    }

    pub fn namespace_count(&self) -> usize {
        self.namespaces.read().len()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
