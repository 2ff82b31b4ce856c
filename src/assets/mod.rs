// Asset Cache Module
//
// Provides reference-counted asset handles with:
// - Single-flight loading per key
// - Cancellation when the last reference goes away
// - Per-handle instances built from shared data

pub mod cache;
pub mod handle;
pub mod loader;
pub mod registry;
pub mod state;

pub use cache::{CacheEntry, CacheNamespace, CacheStats, CacheTable, LoadOutcome, SharedLoad};
pub use handle::{Asset, AssetBuilder, AssetEventOf};
pub use loader::{AssetLoader, BinaryLoader, JsonLoader, TextLoader};
pub use registry::AssetRegistry;
pub use state::{AssetFailure, AssetState, ABORTED_MESSAGE, LOAD_FAILED_MESSAGE};
