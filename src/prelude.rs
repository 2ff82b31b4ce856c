//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use asset_cache::prelude::*;
//! ```

pub use crate::assets::{
    Asset, AssetFailure, AssetLoader, AssetRegistry, AssetState, BinaryLoader, JsonLoader,
    TextLoader,
};
pub use crate::config::AssetConfig;
pub use crate::descriptor::{Defaults, Descriptor};
pub use crate::error::{AssetError, Result};
pub use crate::event::{AssetEvent, AssetEventKind};
pub use crate::watchable::WatchId;
