use crate::config::{AssetConfig, DEFAULT_ASSET_ROOT};
use crate::error::{AssetError, Result};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Type-specific hooks for fetching, decoding and instantiating an asset.
///
/// The loader type doubles as the asset type identifier: every handle built
/// with the same `L` shares one cache namespace. Only `Data`/`Instance` are
/// required; the default hooks read `root()/key` from disk and decode JSON.
pub trait AssetLoader: Send + Sync + 'static {
    /// Decoded data, shared by every handle on a key
    type Data: DeserializeOwned + Send + Sync + 'static;

    /// Per-handle object built from the shared data
    type Instance: Default + Send + Sync + 'static;

    /// Directory keys are resolved against
    fn root(&self) -> &Path {
        Path::new(DEFAULT_ASSET_ROOT)
    }

    /// Location of `key`. Leading slashes are stripped so absolute-looking
    /// keys stay inside `root()`.
    fn resolve(&self, key: &str) -> PathBuf {
        self.root().join(key.trim_start_matches('/'))
    }

    /// Fetch raw bytes for `key`. Must resolve to `Err(Cancelled)` promptly
    /// once `cancel` fires.
    fn fetch(
        &self,
        key: &str,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send {
        let path = self.resolve(key);
        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(AssetError::Cancelled),
                bytes = tokio::fs::read(&path) => bytes
                    .map_err(|e| AssetError::Io(format!("{}: {e}", path.display()))),
            }
        }
    }

    /// Decode fetched bytes
    fn parse(&self, bytes: &[u8]) -> Result<Self::Data> {
        serde_json::from_slice(bytes).map_err(AssetError::from)
    }

    /// Fetch then parse
    fn load(
        &self,
        key: &str,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<Self::Data>> + Send {
        async move {
            let bytes = self.fetch(key, cancel).await?;
            self.parse(&bytes)
        }
    }

    /// Build this handle's private instance once data is available
    fn create_instance(
        &self,
        _data: &Arc<Self::Data>,
    ) -> impl Future<Output = Result<Self::Instance>> + Send {
        async { Ok(Self::Instance::default()) }
    }
}

/// JSON document loader
#[derive(Clone, Debug)]
pub struct JsonLoader {
    root: PathBuf,
}

impl JsonLoader {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }
}

impl Default for JsonLoader {
    fn default() -> Self {
        Self::new(&AssetConfig::default())
    }
}

impl AssetLoader for JsonLoader {
    type Data = serde_json::Value;
    type Instance = ();

    fn root(&self) -> &Path {
        &self.root
    }
}

/// UTF-8 text loader
#[derive(Clone, Debug)]
pub struct TextLoader {
    root: PathBuf,
}

impl TextLoader {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }
}

impl Default for TextLoader {
    fn default() -> Self {
        Self::new(&AssetConfig::default())
    }
}

impl AssetLoader for TextLoader {
    type Data = String;
    type Instance = ();

    fn root(&self) -> &Path {
        &self.root
    }

    fn parse(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AssetError::Parse(format!("UTF-8 decode error: {e}")))
    }
}

/// Raw bytes loader
#[derive(Clone, Debug)]
pub struct BinaryLoader {
    root: PathBuf,
}

impl BinaryLoader {
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            root: config.root.clone(),
        }
    }
}

impl Default for BinaryLoader {
    fn default() -> Self {
        Self::new(&AssetConfig::default())
    }
}

impl AssetLoader for BinaryLoader {
    type Data = Vec<u8>;
    type Instance = ();

    fn root(&self) -> &Path {
        &self.root
    }

    fn parse(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}
