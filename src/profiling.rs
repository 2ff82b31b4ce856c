//! # Profiling Guide
//!
//! Asset loads are instrumented with `tracing`. Cache bookkeeping is logged at
//! `trace`/`debug`, failed loads at `warn`.
//!
//! ## Basic Usage
//!
//! Enable the `profiling` feature in your Cargo.toml:
//!
//! ```toml
//! [dependencies]
//! asset_cache = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! With the feature on, every shared load runs inside an `asset.load` span and
//! [`init_tracing`] installs a subscriber driven by [`AssetConfig`]:
//!
//! ```ignore
//! let config = AssetConfig::from_file("assets.json")?;
//! let _guard = asset_cache::profiling::init_tracing(&config)?;
//! ```
//!
//! ## Performance Tips
//!
//! 1. Profile in release mode for accurate metrics
//! 2. Use `log_filter = "asset_cache=trace"` to see every cache hit and miss

#[cfg(feature = "profiling")]
use crate::config::AssetConfig;
#[cfg(feature = "profiling")]
use crate::error::{AssetError, Result};

/// Keeps the file writer flushing. Drop it at shutdown.
#[cfg(feature = "profiling")]
pub type TracingGuard = Option<tracing_appender::non_blocking::WorkerGuard>;

/// Install a global subscriber filtered by `config.log_filter`.
///
/// Logs go to stdout, or as JSON lines to `config.log_file` when set.
#[cfg(feature = "profiling")]
pub fn init_tracing(config: &AssetConfig) -> Result<TracingGuard> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|e| AssetError::ConfigError(format!("Invalid log filter: {e}")))?;

    match &config.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| AssetError::ConfigError(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .try_init()
                .map_err(|e| AssetError::ConfigError(e.to_string()))?;
            Ok(None)
        }
    }
}

#[cfg(all(test, feature = "profiling"))]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_rejected() {
        let config = AssetConfig {
            log_filter: "asset_cache=notalevel".to_string(),
            ..AssetConfig::default()
        };
        assert!(matches!(
            init_tracing(&config),
            Err(AssetError::ConfigError(_))
        ));
    }
}
