//! Global configuration options.

use std::sync::OnceLock;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

/// Global configuration options for the `chunkarray` crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
/// The configuration can also be exchanged as JSON with [`global_config_json`] and [`set_global_config_json`].
///
/// ## Validate Checksums
///  > default: [`true`]
///
/// If enabled, checksum codecs (e.g. `crc32c`) validate that encoded data matches stored checksums, otherwise validation is skipped.
///
/// ## Chunk Concurrent Limit
/// > default: [`std::thread::available_parallelism`]`()`
///
/// The maximum number of chunks processed concurrently by the parallel (`par_`) array methods.
/// The concurrent limit is disabled if set to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    validate_checksums: bool,
    chunk_concurrent_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            validate_checksums: true,
            chunk_concurrent_limit: std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get),
        }
    }
}

impl Config {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [chunk concurrent limit](#chunk-concurrent-limit) configuration.
    #[must_use]
    pub fn chunk_concurrent_limit(&self) -> usize {
        self.chunk_concurrent_limit
    }

    /// Set the [chunk concurrent limit](#chunk-concurrent-limit) configuration.
    pub fn set_chunk_concurrent_limit(&mut self, concurrent_limit: usize) {
        self.chunk_concurrent_limit = concurrent_limit;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

fn config_lock() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| RwLock::new(Config::default()))
}

/// Returns a reference to the global configuration.
///
/// The guard must be dropped before calling [`global_config_mut`] on the same thread, or the thread deadlocks.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    config_lock().read()
}

/// Returns a mutable reference to the global configuration.
///
/// Holding any other guard of the global configuration on the same thread deadlocks.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    config_lock().write()
}

/// Serialise the global configuration to a JSON string.
///
/// # Errors
/// Returns a [`serde_json::Error`] if the configuration cannot be serialised.
///
/// # Panics
/// See [`global_config`].
pub fn global_config_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&*global_config())
}

/// Replace the global configuration with one deserialised from a JSON string.
///
/// Fields absent from `json` take their default value.
///
/// # Errors
/// Returns a [`serde_json::Error`] if `json` is not a valid configuration.
///
/// # Panics
/// See [`global_config_mut`].
pub fn set_global_config_json(json: &str) -> Result<(), serde_json::Error> {
    let config: Config = serde_json::from_str(json)?;
    *global_config_mut() = config;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validate_checksums() {
        assert!(global_config().validate_checksums());
        let mut config = Config::default();
        config.set_validate_checksums(false);
        assert!(!config.validate_checksums());
    }

    #[test]
    fn config_json() {
        let config: Config =
            serde_json::from_str(r#"{"validate_checksums": false, "chunk_concurrent_limit": 3}"#)
                .unwrap();
        assert!(!config.validate_checksums());
        assert_eq!(config.chunk_concurrent_limit(), 3);

        let config: Config = serde_json::from_str(r#"{"chunk_concurrent_limit": 0}"#).unwrap();
        assert!(config.validate_checksums());

        assert!(serde_json::from_str::<Config>(r#"{"unknown": 1}"#).is_err());
        assert!(global_config_json().is_ok());
    }
}
