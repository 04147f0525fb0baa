//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::InstallerConfig;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn load_config(store: &impl ConfigStore) -> Result<InstallerConfig> {
    store.load()
}

/// Validate `key = value`, apply it to the stored configuration and persist.
///
/// Nothing is written when validation fails.
///
/// # Errors
///
/// Returns a `ConfigError` for an unknown key or invalid value, or the
/// store's error if loading or saving fails.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<InstallerConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}
