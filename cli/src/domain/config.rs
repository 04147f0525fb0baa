//! Domain types and validators for persisted installer defaults.
//!
//! Pure functions only. No I/O, no async, no filesystem access.

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &["ssh.user", "ssh.key", "ssh.port", "consul.datacenter"];

/// Built-in SSH user when neither flag nor config supplies one.
pub const DEFAULT_SSH_USER: &str = "root";
/// Built-in SSH private key path.
pub const DEFAULT_SSH_KEY: &str = "~/.ssh/id_rsa";
/// Built-in SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;
/// Built-in datacenter name.
pub const DEFAULT_DATACENTER: &str = "dc1";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.consul-up/config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub ssh: SshDefaults,
    pub consul: ConsulDefaults,
}

/// Connection defaults for remote targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Agent configuration defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datacenter: Option<String>,
}

impl InstallerConfig {
    /// Effective values for every key, falling back to built-in defaults.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "ssh.user",
                self.ssh.user.clone().unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            ),
            (
                "ssh.key",
                self.ssh.key.clone().unwrap_or_else(|| DEFAULT_SSH_KEY.to_string()),
            ),
            (
                "ssh.port",
                self.ssh.port.unwrap_or(DEFAULT_SSH_PORT).to_string(),
            ),
            (
                "consul.datacenter",
                self.consul
                    .datacenter
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATACENTER.to_string()),
            ),
        ]
    }

    /// Validate and apply a single `key = value` setting.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is unknown or the value invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "ssh.user" => self.ssh.user = Some(value.to_string()),
            "ssh.key" => self.ssh.key = Some(value.to_string()),
            "ssh.port" => self.ssh.port = value.parse().ok(),
            _ => self.consul.datacenter = Some(value.to_string()),
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<(), ConfigError> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        });
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |hint: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        hint: hint.to_string(),
    };
    match key {
        "ssh.port" => match value.parse::<u16>() {
            Ok(port) if port > 0 => Ok(()),
            _ => Err(invalid("Expected a port number between 1 and 65535")),
        },
        "ssh.user" if value.is_empty() || value.chars().any(char::is_whitespace) => {
            Err(invalid("User names cannot be empty or contain whitespace"))
        }
        "consul.datacenter"
            if value.is_empty()
                || !value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            Err(invalid(
                "Datacenter names may only contain letters, digits, '-' and '_'",
            ))
        }
        "ssh.key" if value.is_empty() => Err(invalid("Key path cannot be empty")),
        _ => Ok(()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
