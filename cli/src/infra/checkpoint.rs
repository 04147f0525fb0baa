//! Latest-release lookup against the HashiCorp checkpoint service.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::application::ports::VersionResolver;

/// Checkpoint API base URL.
pub const CHECKPOINT_URL: &str = "https://checkpoint-api.hashicorp.com/v1/check";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    current_version: String,
}

/// `VersionResolver` backed by the checkpoint API.
pub struct CheckpointClient {
    base_url: String,
}

impl Default for CheckpointClient {
    fn default() -> Self {
        Self {
            base_url: CHECKPOINT_URL.to_string(),
        }
    }
}

impl CheckpointClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// Extract `current_version` from a checkpoint response body.
///
/// # Errors
///
/// Returns an error if the body is not JSON or carries no version.
pub fn parse_current_version(body: &str) -> Result<String> {
    let response: CheckResponse =
        serde_json::from_str(body).context("invalid checkpoint response")?;
    let version = response.current_version.trim();
    anyhow::ensure!(!version.is_empty(), "checkpoint response has no current_version");
    Ok(version.to_string())
}

impl VersionResolver for CheckpointClient {
    fn latest_version(&self, product: &str) -> Result<String> {
        let url = format!("{}/{product}", self.base_url);
        tracing::debug!(%url, "querying checkpoint");
        let body = ureq::get(&url)
            .timeout(REQUEST_TIMEOUT)
            .query("version", "0.0.0")
            .set("User-Agent", concat!("consul-up/", env!("CARGO_PKG_VERSION")))
            .call()
            .with_context(|| format!("request to {url} failed"))?
            .into_string()
            .context("failed to read checkpoint response")?;
        parse_current_version(&body)
    }
}
