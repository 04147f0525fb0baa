//! Consul release naming, version parsing and checksum verification.
//!
//! Pure functions only. Downloads happen on the target through the host port.

use sha2::{Digest, Sha256};

use crate::domain::arch::Architecture;
use crate::domain::error::{InstallError, ReconcileError};
use crate::domain::workspace::hex_encode;

/// Distribution endpoint for Consul releases.
pub const RELEASES_URL: &str = "https://releases.hashicorp.com/consul";

/// `consul_<version>_linux_<suffix>.zip`
#[must_use]
pub fn archive_name(version: &str, arch: Architecture) -> String {
    format!("consul_{version}_linux_{}.zip", arch.release_suffix())
}

/// Download URL of the release archive for `version` and `arch`.
#[must_use]
pub fn archive_url(version: &str, arch: Architecture) -> String {
    format!("{RELEASES_URL}/{version}/{}", archive_name(version, arch))
}

/// `consul_<version>_SHA256SUMS`
#[must_use]
pub fn checksums_name(version: &str) -> String {
    format!("consul_{version}_SHA256SUMS")
}

/// Download URL of the published checksum list for `version`.
#[must_use]
pub fn checksums_url(version: &str) -> String {
    format!("{RELEASES_URL}/{version}/{}", checksums_name(version))
}

/// Normalise a user-supplied version (`v1.9.0` → `1.9.0`) and check it is semver.
///
/// # Errors
///
/// Returns [`InstallError::Configuration`] if the version is not valid semver.
pub fn normalize_version(raw: &str) -> Result<String, InstallError> {
    let trimmed = raw.trim();
    let version = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(version)
        .map_err(|e| InstallError::Configuration(format!("invalid version '{raw}': {e}")))?;
    Ok(version.to_string())
}

/// Extract the version from `consul version` output (`Consul v1.9.0` → `1.9.0`).
#[must_use]
pub fn parse_installed_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.strip_prefix("Consul "))
        .and_then(|rest| rest.split_whitespace().next())
        .map(|v| v.strip_prefix('v').unwrap_or(v).to_string())
}

/// Verify `content` against the entry for `file_name` in a SHA256SUMS listing.
///
/// # Errors
///
/// Returns [`ReconcileError::ChecksumMismatch`] if the listing has no entry for
/// `file_name` or the digest differs.
pub fn verify_checksum(file_name: &str, content: &[u8], sums: &str) -> Result<(), ReconcileError> {
    let actual = hex_encode(&Sha256::digest(content));
    let expected = sums
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?, parts.next()?))
        })
        .find(|(_, name)| name.trim_start_matches('*') == file_name)
        .map(|(digest, _)| digest.to_ascii_lowercase());

    match expected {
        Some(expected) if expected == actual => Ok(()),
        Some(expected) => Err(ReconcileError::ChecksumMismatch {
            file: file_name.to_string(),
            expected,
            actual,
        }),
        None => Err(ReconcileError::ChecksumMismatch {
            file: file_name.to_string(),
            expected: "(no entry in checksum list)".to_string(),
            actual,
        }),
    }
}
