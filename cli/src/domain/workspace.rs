//! Installation workspace naming and small pure helpers.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

/// Prefix of every installation workspace directory on the target.
pub const WORKSPACE_PREFIX: &str = "/tmp/consul-installation.";

/// Length of the random suffix appended to [`WORKSPACE_PREFIX`].
pub const WORKSPACE_SUFFIX_LEN: usize = 6;

const SUFFIX_ALPHABET: &[u8; 62] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a unique workspace directory path.
///
/// Format: `/tmp/consul-installation.` followed by 6 alphanumeric characters.
/// Entropy sources: nanosecond timestamp and two independent `RandomState` hashes.
#[must_use]
pub fn generate_workspace_path() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("{WORKSPACE_PREFIX}{}", encode_suffix(hasher.finish()))
}

fn encode_suffix(mut seed: u64) -> String {
    let mut out = String::with_capacity(WORKSPACE_SUFFIX_LEN);
    for _ in 0..WORKSPACE_SUFFIX_LEN {
        #[allow(clippy::cast_possible_truncation)]
        let idx = (seed % 62) as usize;
        out.push(char::from(SUFFIX_ALPHABET[idx]));
        seed /= 62;
    }
    out
}

/// Returns `true` if `path` has the shape produced by [`generate_workspace_path`].
#[must_use]
pub fn is_workspace_path(path: &str) -> bool {
    path.strip_prefix(WORKSPACE_PREFIX).is_some_and(|suffix| {
        suffix.len() == WORKSPACE_SUFFIX_LEN && suffix.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// Encode bytes as lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}
