//! Installed-state signature: a content hash over the managed files.
//!
//! Computed before and after an installation run and compared to decide
//! whether the service needs a restart. Never persisted.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::domain::workspace::hex_encode;

/// SHA-256 over the path, length and content of every present managed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledSignature(String);

impl InstalledSignature {
    /// Hash `files` in iteration order. `None` entries (missing files)
    /// contribute no bytes.
    pub fn from_files<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'a Path, Option<&'a [u8]>)>,
    {
        let mut hasher = Sha256::new();
        for (path, content) in files {
            let Some(content) = content else { continue };
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update([0u8]);
            hasher.update((content.len() as u64).to_le_bytes());
            hasher.update(content);
        }
        Self(hex_encode(&hasher.finalize()))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstalledSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
