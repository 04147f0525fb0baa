//! Installation value types: supervision mode, TLS material and artifacts.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::InstallError;

/// How systemd supervises the agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisionMode {
    /// `Type=notify`: the agent signals readiness after joining a cluster.
    Notify,
    /// `Type=exec`: ready as soon as the process starts.
    Exec,
}

impl SupervisionMode {
    /// `notify` iff at least one join address is configured.
    #[must_use]
    pub fn for_join_addresses<S: AsRef<str>>(addresses: &[S]) -> Self {
        if addresses.is_empty() {
            Self::Exec
        } else {
            Self::Notify
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Exec => "exec",
        }
    }
}

impl fmt::Display for SupervisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SupervisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notify" => Ok(Self::Notify),
            "exec" => Ok(Self::Exec),
            other => Err(format!("unknown service type '{other}' (expected notify or exec)")),
        }
    }
}

/// Local paths of the agent TLS triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

impl TlsMaterial {
    /// Accept all three paths or none. Empty values count as absent.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Configuration`] for any partial combination.
    pub fn from_flags(
        ca_file: Option<&str>,
        cert_file: Option<&str>,
        key_file: Option<&str>,
    ) -> Result<Option<Self>, InstallError> {
        fn present(v: Option<&str>) -> Option<&str> {
            v.filter(|s| !s.is_empty())
        }
        match (present(ca_file), present(cert_file), present(key_file)) {
            (Some(ca), Some(cert), Some(key)) => Ok(Some(Self {
                ca_file: PathBuf::from(ca),
                cert_file: PathBuf::from(cert),
                key_file: PathBuf::from(key),
            })),
            (None, None, None) => Ok(None),
            _ => Err(InstallError::Configuration(
                "--ca-file, --cert-file and --key-file must be given together".to_string(),
            )),
        }
    }

    /// Local paths in upload order (authority, certificate, key).
    #[must_use]
    pub fn files(&self) -> [&PathBuf; 3] {
        [&self.ca_file, &self.cert_file, &self.key_file]
    }
}

/// Where an artifact's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Content(Vec<u8>),
    LocalFile(PathBuf),
}

/// One file to place in the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub source: ArtifactSource,
    pub destination: String,
    pub mode: u32,
    /// Short name shown in progress output.
    pub label: &'static str,
}

impl Artifact {
    #[must_use]
    pub fn content(label: &'static str, content: Vec<u8>, destination: String, mode: u32) -> Self {
        Self {
            source: ArtifactSource::Content(content),
            destination,
            mode,
            label,
        }
    }

    #[must_use]
    pub fn local_file(label: &'static str, path: PathBuf, destination: String, mode: u32) -> Self {
        Self {
            source: ArtifactSource::LocalFile(path),
            destination,
            mode,
            label,
        }
    }
}
