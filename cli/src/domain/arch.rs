//! Target machine architecture mapping.

use std::fmt;

use crate::domain::error::ReconcileError;

/// The architectures Consul publishes Linux release archives for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Architecture {
    Amd64,
    Arm64,
    Armv6,
}

impl Architecture {
    /// Map a `uname -m` machine identifier to a supported architecture.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnsupportedArchitecture`] for any value outside
    /// `x86_64`, `amd64`, `arm64`, `aarch64` and `arm*`.
    pub fn from_machine(machine: &str) -> Result<Self, ReconcileError> {
        match machine.trim() {
            "x86_64" | "amd64" => Ok(Self::Amd64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            m if m.starts_with("arm") => Ok(Self::Armv6),
            other => Err(ReconcileError::UnsupportedArchitecture(other.to_string())),
        }
    }

    /// Suffix used in release archive names.
    #[must_use]
    pub fn release_suffix(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armv6 => "armhfv6",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armv6 => "armv6",
        })
    }
}

/// Operating system and processor family of a host.
///
/// Both fields are normalised so `uname -sm` output and the constants of
/// the running build compare equal (`Darwin arm64` is `macos/aarch64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: normalize_os(os),
            arch: normalize_arch(arch),
        }
    }

    /// The platform this executable was built for.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Parse the output of `uname -sm`.
    #[must_use]
    pub fn from_uname(output: &str) -> Option<Self> {
        let mut parts = output.split_whitespace();
        let os = parts.next()?;
        let machine = parts.next()?;
        Some(Self::new(os, machine))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

fn normalize_os(os: &str) -> String {
    match os.to_ascii_lowercase().as_str() {
        "darwin" => "macos".to_string(),
        other => other.to_string(),
    }
}

fn normalize_arch(machine: &str) -> String {
    match machine {
        "x86_64" | "amd64" => "x86_64",
        "aarch64" | "arm64" => "aarch64",
        "i386" | "i686" | "x86" => "x86",
        m if m.starts_with("arm") => "arm",
        other => other,
    }
    .to_string()
}
