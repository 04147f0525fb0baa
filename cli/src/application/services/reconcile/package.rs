//! Package manager detection for dependency installation on the target.

use std::fmt;

use anyhow::Result;

use super::run_checked;
use crate::application::ports::HostSystem;

/// A supported system package manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    AptGet,
    Yum,
}

impl PackageManager {
    /// Probed in this order; the first one present wins.
    pub const PRIORITY: [Self; 2] = [Self::AptGet, Self::Yum];

    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::AptGet => "apt-get",
            Self::Yum => "yum",
        }
    }

    /// First package manager from [`PRIORITY`](Self::PRIORITY) found on the host.
    pub async fn detect(host: &impl HostSystem) -> Option<Self> {
        for candidate in Self::PRIORITY {
            if host.has_command(candidate.program()).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Refresh the package index and install `packages`.
    ///
    /// # Errors
    ///
    /// Returns an error if either command exits non-zero.
    pub async fn install(self, host: &impl HostSystem, packages: &[&str]) -> Result<()> {
        let program = self.program();
        run_checked(host, program, &["update", "-y"]).await?;
        let mut args = vec!["install", "-y"];
        args.extend_from_slice(packages);
        run_checked(host, program, &args).await?;
        Ok(())
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}
