//! Target environment — where the installation happens.

use std::fmt;
use std::path::PathBuf;

/// The machine an installation runs against. Immutable for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The machine this process runs on; no network step.
    Local,
    /// A machine reached over SSH with key-based authentication.
    Remote(RemoteTarget),
}

/// Connection parameters for a remote target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    /// Host name or IP address.
    pub host: String,
    /// Login user.
    pub user: String,
    /// Private key used for authentication.
    pub ssh_key: PathBuf,
    /// SSH port.
    pub port: u16,
}

impl RemoteTarget {
    /// `user@host` destination string understood by `ssh`.
    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local machine"),
            Self::Remote(r) => write!(f, "{}@{}:{}", r.user, r.host, r.port),
        }
    }
}
