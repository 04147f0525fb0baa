//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod arch;
pub mod config;
pub mod consul;
pub mod error;
pub mod install;
pub mod layout;
pub mod reconcile;
pub mod release;
pub mod shell;
pub mod signature;
pub mod systemd;
pub mod target;
pub mod workspace;

pub use config::{InstallerConfig, validate_config_key, validate_config_value};
pub use error::{ConfigError, InstallError, OperatorError, ReconcileError};
pub use install::{Artifact, ArtifactSource, SupervisionMode, TlsMaterial};
pub use target::{RemoteTarget, Target};
