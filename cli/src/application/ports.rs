//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::InstallerConfig;
use crate::domain::error::OperatorError;
use crate::domain::target::Target;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<Output>;
    /// Run a program with stdin piped from `stdin`.
    async fn run_with_stdin(&self, program: &str, args: &[&str], stdin: &[u8]) -> Result<Output>;
    /// Spawn a long-lived program without waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn spawn(&self, program: &str, args: &[&str]) -> Result<tokio::process::Child>;
}

// ── Command Operator Port ─────────────────────────────────────────────────────

/// Runs commands and writes files on an installation target, local or remote.
///
/// Every method awaits completion. Errors are [`OperatorError`] values wrapped
/// in `anyhow::Error`.
#[allow(async_fn_in_trait)]
pub trait CommandOperator {
    /// Run `command` through the target's POSIX shell and return the combined
    /// stdout and stderr.
    ///
    /// # Errors
    ///
    /// [`OperatorError::Command`] on a non-zero exit, carrying the output.
    async fn execute(&self, command: &str) -> Result<String>;

    /// Write `content` to `destination` with permission bits `mode`.
    ///
    /// The file appears atomically: a partial write is never observable at
    /// `destination`.
    async fn upload(&self, content: &[u8], destination: &str, mode: u32) -> Result<()>;

    /// Like [`upload`](Self::upload) with content read from a local file.
    ///
    /// # Errors
    ///
    /// [`OperatorError::Upload`] if the local file cannot be read.
    async fn upload_file(&self, local: &Path, destination: &str, mode: u32) -> Result<()> {
        let content = tokio::fs::read(local).await.map_err(|e| OperatorError::Upload {
            destination: destination.to_string(),
            reason: format!("cannot read {}: {e}", local.display()),
        })?;
        self.upload(&content, destination, mode).await
    }

    /// Release the execution session.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Produces a connected [`CommandOperator`] for a target.
#[allow(async_fn_in_trait)]
pub trait OperatorConnector {
    type Operator: CommandOperator;

    /// Open an execution session on `target`.
    ///
    /// # Errors
    ///
    /// [`OperatorError::Connection`] if the target cannot be reached.
    async fn connect(&self, target: &Target) -> Result<Self::Operator>;
}

// ── Host System Port ──────────────────────────────────────────────────────────

/// The machine the reconciliation routine runs on.
///
/// Implementations handle privilege elevation; callers use plain paths and
/// program names.
#[allow(async_fn_in_trait)]
pub trait HostSystem {
    /// Run `program` with `args` and capture its output. A non-zero exit is
    /// not an error at this level.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Read a file, `None` if it does not exist.
    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>>;
    /// Replace a file's content and set its mode.
    async fn write_file(&self, path: &Path, content: &[u8], mode: u32) -> Result<()>;
    async fn exists(&self, path: &Path) -> bool;
    async fn is_executable(&self, path: &Path) -> bool;
    /// Whether `name` resolves on the `PATH`.
    async fn has_command(&self, name: &str) -> bool;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Configuration and Version Ports ──────────────────────────────────────────

/// Persistence for installer defaults.
pub trait ConfigStore {
    /// Load the configuration, defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<InstallerConfig>;
    /// Persist the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &InstallerConfig) -> Result<()>;
    /// Location of the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if no location can be determined.
    fn path(&self) -> Result<PathBuf>;
}

/// Looks up the latest published release of a product.
pub trait VersionResolver {
    /// # Errors
    ///
    /// Returns an error if the lookup service cannot be reached or answers
    /// without a version.
    fn latest_version(&self, product: &str) -> Result<String>;
}
