//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Install errors ────────────────────────────────────────────────────────────

/// Errors raised by the install orchestrator on the controlling machine.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Invalid or partial flag combination, detected before any connection.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "unable to get latest version number, define a version manually with the --version flag: {0}"
    )]
    VersionLookup(String),

    /// The reconciliation routine exited non-zero on the target.
    #[error("error received during installation:\n{output}")]
    RemoteExecution { output: String },
}

// ── Operator errors ───────────────────────────────────────────────────────────

/// Errors raised by a `CommandOperator` implementation.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("cannot connect to {target}: {reason}")]
    Connection { target: String, reason: String },

    #[error("command `{command}` failed ({status}):\n{output}")]
    Command {
        command: String,
        status: String,
        output: String,
    },

    #[error("upload to {destination} failed: {reason}")]
    Upload { destination: String, reason: String },
}

// ── Reconcile errors ──────────────────────────────────────────────────────────

/// Errors raised by the target-side reconciliation routine.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Can not find systemd to use as a process supervisor for consul")]
    MissingServiceSupervisor,

    #[error("Unsupported architecture {0}")]
    UnsupportedArchitecture(String),

    #[error("Could not find apt-get or yum. Cannot install dependencies on this OS.")]
    NoPackageManager,

    #[error("No Consul version given and no binary was uploaded")]
    MissingVersion,

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("`{command}` failed:\n{output}")]
    CommandFailed { command: String, output: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{hint}")]
    InvalidValue {
        key: String,
        value: String,
        hint: String,
    },
}
