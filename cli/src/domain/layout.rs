//! Filesystem layout on the target host and in the installation workspace.

use std::path::PathBuf;

/// Directory the Consul binary is installed into.
pub const BIN_DIR: &str = "/usr/local/bin";

/// Installed Consul binary.
pub const CONSUL_BIN: &str = "/usr/local/bin/consul";

/// Staging path the binary is copied to before being renamed over
/// [`CONSUL_BIN`]. Same directory, so the rename never crosses filesystems.
pub const STAGED_BIN: &str = "/usr/local/bin/.consul.new";

/// Consul configuration directory.
pub const CONFIG_DIR: &str = "/etc/consul.d";

/// Rendered Consul configuration file.
pub const CONFIG_FILE: &str = "/etc/consul.d/consul.hcl";

/// Consul data directory.
pub const DATA_DIR: &str = "/opt/consul";

/// systemd unit file for the agent.
pub const SERVICE_FILE: &str = "/etc/systemd/system/consul.service";

/// systemd unit name.
pub const SERVICE_NAME: &str = "consul";

/// Present on hosts booted with systemd.
pub const SYSTEMD_RUN_DIR: &str = "/run/systemd";

/// Dedicated system user and group owning the config and data dirs.
pub const SERVICE_USER: &str = "consul";

// ── Workspace file names ──────────────────────────────────────────────────────

/// Pre-uploaded Consul binary inside the workspace.
pub const WS_BINARY: &str = "consul";

/// Rendered configuration inside the workspace.
pub const WS_CONFIG: &str = "consul.hcl";

/// Workspace subdirectory a downloaded release archive is unpacked into.
pub const WS_RELEASE_DIR: &str = "release";

/// Certificate authority file name (workspace and config dir).
pub const CA_FILE: &str = "consul-agent-ca.pem";

/// Agent certificate file name (workspace and config dir).
pub const CERT_FILE: &str = "consul-agent-cert.pem";

/// Agent private key file name (workspace and config dir).
pub const KEY_FILE: &str = "consul-agent-key.pem";

/// TLS material in upload order.
pub const TLS_FILES: [&str; 3] = [CA_FILE, CERT_FILE, KEY_FILE];

/// Reconciliation routine executable inside the workspace.
pub const WS_ROUTINE: &str = "consul-up";

/// Hidden subcommand the routine executable is invoked with.
pub const ROUTINE_SUBCOMMAND: &str = "_reconcile";

/// Path of a TLS file once installed in the config dir.
#[must_use]
pub fn installed_tls_path(name: &str) -> PathBuf {
    PathBuf::from(CONFIG_DIR).join(name)
}

/// Every file that makes up the Installed-State Signature, in hashing order.
#[must_use]
pub fn signature_files() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from(CONSUL_BIN), PathBuf::from(CONFIG_FILE)];
    files.extend(TLS_FILES.iter().map(|name| installed_tls_path(name)));
    files.push(PathBuf::from(SERVICE_FILE));
    files
}
