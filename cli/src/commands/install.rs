//! `consul-up install` — install and configure a Consul agent on a target.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::install::{InstallOutcome, InstallRequest, run_install};
use crate::domain::arch::Platform;
use crate::domain::config::{
    DEFAULT_DATACENTER, DEFAULT_SSH_KEY, DEFAULT_SSH_PORT, DEFAULT_SSH_USER, InstallerConfig,
};
use crate::domain::consul::ConsulConfig;
use crate::domain::target::{RemoteTarget, Target};
use crate::infra::checkpoint::CheckpointClient;
use crate::infra::operator::SystemConnector;
use crate::output::reporter::TerminalReporter;

/// Default remote host.
const DEFAULT_IP: &str = "127.0.0.1";

/// Arguments for the install command.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Target host address
    #[arg(long, default_value = DEFAULT_IP)]
    pub ip: String,

    /// SSH user [default: root]
    #[arg(long)]
    pub user: Option<String>,

    /// SSH private key [default: ~/.ssh/id_rsa]
    #[arg(long)]
    pub ssh_key: Option<String>,

    /// SSH port [default: 22]
    #[arg(long)]
    pub ssh_port: Option<u16>,

    /// Install on this machine instead of over SSH
    #[arg(long, conflicts_with_all = ["user", "ssh_key", "ssh_port"])]
    pub local: bool,

    /// Print the rendered configuration and exit without touching the target
    #[arg(long)]
    pub show: bool,

    /// Upload this Consul binary instead of downloading a release
    #[arg(long, value_name = "PATH")]
    pub binary: Option<PathBuf>,

    /// Consul version to download [default: latest]
    #[arg(long)]
    pub version: Option<String>,

    /// Build of consul-up to run on the target [default: this executable]
    #[arg(long, value_name = "PATH")]
    pub routine: Option<PathBuf>,

    /// Run the agent in server mode
    #[arg(long)]
    pub server: bool,

    /// Datacenter name [default: dc1]
    #[arg(long)]
    pub datacenter: Option<String>,

    /// Address to bind cluster communication to
    #[arg(long)]
    pub bind: Option<String>,

    /// Address advertised to the rest of the cluster
    #[arg(long)]
    pub advertise: Option<String>,

    /// Address for client interfaces (HTTP, DNS)
    #[arg(long)]
    pub client: Option<String>,

    /// Number of servers to wait for before bootstrapping
    #[arg(long, default_value_t = 1)]
    pub bootstrap_expect: u32,

    /// Address of an agent to join; may be repeated
    #[arg(long = "retry-join", value_name = "ADDRESS")]
    pub retry_join: Vec<String>,

    /// Gossip encryption key
    #[arg(long)]
    pub encrypt: Option<String>,

    /// Certificate authority file
    #[arg(long, value_name = "PATH")]
    pub ca_file: Option<String>,

    /// Agent certificate file
    #[arg(long, value_name = "PATH")]
    pub cert_file: Option<String>,

    /// Agent private key file
    #[arg(long, value_name = "PATH")]
    pub key_file: Option<String>,

    /// Enable Consul service mesh
    #[arg(long)]
    pub connect: bool,

    /// Enable ACLs with a default deny policy
    #[arg(long)]
    pub acl: bool,

    /// ACL token used by the agent
    #[arg(long)]
    pub agent_token: Option<String>,
}

/// Run the install command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the flags are
/// invalid, or any install step fails.
pub async fn run(app: &AppContext, args: InstallArgs) -> Result<ExitCode> {
    let defaults = config_service::load_config(&app.config_store)?;
    let (routine, routine_platform) = match args.routine.clone() {
        Some(path) => (path, None),
        None => (
            std::env::current_exe().context("cannot locate the consul-up executable")?,
            Some(Platform::current()),
        ),
    };
    let mut request = build_request(args, &defaults, dirs::home_dir().as_deref(), routine);
    request.routine_platform = routine_platform;

    let reporter = TerminalReporter::new(&app.output);
    let outcome = run_install(request, &SystemConnector, &CheckpointClient::default(), &reporter).await?;
    drop(reporter);

    match outcome {
        InstallOutcome::Shown(rendered) => print!("{rendered}"),
        InstallOutcome::Installed {
            target,
            version,
            mode,
            output,
        } => {
            app.output.transcript(&output);
            app.output.success(&format!("Consul agent running on {target}"));
            app.output.kv("Version:", version.as_deref().unwrap_or("uploaded binary"));
            app.output.kv("Service:", mode.as_str());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Merge flags with persisted defaults: flag first, then config, then the
/// built-in default.
#[must_use]
pub fn build_request(
    args: InstallArgs,
    defaults: &InstallerConfig,
    home: Option<&Path>,
    routine: PathBuf,
) -> InstallRequest {
    let target = if args.local {
        Target::Local
    } else {
        let key = args
            .ssh_key
            .or_else(|| defaults.ssh.key.clone())
            .unwrap_or_else(|| DEFAULT_SSH_KEY.to_string());
        Target::Remote(RemoteTarget {
            host: args.ip,
            user: args
                .user
                .or_else(|| defaults.ssh.user.clone())
                .unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            ssh_key: expand_home(&key, home),
            port: args.ssh_port.or(defaults.ssh.port).unwrap_or(DEFAULT_SSH_PORT),
        })
    };

    let config = ConsulConfig {
        datacenter: args
            .datacenter
            .or_else(|| defaults.consul.datacenter.clone())
            .unwrap_or_else(|| DEFAULT_DATACENTER.to_string()),
        bind: args.bind,
        advertise: args.advertise,
        client: args.client,
        server: args.server,
        bootstrap_expect: args.bootstrap_expect,
        retry_join: args.retry_join,
        encrypt: args.encrypt,
        tls: false,
        acl: args.acl,
        agent_token: args.agent_token,
        connect: args.connect,
    };

    InstallRequest {
        target,
        config,
        ca_file: args.ca_file,
        cert_file: args.cert_file,
        key_file: args.key_file,
        show: args.show,
        binary: args.binary,
        version: args.version,
        routine,
        routine_platform: None,
    }
}

/// Expand a leading `~/` against `home`.
fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
