//! `consul-up _reconcile` — target-side routine, invoked by `install`.
//!
//! Parameters arrive through environment variables set on the command line
//! built by [`ReconcileParams::command_line`].

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::application::services::reconcile::Reconciler;
use crate::domain::error::InstallError;
use crate::domain::install::SupervisionMode;
use crate::domain::reconcile::{ENV_SERVICE_TYPE, ENV_VERSION, ENV_WORKSPACE, ReconcileParams};
use crate::domain::release::normalize_version;
use crate::domain::workspace::is_workspace_path;
use crate::infra::command_runner::{INSTALL_TIMEOUT, TokioCommandRunner};
use crate::infra::host::SystemHost;
use crate::output::OutputContext;
use crate::output::reporter::TerminalReporter;

/// Arguments for the hidden reconcile command.
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Workspace directory holding the uploaded artifacts
    #[arg(long, env = ENV_WORKSPACE)]
    pub workspace: String,

    /// Service supervision mode (notify or exec)
    #[arg(long, env = ENV_SERVICE_TYPE)]
    pub service_type: SupervisionMode,

    /// Consul version to download; empty when a binary was uploaded
    #[arg(long, env = ENV_VERSION)]
    pub version: Option<String>,
}

impl ReconcileArgs {
    /// Validate and convert into routine parameters.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError::Configuration`] if the workspace is not a
    /// generated workspace path or the version is not a valid release number.
    pub fn into_params(self) -> Result<ReconcileParams> {
        if !is_workspace_path(&self.workspace) {
            return Err(InstallError::Configuration(format!(
                "{} is not an installation workspace",
                self.workspace
            ))
            .into());
        }
        let version = match self.version.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(normalize_version(v)?),
        };
        Ok(ReconcileParams {
            workspace: self.workspace,
            service_type: self.service_type,
            version,
        })
    }
}

/// Run the reconciliation routine against this machine.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or any state fails.
pub async fn run(args: ReconcileArgs) -> Result<ExitCode> {
    let params = args.into_params()?;
    // Output is captured by the caller; no colors, no spinner.
    let output = OutputContext::new(true, false);
    let reporter = TerminalReporter::new(&output);

    let host = SystemHost::detect(TokioCommandRunner::new(INSTALL_TIMEOUT)).await?;
    let report = Reconciler::new(&host, &reporter).run(params).await?;
    tracing::debug!(before = %report.before, after = %report.after, "reconciled");
    Ok(ExitCode::SUCCESS)
}
