//! Application service — install orchestration.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::{
    CommandOperator, OperatorConnector, ProgressReporter, VersionResolver,
};
use crate::application::services::workspace::{Workspace, with_workspace};
use crate::domain::arch::Platform;
use crate::domain::consul::ConsulConfig;
use crate::domain::error::{InstallError, OperatorError};
use crate::domain::install::{Artifact, ArtifactSource, SupervisionMode, TlsMaterial};
use crate::domain::layout::{TLS_FILES, WS_BINARY, WS_CONFIG, WS_ROUTINE};
use crate::domain::reconcile::ReconcileParams;
use crate::domain::release::normalize_version;
use crate::domain::target::Target;

/// Product name used for the latest-version lookup.
pub const PRODUCT: &str = "consul";

/// Everything one `install` invocation needs, already resolved from flags
/// and persisted defaults.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub target: Target,
    pub config: ConsulConfig,
    pub ca_file: Option<String>,
    pub cert_file: Option<String>,
    pub key_file: Option<String>,
    /// Render the configuration and stop.
    pub show: bool,
    /// Local Consul binary to upload instead of downloading on the target.
    pub binary: Option<PathBuf>,
    pub version: Option<String>,
    /// Executable uploaded as the reconciliation routine.
    pub routine: PathBuf,
    /// Platform `routine` was built for. When set, the target must report
    /// the same platform before anything is uploaded.
    pub routine_platform: Option<Platform>,
}

/// Result of a successful `run_install`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// `show` mode: the rendered configuration.
    Shown(String),
    /// The routine ran to completion on the target.
    Installed {
        target: String,
        version: Option<String>,
        mode: SupervisionMode,
        output: String,
    },
}

/// Resolved inputs of the upload and invocation phase.
#[derive(Debug, Clone)]
pub struct InstallPayload {
    pub binary: Option<PathBuf>,
    pub tls: Option<TlsMaterial>,
    pub config: String,
    pub routine: PathBuf,
    pub routine_platform: Option<Platform>,
    pub version: Option<String>,
    pub mode: SupervisionMode,
}

/// Validate, render and, unless `show` is set, install on the target.
///
/// # Errors
///
/// - [`InstallError::Configuration`] for invalid flag combinations, before
///   any connection is attempted.
/// - [`InstallError::VersionLookup`] if no version or binary was given and
///   the latest version cannot be determined.
/// - Connection, upload and remote execution errors.
pub async fn run_install<C: OperatorConnector>(
    request: InstallRequest,
    connector: &C,
    versions: &impl VersionResolver,
    reporter: &impl ProgressReporter,
) -> Result<InstallOutcome> {
    let InstallRequest {
        target,
        mut config,
        ca_file,
        cert_file,
        key_file,
        show,
        binary,
        version,
        routine,
        routine_platform,
    } = request;

    let tls = TlsMaterial::from_flags(ca_file.as_deref(), cert_file.as_deref(), key_file.as_deref())?;
    validate_target(&target)?;
    config.tls = tls.is_some();
    let rendered = config.render();

    if show {
        return Ok(InstallOutcome::Shown(rendered));
    }

    let version = resolve_version(version.as_deref(), binary.is_some(), versions)?;
    let mode = SupervisionMode::for_join_addresses(&config.retry_join);
    let payload = InstallPayload {
        binary,
        tls,
        config: rendered,
        routine,
        routine_platform,
        version: version.clone(),
        mode,
    };

    reporter.step(&format!("Connecting to {target}"));
    let op = connector.connect(&target).await?;
    reporter.success(&format!("Connected to {target}"));

    let result = install(&op, &payload, reporter).await;
    if let Err(e) = op.close().await {
        tracing::warn!("failed to close session with {target}: {e:#}");
    }
    let output = result?;

    Ok(InstallOutcome::Installed {
        target: target.to_string(),
        version,
        mode,
        output,
    })
}

/// Upload the payload into a fresh workspace and run the routine once.
///
/// Returns the routine's combined output.
///
/// # Errors
///
/// - [`InstallError::Configuration`] if the target cannot run the routine.
/// - The first upload failure.
/// - [`InstallError::RemoteExecution`] if the routine exits non-zero.
///
/// The workspace is removed in every case.
pub async fn install(
    op: &impl CommandOperator,
    payload: &InstallPayload,
    reporter: &impl ProgressReporter,
) -> Result<String> {
    with_workspace(op, |ws| async move {
        if let Some(expected) = &payload.routine_platform {
            check_routine_platform(op, expected).await?;
        }
        for artifact in artifacts(payload, &ws) {
            reporter.step(&format!("Uploading {}", artifact.label));
            upload_artifact(op, &artifact)
                .await
                .with_context(|| format!("uploading {}", artifact.label))?;
        }

        let params = ReconcileParams {
            workspace: ws.path().to_string(),
            service_type: payload.mode,
            version: payload.version.clone(),
        };
        reporter.step("Installing Consul on target");
        let output = op.execute(&params.command_line()).await.map_err(into_install_error)?;
        reporter.success("Consul installed");
        Ok(output)
    })
    .await
}

/// Artifacts in upload order: binary, TLS material, configuration, routine.
#[must_use]
pub fn artifacts(payload: &InstallPayload, ws: &Workspace) -> Vec<Artifact> {
    let mut list = Vec::new();
    if let Some(binary) = &payload.binary {
        list.push(Artifact::local_file("Consul binary", binary.clone(), ws.file(WS_BINARY), 0o755));
    }
    if let Some(tls) = &payload.tls {
        let labels = ["CA certificate", "agent certificate", "agent key"];
        for ((label, name), local) in labels.into_iter().zip(TLS_FILES).zip(tls.files()) {
            list.push(Artifact::local_file(label, local.clone(), ws.file(name), 0o640));
        }
    }
    list.push(Artifact::content(
        "configuration",
        payload.config.clone().into_bytes(),
        ws.file(WS_CONFIG),
        0o640,
    ));
    list.push(Artifact::local_file(
        "installation routine",
        payload.routine.clone(),
        ws.file(WS_ROUTINE),
        0o755,
    ));
    list
}

async fn upload_artifact(op: &impl CommandOperator, artifact: &Artifact) -> Result<()> {
    match &artifact.source {
        ArtifactSource::Content(bytes) => op.upload(bytes, &artifact.destination, artifact.mode).await,
        ArtifactSource::LocalFile(path) => {
            op.upload_file(path, &artifact.destination, artifact.mode).await
        }
    }
}

/// Compare the target's `uname -sm` with the platform the routine was
/// built for.
async fn check_routine_platform(op: &impl CommandOperator, expected: &Platform) -> Result<()> {
    let output = op.execute("uname -sm").await.context("detecting target platform")?;
    let actual = Platform::from_uname(&output)
        .with_context(|| format!("unexpected `uname -sm` output: {}", output.trim()))?;
    if actual != *expected {
        return Err(InstallError::Configuration(format!(
            "target is {actual} but this consul-up was built for {expected}; \
             pass --routine with a consul-up build for {actual}"
        ))
        .into());
    }
    tracing::debug!(platform = %actual, "target can run the installation routine");
    Ok(())
}

fn into_install_error(err: anyhow::Error) -> anyhow::Error {
    match err.downcast::<OperatorError>() {
        Ok(OperatorError::Command { output, .. }) => InstallError::RemoteExecution { output }.into(),
        Ok(other) => other.into(),
        Err(err) => err,
    }
}

fn validate_target(target: &Target) -> Result<(), InstallError> {
    match target {
        Target::Remote(remote) if remote.host.trim().is_empty() => Err(
            InstallError::Configuration("a remote target needs a host address".to_string()),
        ),
        Target::Remote(remote) if remote.user.trim().is_empty() => Err(
            InstallError::Configuration("a remote target needs a login user".to_string()),
        ),
        _ => Ok(()),
    }
}

/// A supplied version is normalised. Without one, an uploaded binary needs
/// none; otherwise the latest release is looked up.
fn resolve_version(
    requested: Option<&str>,
    has_binary: bool,
    versions: &impl VersionResolver,
) -> Result<Option<String>> {
    match requested.filter(|v| !v.is_empty()) {
        Some(v) => Ok(Some(normalize_version(v)?)),
        None if has_binary => Ok(None),
        None => {
            let latest = versions
                .latest_version(PRODUCT)
                .map_err(|e| InstallError::VersionLookup(format!("{e:#}")))?;
            tracing::info!(version = %latest, "resolved latest Consul version");
            Ok(Some(normalize_version(&latest)?))
        }
    }
}
