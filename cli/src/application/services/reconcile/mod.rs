//! Target-side reconciliation: the idempotent install and restart routine.
//!
//! Runs on the target host against the [`HostSystem`] port. Each state reads
//! and updates an explicit [`ReconcileContext`]; nothing is carried in
//! process environment between states. The service restarts only when the
//! installed-state signature changed.

pub mod package;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{HostSystem, ProgressReporter};
use crate::domain::arch::Architecture;
use crate::domain::error::ReconcileError;
use crate::domain::layout::{
    BIN_DIR, CONFIG_DIR, CONFIG_FILE, CONSUL_BIN, DATA_DIR, SERVICE_FILE, SERVICE_NAME,
    SERVICE_USER, STAGED_BIN, SYSTEMD_RUN_DIR, TLS_FILES, WS_BINARY, WS_CONFIG, WS_RELEASE_DIR,
    installed_tls_path, signature_files,
};
use crate::domain::reconcile::ReconcileParams;
use crate::domain::release::{
    archive_name, archive_url, checksums_name, checksums_url, parse_installed_version,
    verify_checksum,
};
use crate::domain::signature::InstalledSignature;
use crate::domain::systemd::service_unit;

pub use package::PackageManager;

/// Tools needed to download and unpack a release.
const DOWNLOAD_TOOLS: [&str; 2] = ["curl", "unzip"];

/// States of the routine, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    VerifyEnvironment,
    DetectArchitecture,
    CaptureBeforeHash,
    EnsureDependencies,
    InstallOrLinkBinary,
    WriteConfigAndCredentials,
    WriteServiceDefinition,
    CaptureAfterHash,
    Idle,
    RestartService,
    Done,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VerifyEnvironment => "verifying environment",
            Self::DetectArchitecture => "detecting architecture",
            Self::CaptureBeforeHash => "hashing installed files",
            Self::EnsureDependencies => "installing dependencies",
            Self::InstallOrLinkBinary => "installing Consul binary",
            Self::WriteConfigAndCredentials => "writing configuration",
            Self::WriteServiceDefinition => "writing service definition",
            Self::CaptureAfterHash => "hashing updated files",
            Self::Idle => "leaving service untouched",
            Self::RestartService => "restarting service",
            Self::Done => "done",
        })
    }
}

/// Data threaded from state to state.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub params: ReconcileParams,
    pub arch: Option<Architecture>,
    pub before: Option<InstalledSignature>,
    pub after: Option<InstalledSignature>,
    /// A Consul binary was placed in the workspace by the orchestrator.
    pub uploaded_binary: bool,
}

impl ReconcileContext {
    #[must_use]
    pub fn new(params: ReconcileParams) -> Self {
        Self {
            params,
            arch: None,
            before: None,
            after: None,
            uploaded_binary: false,
        }
    }

    fn workspace_file(&self, name: &str) -> PathBuf {
        Path::new(&self.params.workspace).join(name)
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub restarted: bool,
    pub before: InstalledSignature,
    pub after: InstalledSignature,
    /// Every state entered, in order, ending with `Done`.
    pub visited: Vec<ReconcileState>,
}

/// Drives the reconciliation state machine on one host.
pub struct Reconciler<'a, H: HostSystem, R: ProgressReporter> {
    host: &'a H,
    reporter: &'a R,
}

impl<'a, H: HostSystem, R: ProgressReporter> Reconciler<'a, H, R> {
    #[must_use]
    pub fn new(host: &'a H, reporter: &'a R) -> Self {
        Self { host, reporter }
    }

    /// Run every state in order until `Done`.
    ///
    /// # Errors
    ///
    /// Returns the first failing state's error, wrapped with the state name.
    /// No state is retried.
    pub async fn run(&self, params: ReconcileParams) -> Result<ReconcileReport> {
        let mut ctx = ReconcileContext::new(params);
        let mut state = ReconcileState::VerifyEnvironment;
        let mut visited = Vec::new();
        let mut restarted = false;

        while state != ReconcileState::Done {
            let current = state;
            visited.push(current);
            tracing::info!(state = %current, "reconcile");
            restarted |= current == ReconcileState::RestartService;
            state = self
                .step(current, &mut ctx)
                .await
                .with_context(|| format!("{current} failed"))?;
        }
        visited.push(ReconcileState::Done);

        Ok(ReconcileReport {
            restarted,
            before: ctx.before.unwrap_or_else(|| InstalledSignature::from_files([])),
            after: ctx.after.unwrap_or_else(|| InstalledSignature::from_files([])),
            visited,
        })
    }

    /// Execute one state and return the next.
    async fn step(&self, state: ReconcileState, ctx: &mut ReconcileContext) -> Result<ReconcileState> {
        use ReconcileState as S;
        Ok(match state {
            S::VerifyEnvironment => {
                self.verify_environment(ctx).await?;
                S::DetectArchitecture
            }
            S::DetectArchitecture => {
                let out = run_checked(self.host, "uname", &["-m"]).await?;
                let arch = Architecture::from_machine(&out)?;
                tracing::debug!(%arch, "detected architecture");
                ctx.arch = Some(arch);
                S::CaptureBeforeHash
            }
            S::CaptureBeforeHash => {
                ctx.before = Some(self.signature().await?);
                S::EnsureDependencies
            }
            S::EnsureDependencies => {
                self.ensure_dependencies(ctx).await?;
                S::InstallOrLinkBinary
            }
            S::InstallOrLinkBinary => {
                self.install_binary(ctx).await?;
                S::WriteConfigAndCredentials
            }
            S::WriteConfigAndCredentials => {
                self.write_config(ctx).await?;
                S::WriteServiceDefinition
            }
            S::WriteServiceDefinition => {
                self.reporter.step(&format!("Creating service file {SERVICE_FILE}"));
                let unit = service_unit(ctx.params.service_type);
                self.host.write_file(Path::new(SERVICE_FILE), unit.as_bytes(), 0o644).await?;
                S::CaptureAfterHash
            }
            S::CaptureAfterHash => {
                let after = self.signature().await?;
                let changed = ctx.before.as_ref() != Some(&after);
                ctx.after = Some(after);
                if changed { S::RestartService } else { S::Idle }
            }
            S::Idle => {
                self.reporter.success("No change detected so skipping service start");
                S::Done
            }
            S::RestartService => {
                self.reporter.step("Starting consul");
                run_checked(self.host, "systemctl", &["daemon-reload"]).await?;
                run_checked(self.host, "systemctl", &["enable", SERVICE_NAME]).await?;
                run_checked(self.host, "systemctl", &["restart", SERVICE_NAME]).await?;
                self.reporter.success("Consul started");
                S::Done
            }
            S::Done => S::Done,
        })
    }

    async fn verify_environment(&self, ctx: &mut ReconcileContext) -> Result<()> {
        if !self.host.exists(Path::new(SYSTEMD_RUN_DIR)).await {
            return Err(ReconcileError::MissingServiceSupervisor.into());
        }
        ctx.uploaded_binary = self.host.is_executable(&ctx.workspace_file(WS_BINARY)).await;
        if !ctx.uploaded_binary && ctx.params.version.is_none() {
            return Err(ReconcileError::MissingVersion.into());
        }
        Ok(())
    }

    async fn signature(&self) -> Result<InstalledSignature> {
        let mut files = Vec::new();
        for path in signature_files() {
            let content = self
                .host
                .read_file(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            files.push((path, content));
        }
        Ok(InstalledSignature::from_files(
            files.iter().map(|(path, content)| (path.as_path(), content.as_deref())),
        ))
    }

    async fn ensure_dependencies(&self, ctx: &ReconcileContext) -> Result<()> {
        if ctx.uploaded_binary {
            return Ok(());
        }
        let mut missing = false;
        for tool in DOWNLOAD_TOOLS {
            missing |= !self.host.has_command(tool).await;
        }
        if !missing {
            return Ok(());
        }
        let manager = PackageManager::detect(self.host)
            .await
            .ok_or(ReconcileError::NoPackageManager)?;
        self.reporter.step(&format!("Installing curl and unzip with {manager}"));
        manager.install(self.host, &DOWNLOAD_TOOLS).await
    }

    async fn install_binary(&self, ctx: &ReconcileContext) -> Result<()> {
        if ctx.uploaded_binary {
            self.reporter.step("Installing uploaded Consul binary");
            return self.place_binary(&ctx.workspace_file(WS_BINARY)).await;
        }

        let version = ctx.params.version.as_deref().ok_or(ReconcileError::MissingVersion)?;
        if self.installed_version().await.as_deref() == Some(version) {
            self.reporter.success(&format!(
                "Consul binary already installed in {BIN_DIR}, skipping downloading and installing binary"
            ));
            return Ok(());
        }

        let arch = ctx
            .arch
            .context("architecture must be detected before installing")?;
        let archive = archive_name(version, arch);
        self.reporter.step(&format!("Downloading and unpacking {archive}"));

        let archive_path = ctx.workspace_file(&archive);
        let release_dir = ctx.workspace_file(WS_RELEASE_DIR);
        let sums_path = ctx.workspace_file(&checksums_name(version));
        self.download(&archive_url(version, arch), &archive_path).await?;
        self.download(&checksums_url(version), &sums_path).await?;

        let content = self.read_required(&archive_path).await?;
        let sums = self.read_required(&sums_path).await?;
        verify_checksum(&archive, &content, &String::from_utf8_lossy(&sums))?;
        tracing::debug!(%archive, "checksum verified");

        run_checked(
            self.host,
            "unzip",
            &["-qq", "-o", &archive_path.to_string_lossy(), "-d", &release_dir.to_string_lossy()],
        )
        .await?;
        self.place_binary(&release_dir.join(WS_BINARY)).await
    }

    /// Copy `source` next to the installed binary, then rename it into place.
    ///
    /// The rename swaps the directory entry, so a running agent keeps its
    /// old inode and the copy never hits `ETXTBSY`.
    async fn place_binary(&self, source: &Path) -> Result<()> {
        run_checked(self.host, "cp", &[&source.to_string_lossy(), STAGED_BIN]).await?;
        run_checked(self.host, "chmod", &["755", STAGED_BIN]).await?;
        run_checked(self.host, "mv", &["-f", STAGED_BIN, CONSUL_BIN]).await?;
        Ok(())
    }

    async fn installed_version(&self) -> Option<String> {
        if !self.host.is_executable(Path::new(CONSUL_BIN)).await {
            return None;
        }
        let output = self.host.run(CONSUL_BIN, &["version"]).await.ok()?;
        if !output.status.success() {
            return None;
        }
        parse_installed_version(&String::from_utf8_lossy(&output.stdout))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        run_checked(self.host, "curl", &["-o", &destination.to_string_lossy(), "-sfL", url])
            .await
            .with_context(|| format!("downloading {url}"))?;
        Ok(())
    }

    async fn read_required(&self, path: &Path) -> Result<Vec<u8>> {
        self.host
            .read_file(path)
            .await?
            .with_context(|| format!("{} is missing", path.display()))
    }

    async fn write_config(&self, ctx: &ReconcileContext) -> Result<()> {
        let user = run_unchecked(self.host, "id", &[SERVICE_USER]).await?;
        if user.status.success() {
            self.reporter
                .success(&format!("User {SERVICE_USER} already exists. Will not create again."));
        } else {
            self.reporter.step(&format!("Creating user named {SERVICE_USER}"));
            run_checked(
                self.host,
                "useradd",
                &["--system", "--home", CONFIG_DIR, "--shell", "/bin/false", SERVICE_USER],
            )
            .await?;
        }

        run_checked(self.host, "mkdir", &["--parents", DATA_DIR]).await?;
        run_checked(self.host, "mkdir", &["--parents", CONFIG_DIR]).await?;

        let config = ctx.workspace_file(WS_CONFIG);
        run_checked(self.host, "cp", &[&config.to_string_lossy(), CONFIG_FILE]).await?;
        for name in TLS_FILES {
            let source = ctx.workspace_file(name);
            if self.host.exists(&source).await {
                let destination = installed_tls_path(name);
                run_checked(
                    self.host,
                    "cp",
                    &[&source.to_string_lossy(), &destination.to_string_lossy()],
                )
                .await?;
            }
        }

        let owner = format!("{SERVICE_USER}:{SERVICE_USER}");
        run_checked(self.host, "chown", &["--recursive", &owner, DATA_DIR]).await?;
        run_checked(self.host, "chown", &["--recursive", &owner, CONFIG_DIR]).await?;
        Ok(())
    }
}

async fn run_unchecked(host: &impl HostSystem, program: &str, args: &[&str]) -> Result<std::process::Output> {
    tracing::debug!(program, ?args, "run");
    host.run(program, args).await
}

/// Run a command on the host and fail on a non-zero exit.
///
/// Returns stdout as text.
pub(crate) async fn run_checked(host: &impl HostSystem, program: &str, args: &[&str]) -> Result<String> {
    let output = run_unchecked(host, program, args).await?;
    if !output.status.success() {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(ReconcileError::CommandFailed {
            command: std::iter::once(program).chain(args.iter().copied()).collect::<Vec<_>>().join(" "),
            output: text,
        }
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
