//! `CommandOperator` implementations: local process execution and a
//! multiplexed OpenSSH session.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Child;

use crate::application::ports::{CommandOperator, CommandRunner, OperatorConnector};
use crate::domain::error::OperatorError;
use crate::domain::shell::quote;
use crate::domain::target::{RemoteTarget, Target};
use crate::infra::command_runner::{INSTALL_TIMEOUT, TokioCommandRunner};

/// How long to wait for the SSH master connection to come up.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// Suffix of the sibling file an upload is staged in before the rename.
const UPLOAD_SUFFIX: &str = ".consul-up-tmp";

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn command_result(command: &str, output: &Output) -> Result<String> {
    let text = combined(output);
    if output.status.success() {
        return Ok(text);
    }
    Err(OperatorError::Command {
        command: command.to_string(),
        status: output.status.to_string(),
        output: text,
    }
    .into())
}

// ── Local ─────────────────────────────────────────────────────────────────────

/// Runs commands on this machine through `sh -c`.
pub struct LocalOperator<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> LocalOperator<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

impl<R: CommandRunner> CommandOperator for LocalOperator<R> {
    async fn execute(&self, command: &str) -> Result<String> {
        tracing::debug!(command, "local execute");
        let output = self.runner.run("sh", &["-c", command]).await?;
        command_result(command, &output)
    }

    async fn upload(&self, content: &[u8], destination: &str, mode: u32) -> Result<()> {
        tracing::debug!(destination, mode = format_args!("{mode:o}"), bytes = content.len(), "local upload");
        let target = PathBuf::from(destination);
        let content = content.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&target, &content, mode))
            .await
            .context("spawn_blocking for local upload")?
            .map_err(|reason| OperatorError::Upload {
                destination: destination.to_string(),
                reason,
            })?;
        Ok(())
    }
}

/// Stage `content` in a sibling temp file, apply `mode`, rename over `path`.
fn write_atomic(path: &Path, content: &[u8], mode: u32) -> std::result::Result<(), String> {
    use std::io::Write as _;
    use std::os::unix::fs::PermissionsExt as _;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut staged = tempfile::Builder::new()
        .suffix(UPLOAD_SUFFIX)
        .tempfile_in(dir)
        .map_err(|e| format!("cannot stage in {}: {e}", dir.display()))?;
    staged.write_all(content).map_err(|e| e.to_string())?;
    staged.as_file().sync_all().map_err(|e| e.to_string())?;
    staged
        .as_file()
        .set_permissions(std::fs::Permissions::from_mode(mode))
        .map_err(|e| e.to_string())?;
    staged.persist(path).map_err(|e| e.error.to_string())?;
    Ok(())
}

// ── Remote ────────────────────────────────────────────────────────────────────

/// One OpenSSH master connection; every command and upload is multiplexed
/// over its control socket.
pub struct RemoteOperator<R: CommandRunner> {
    runner: R,
    target: RemoteTarget,
    control: String,
    master: Mutex<Option<Child>>,
    // Holds the control socket; removed on drop.
    _control_dir: tempfile::TempDir,
}

impl<R: CommandRunner> RemoteOperator<R> {
    /// Open the master connection and wait until it accepts sessions.
    ///
    /// # Errors
    ///
    /// [`OperatorError::Connection`] if `ssh` cannot be started, exits early
    /// (for example on authentication failure) or does not come up in time.
    pub async fn connect(runner: R, target: RemoteTarget) -> Result<Self> {
        let connection_error = |reason: String| OperatorError::Connection {
            target: format!("{}:{}", target.destination(), target.port),
            reason,
        };

        let control_dir = tempfile::Builder::new()
            .prefix("consul-up-ssh.")
            .tempdir()
            .context("creating control socket directory")?;
        let control = control_dir.path().join("master.sock").to_string_lossy().into_owned();
        let port = target.port.to_string();
        let key = target.ssh_key.to_string_lossy().into_owned();
        let dest = target.destination();

        tracing::debug!(%dest, port = target.port, key = %key, "opening ssh master connection");
        let mut master = runner
            .spawn(
                "ssh",
                &[
                    "-M", "-N", "-S", &control, "-i", &key, "-p", &port,
                    "-o", "BatchMode=yes",
                    "-o", "StrictHostKeyChecking=accept-new",
                    "-o", "ConnectTimeout=10",
                    &dest,
                ],
            )
            .map_err(|e| connection_error(format!("{e:#}")))?;

        let deadline = Instant::now() + CONNECT_TIMEOUT;
        loop {
            if let Some(status) = master.try_wait().context("polling ssh master")? {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.stderr.take() {
                    let _ = pipe.read_to_string(&mut stderr).await;
                }
                let reason = match stderr.trim() {
                    "" => format!("ssh exited with {status}"),
                    text => text.to_string(),
                };
                return Err(connection_error(reason).into());
            }

            let check = runner
                .run_with_timeout("ssh", &["-S", &control, "-O", "check", &dest], CHECK_TIMEOUT)
                .await;
            if check.is_ok_and(|o| o.status.success()) {
                break;
            }

            if Instant::now() >= deadline {
                let _ = master.kill().await;
                return Err(connection_error(format!(
                    "no connection after {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
                .into());
            }
            tokio::time::sleep(CHECK_INTERVAL).await;
        }
        tracing::debug!(%dest, "ssh master connection ready");

        Ok(Self {
            runner,
            target,
            control,
            master: Mutex::new(Some(master)),
            _control_dir: control_dir,
        })
    }

    /// Arguments that route an `ssh` invocation over the master connection.
    fn session_args<'a>(&'a self, port: &'a str, dest: &'a str) -> Vec<&'a str> {
        vec!["-S", &self.control, "-p", port, "-o", "BatchMode=yes", dest]
    }

    fn take_master(&self) -> Option<Child> {
        self.master.lock().ok().and_then(|mut guard| guard.take())
    }
}

impl<R: CommandRunner> CommandOperator for RemoteOperator<R> {
    async fn execute(&self, command: &str) -> Result<String> {
        tracing::debug!(host = %self.target.destination(), command, "remote execute");
        let port = self.target.port.to_string();
        let dest = self.target.destination();
        let mut args = self.session_args(&port, &dest);
        args.push(command);
        let output = self.runner.run("ssh", &args).await?;
        command_result(command, &output)
    }

    async fn upload(&self, content: &[u8], destination: &str, mode: u32) -> Result<()> {
        tracing::debug!(
            host = %self.target.destination(),
            destination,
            mode = format_args!("{mode:o}"),
            bytes = content.len(),
            "remote upload"
        );
        let staged = quote(&format!("{destination}{UPLOAD_SUFFIX}"));
        let script = format!(
            "{{ cat > {staged} && chmod {mode:o} {staged} && mv -f {staged} {}; }} || {{ rm -f {staged}; exit 1; }}",
            quote(destination)
        );
        let port = self.target.port.to_string();
        let dest = self.target.destination();
        let mut args = self.session_args(&port, &dest);
        args.push(&script);

        let output = self
            .runner
            .run_with_stdin("ssh", &args, content)
            .await
            .map_err(|e| OperatorError::Upload {
                destination: destination.to_string(),
                reason: format!("{e:#}"),
            })?;
        if !output.status.success() {
            return Err(OperatorError::Upload {
                destination: destination.to_string(),
                reason: match combined(&output).trim() {
                    "" => output.status.to_string(),
                    text => text.to_string(),
                },
            }
            .into());
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let dest = self.target.destination();
        let exit = self
            .runner
            .run_with_timeout("ssh", &["-S", &self.control, "-O", "exit", &dest], CHECK_TIMEOUT)
            .await;
        if let Some(mut master) = self.take_master()
            && let Err(e) = master.kill().await
        {
            tracing::debug!(%dest, "ssh master already gone: {e}");
        }
        match exit {
            Ok(output) if output.status.success() => {
                tracing::debug!(%dest, "ssh master connection closed");
                Ok(())
            }
            Ok(output) => anyhow::bail!(
                "ssh -O exit for {dest} failed ({}): {}",
                output.status,
                combined(&output).trim()
            ),
            Err(e) => Err(e.context(format!("closing ssh master connection to {dest}"))),
        }
    }
}

impl<R: CommandRunner> Drop for RemoteOperator<R> {
    fn drop(&mut self) {
        if let Some(mut master) = self.take_master() {
            let _ = master.start_kill();
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// The operator chosen for a [`Target`].
pub enum Operator {
    Local(LocalOperator<TokioCommandRunner>),
    Remote(RemoteOperator<TokioCommandRunner>),
}

impl CommandOperator for Operator {
    async fn execute(&self, command: &str) -> Result<String> {
        match self {
            Self::Local(op) => op.execute(command).await,
            Self::Remote(op) => op.execute(command).await,
        }
    }

    async fn upload(&self, content: &[u8], destination: &str, mode: u32) -> Result<()> {
        match self {
            Self::Local(op) => op.upload(content, destination, mode).await,
            Self::Remote(op) => op.upload(content, destination, mode).await,
        }
    }

    async fn close(&self) -> Result<()> {
        match self {
            Self::Local(op) => op.close().await,
            Self::Remote(op) => op.close().await,
        }
    }
}

/// Production `OperatorConnector`.
pub struct SystemConnector;

impl OperatorConnector for SystemConnector {
    type Operator = Operator;

    async fn connect(&self, target: &Target) -> Result<Operator> {
        let runner = TokioCommandRunner::new(INSTALL_TIMEOUT);
        Ok(match target {
            Target::Local => Operator::Local(LocalOperator::new(runner)),
            Target::Remote(remote) => {
                Operator::Remote(RemoteOperator::connect(runner, remote.clone()).await?)
            }
        })
    }
}
