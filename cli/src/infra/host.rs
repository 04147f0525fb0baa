//! Production `HostSystem`: the machine the installation routine runs on.

use std::path::Path;
use std::process::Output;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, HostSystem};
use crate::domain::shell::quote;

/// Runs host commands through a `CommandRunner`, prefixing privileged ones
/// with `sudo -n` when not running as root.
pub struct SystemHost<R: CommandRunner> {
    runner: R,
    elevate: bool,
}

impl<R: CommandRunner> SystemHost<R> {
    pub fn new(runner: R, elevate: bool) -> Self {
        Self { runner, elevate }
    }

    /// Elevate unless the effective user is root.
    ///
    /// # Errors
    ///
    /// Returns an error if `id -u` cannot be run.
    pub async fn detect(runner: R) -> Result<Self> {
        let out = runner.run("id", &["-u"]).await.context("determining effective user")?;
        let elevate = String::from_utf8_lossy(&out.stdout).trim() != "0";
        tracing::debug!(elevate, "privilege elevation");
        Ok(Self::new(runner, elevate))
    }

    fn argv<'a>(&self, program: &'a str, args: &[&'a str]) -> (&'a str, Vec<&'a str>) {
        if self.elevate {
            let mut argv = vec!["-n", program];
            argv.extend_from_slice(args);
            ("sudo", argv)
        } else {
            (program, args.to_vec())
        }
    }

    async fn privileged(&self, program: &str, args: &[&str]) -> Result<Output> {
        let (program, argv) = self.argv(program, args);
        self.runner.run(program, &argv).await
    }

    async fn test(&self, flag: &str, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.privileged("test", &[flag, &path])
            .await
            .is_ok_and(|o| o.status.success())
    }
}

fn ensure_success(what: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    anyhow::bail!(
        "{what} failed ({}): {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    )
}

impl<R: CommandRunner> HostSystem for SystemHost<R> {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.privileged(program, args).await
    }

    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        if !self.exists(path).await {
            return Ok(None);
        }
        let shown = path.to_string_lossy();
        let output = self.privileged("cat", &["--", &shown]).await?;
        ensure_success(&format!("reading {shown}"), &output)?;
        Ok(Some(output.stdout))
    }

    async fn write_file(&self, path: &Path, content: &[u8], mode: u32) -> Result<()> {
        let shown = path.to_string_lossy();
        let (program, argv) = self.argv("sh", &["-c", "cat > \"$1\"", "sh", &shown]);
        let output = self.runner.run_with_stdin(program, &argv, content).await?;
        ensure_success(&format!("writing {shown}"), &output)?;

        let mode = format!("{mode:o}");
        let output = self.privileged("chmod", &[&mode, &shown]).await?;
        ensure_success(&format!("chmod {shown}"), &output)
    }

    async fn exists(&self, path: &Path) -> bool {
        self.test("-e", path).await
    }

    async fn is_executable(&self, path: &Path) -> bool {
        self.test("-x", path).await
    }

    async fn has_command(&self, name: &str) -> bool {
        let probe = format!("command -v {}", quote(name));
        self.runner
            .run("sh", &["-c", &probe])
            .await
            .is_ok_and(|o| o.status.success())
    }
}
