//! Scoped installation workspace on the target.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result};
use futures_util::FutureExt as _;

use crate::application::ports::CommandOperator;
use crate::domain::shell::quote;
use crate::domain::workspace::generate_workspace_path;

/// A temporary directory on the target, valid for the duration of one
/// [`with_workspace`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    path: String,
}

impl Workspace {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path of `name` inside the workspace.
    #[must_use]
    pub fn file(&self, name: &str) -> String {
        format!("{}/{name}", self.path)
    }
}

/// Run `work` inside a freshly created workspace with a random name.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, or whatever `work`
/// returns.
pub async fn with_workspace<O, F, Fut, T>(op: &O, work: F) -> Result<T>
where
    O: CommandOperator,
    F: FnOnce(Workspace) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_workspace_at(op, generate_workspace_path(), work).await
}

/// Run `work` inside a workspace created at `path`.
///
/// The directory is removed exactly once after `work` finishes, whether it
/// succeeds, fails or panics. A removal failure is logged and never replaces
/// the result of `work`. A panic in `work` resumes after removal.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, or whatever `work`
/// returns.
pub async fn with_workspace_at<O, F, Fut, T>(op: &O, path: String, work: F) -> Result<T>
where
    O: CommandOperator,
    F: FnOnce(Workspace) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let quoted = quote(&path);
    op.execute(&format!("mkdir {quoted}"))
        .await
        .with_context(|| format!("creating installation workspace {path}"))?;
    tracing::debug!(workspace = %path, "workspace created");

    let outcome = AssertUnwindSafe(work(Workspace { path: path.clone() }))
        .catch_unwind()
        .await;

    match op.execute(&format!("rm -rf {quoted}")).await {
        Ok(_) => tracing::debug!(workspace = %path, "workspace removed"),
        Err(e) => tracing::warn!(workspace = %path, "failed to remove workspace: {e:#}"),
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
