//! Parameters handed from the orchestrator to the target-side routine.

use crate::domain::install::SupervisionMode;
use crate::domain::layout::{ROUTINE_SUBCOMMAND, WS_ROUTINE};
use crate::domain::shell::quote;

/// Environment variable carrying the workspace path.
pub const ENV_WORKSPACE: &str = "CONSUL_UP_WORKSPACE";
/// Environment variable carrying the supervision mode.
pub const ENV_SERVICE_TYPE: &str = "SERVICE_TYPE";
/// Environment variable carrying the Consul version (empty when a binary is uploaded).
pub const ENV_VERSION: &str = "CONSUL_VERSION";

/// Read-only inputs of one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileParams {
    pub workspace: String,
    pub service_type: SupervisionMode,
    pub version: Option<String>,
}

impl ReconcileParams {
    /// Shell command line that runs the uploaded routine with these parameters.
    #[must_use]
    pub fn command_line(&self) -> String {
        let routine = format!("{}/{WS_ROUTINE}", self.workspace);
        format!(
            "{ENV_WORKSPACE}={} {ENV_SERVICE_TYPE}={} {ENV_VERSION}={} {} {ROUTINE_SUBCOMMAND}",
            quote(&self.workspace),
            quote(self.service_type.as_str()),
            quote(self.version.as_deref().unwrap_or_default()),
            quote(&routine),
        )
    }
}
