//! Typed failures surfaced by a deployment run.

use std::path::PathBuf;

/// Why a run, or a single cluster's deployment, failed.
///
/// `Prerequisite` aborts the whole run; every other variant is scoped to one
/// cluster and names it.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("required tool '{tool}' is unavailable: {reason}")]
    Prerequisite { tool: String, reason: String },

    #[error("cluster '{cluster}': missing required file {}", .path.display())]
    MissingFile { cluster: String, path: PathBuf },

    #[error("cluster '{cluster}': invalid cluster name")]
    InvalidCluster { cluster: String },

    #[error("cluster '{cluster}': failed to read env file: {detail}")]
    EnvFile { cluster: String, detail: String },

    #[error("cluster '{cluster}': failed to load credential '{credential}': {detail}")]
    Credential {
        cluster: String,
        credential: String,
        detail: String,
    },

    #[error("cluster '{cluster}': unreachable: {detail}")]
    Connectivity { cluster: String, detail: String },

    #[error("cluster '{cluster}': helm upgrade --install of release '{release}' failed: {detail}")]
    Deployment {
        cluster: String,
        release: String,
        detail: String,
    },

    #[error(
        "cluster '{cluster}': pods matching '{selector}' in namespace '{namespace}' not ready: {detail}"
    )]
    Readiness {
        cluster: String,
        selector: String,
        namespace: String,
        detail: String,
    },
}

impl DeployError {
    /// Short machine-readable tag for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DeployError::Prerequisite { .. } => "prerequisite",
            DeployError::MissingFile { .. } => "missing_file",
            DeployError::InvalidCluster { .. } => "invalid_cluster",
            DeployError::EnvFile { .. } => "env_file",
            DeployError::Credential { .. } => "credential",
            DeployError::Connectivity { .. } => "connectivity",
            DeployError::Deployment { .. } => "deployment",
            DeployError::Readiness { .. } => "readiness",
        }
    }
}

/// Render an adapter error with its full context chain.
pub(crate) fn detail(err: &anyhow::Error) -> String {
    format!("{err:#}")
}
