//! Adapter over the external cluster tooling.
//!
//! The deployer only talks to `ClusterTools`; `CommandTools` implements it by
//! running `helm` and `kubectl`, and tests substitute a recorder.

mod command;
pub mod prereq;

use std::path::PathBuf;
use std::time::Duration;

use crate::credentials::CredentialScope;
use crate::error::DeployError;

pub use command::{CommandSpec, CommandTools};
pub use prereq::{ToolVersions, ensure_prerequisites};

/// Arguments for a `helm upgrade --install` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub release_name: String,
    pub chart: String,
    /// `None` leaves the chart version unpinned
    pub version: Option<String>,
    pub namespace: String,
    pub values_file: PathBuf,
    pub dry_run: bool,
    pub timeout: Duration,
}

/// Chart repository to refresh before installing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    pub name: String,
    pub url: String,
}

/// A readiness wait on pods matching a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitSpec {
    pub selector: String,
    pub namespace: String,
    pub timeout: Duration,
}

/// Capabilities the deployer needs from the cluster tooling.
///
/// Every call receives the active credential scope; implementations must not
/// rely on ambient kubeconfig state.
pub trait ClusterTools {
    /// Verify the tools exist before any cluster is attempted.
    fn check_prerequisites(&self) -> Result<ToolVersions, DeployError>;

    /// Fail unless the cluster API answers within `timeout`.
    fn check_connectivity(&self, creds: &CredentialScope, timeout: Duration)
    -> anyhow::Result<()>;

    /// Refresh the chart repository index.
    fn sync_repository(&self, creds: &CredentialScope, repo: &RepositorySpec)
    -> anyhow::Result<()>;

    /// Install the release, or upgrade it if it already exists.
    fn upgrade_install(&self, creds: &CredentialScope, release: &ReleaseSpec)
    -> anyhow::Result<()>;

    /// Block until pods matching the selector are ready.
    fn wait_ready(&self, creds: &CredentialScope, wait: &WaitSpec) -> anyhow::Result<()>;
}
