//! Deploy the release to one cluster.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::layout::ClusterLayout;
use super::request::DeploymentRequest;
use crate::config::{DeployDefaults, load_env_file};
use crate::credentials::CredentialStore;
use crate::error::{DeployError, detail};
use crate::tools::{ClusterTools, ReleaseSpec, RepositorySpec, WaitSpec};

/// How a successful deployment ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployOutcome {
    /// Release applied and all readiness waits passed
    Deployed,
    /// Helm ran with `--dry-run`; readiness waits were skipped
    DryRun,
}

/// Check `cluster`'s files under `repo_root` and resolve its request.
///
/// Needs neither tools nor credentials.
pub fn plan_cluster(
    repo_root: &Path,
    defaults: &DeployDefaults,
    cluster: &str,
) -> Result<DeploymentRequest, DeployError> {
    let layout = ClusterLayout::new(repo_root, &defaults.clusters_dir, cluster)?;
    layout.ensure_files()?;

    let config = load_env_file(layout.env_file()).map_err(|err| DeployError::EnvFile {
        cluster: cluster.to_string(),
        detail: detail(&err),
    })?;

    Ok(DeploymentRequest::resolve(
        cluster,
        &config,
        defaults,
        layout.values_file().to_path_buf(),
    ))
}

/// Runs the per-cluster deployment sequence.
pub struct ClusterDeployer<'a> {
    repo_root: PathBuf,
    defaults: &'a DeployDefaults,
    tools: &'a dyn ClusterTools,
    credentials: &'a dyn CredentialStore,
}

impl<'a> ClusterDeployer<'a> {
    pub fn new(
        repo_root: PathBuf,
        defaults: &'a DeployDefaults,
        tools: &'a dyn ClusterTools,
        credentials: &'a dyn CredentialStore,
    ) -> Self {
        Self {
            repo_root,
            defaults,
            tools,
            credentials,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn tools(&self) -> &'a dyn ClusterTools {
        self.tools
    }

    /// Check the cluster's files and resolve its request without touching
    /// the cluster.
    pub fn plan(&self, cluster: &str) -> Result<DeploymentRequest, DeployError> {
        plan_cluster(&self.repo_root, self.defaults, cluster)
    }

    /// Deploy to `cluster`, stopping at the first failing step.
    pub fn deploy(&self, cluster: &str) -> Result<DeployOutcome, DeployError> {
        let request = self.plan(cluster)?;
        tracing::info!(
            cluster = %request.cluster,
            namespace = %request.namespace,
            release = %request.release_name,
            chart_version = %request.chart_version,
            dry_run = request.dry_run,
            "Deploying cluster"
        );

        // Released when `creds` drops, on every return path below.
        let creds = self
            .credentials
            .acquire(&request.credential)
            .map_err(|err| DeployError::Credential {
                cluster: cluster.to_string(),
                credential: request.credential.clone(),
                detail: detail(&err),
            })?;

        self.tools
            .check_connectivity(&creds, self.defaults.connect_timeout())
            .map_err(|err| DeployError::Connectivity {
                cluster: cluster.to_string(),
                detail: detail(&err),
            })?;

        let repo = RepositorySpec {
            name: self.defaults.repo_name.clone(),
            url: self.defaults.repo_url.clone(),
        };
        if let Err(err) = self.tools.sync_repository(&creds, &repo) {
            tracing::warn!(
                cluster,
                repo = %repo.name,
                error = %detail(&err),
                "Chart repository sync failed; continuing with cached index"
            );
        }

        let release = ReleaseSpec {
            release_name: request.release_name.clone(),
            chart: self.defaults.chart.clone(),
            version: request.pinned_version().map(str::to_string),
            namespace: request.namespace.clone(),
            values_file: request.values_file.clone(),
            dry_run: request.dry_run,
            timeout: self.defaults.install_timeout(),
        };
        self.tools
            .upgrade_install(&creds, &release)
            .map_err(|err| DeployError::Deployment {
                cluster: cluster.to_string(),
                release: request.release_name.clone(),
                detail: detail(&err),
            })?;

        if request.dry_run {
            tracing::info!(cluster, "Dry run complete; skipping readiness checks");
            return Ok(DeployOutcome::DryRun);
        }

        for selector in &self.defaults.readiness_selectors {
            let wait = WaitSpec {
                selector: selector.clone(),
                namespace: request.namespace.clone(),
                timeout: self.defaults.readiness_timeout(),
            };
            self.tools
                .wait_ready(&creds, &wait)
                .map_err(|err| DeployError::Readiness {
                    cluster: cluster.to_string(),
                    selector: selector.clone(),
                    namespace: request.namespace.clone(),
                    detail: detail(&err),
                })?;
            tracing::debug!(cluster, selector = %selector, "Pods ready");
        }

        tracing::info!(cluster, "Deployment complete");
        Ok(DeployOutcome::Deployed)
    }
}
