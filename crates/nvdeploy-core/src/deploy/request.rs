//! Resolve a cluster's env settings against the deployment defaults.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{ClusterConfig, DeployDefaults, LATEST_CHART_VERSION};

pub const KEY_CREDENTIAL: &str = "KUBECONFIG_CREDENTIAL";
pub const KEY_CHART_VERSION: &str = "HELM_CHART_VERSION";
pub const KEY_NAMESPACE: &str = "NAMESPACE";
pub const KEY_RELEASE_NAME: &str = "RELEASE_NAME";
pub const KEY_DRY_RUN: &str = "DRY_RUN";

/// Everything needed to deploy one cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRequest {
    pub cluster: String,
    /// Credential id handed to the credential store
    pub credential: String,
    pub namespace: String,
    pub release_name: String,
    /// `latest` means the chart version is not pinned
    pub chart_version: String,
    pub dry_run: bool,
    pub values_file: PathBuf,
}

impl DeploymentRequest {
    /// Apply defaults for every key the env file leaves unset or empty.
    pub fn resolve(
        cluster: &str,
        config: &ClusterConfig,
        defaults: &DeployDefaults,
        values_file: PathBuf,
    ) -> Self {
        let lookup = |key: &str| config.get(key).filter(|v| !v.is_empty());

        Self {
            cluster: cluster.to_string(),
            credential: lookup(KEY_CREDENTIAL)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}{}", cluster, defaults.credential_suffix)),
            namespace: lookup(KEY_NAMESPACE)
                .unwrap_or(&defaults.namespace)
                .to_string(),
            release_name: lookup(KEY_RELEASE_NAME)
                .unwrap_or(&defaults.release_name)
                .to_string(),
            chart_version: lookup(KEY_CHART_VERSION)
                .unwrap_or(&defaults.chart_version)
                .to_string(),
            dry_run: config
                .get(KEY_DRY_RUN)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            values_file,
        }
    }

    /// The version to pass to `--version`, if any.
    pub fn pinned_version(&self) -> Option<&str> {
        if self.chart_version == LATEST_CHART_VERSION {
            None
        } else {
            Some(&self.chart_version)
        }
    }
}
