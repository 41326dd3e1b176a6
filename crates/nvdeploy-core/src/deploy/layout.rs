//! On-disk layout of a cluster directory.

use std::path::{Path, PathBuf};

use crate::error::DeployError;

pub const VALUES_FILE: &str = "values.yaml";
pub const ENV_FILE: &str = "env";

/// Paths of the two files every cluster directory must contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterLayout {
    name: String,
    values_file: PathBuf,
    env_file: PathBuf,
}

impl ClusterLayout {
    /// Build paths for `<repo_root>/<clusters_dir>/<name>`.
    pub fn new(repo_root: &Path, clusters_dir: &str, name: &str) -> Result<Self, DeployError> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(DeployError::InvalidCluster {
                cluster: name.to_string(),
            });
        }

        let dir = repo_root.join(clusters_dir).join(name);
        Ok(Self {
            name: name.to_string(),
            values_file: dir.join(VALUES_FILE),
            env_file: dir.join(ENV_FILE),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values_file(&self) -> &Path {
        &self.values_file
    }

    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    /// Fail with the first missing file, values before env.
    pub fn ensure_files(&self) -> Result<(), DeployError> {
        for path in [&self.values_file, &self.env_file] {
            if !path.is_file() {
                return Err(DeployError::MissingFile {
                    cluster: self.name.clone(),
                    path: path.clone(),
                });
            }
        }
        Ok(())
    }
}
