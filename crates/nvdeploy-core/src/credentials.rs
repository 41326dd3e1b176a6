//! Scoped cluster credentials.
//!
//! A `CredentialScope` owns a private kubeconfig copy for exactly one cluster
//! deployment. Dropping the scope deletes the file, so every exit path of a
//! deployment releases its credentials.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tempfile::NamedTempFile;

/// Environment variable overriding the credentials directory.
pub const CREDENTIALS_DIR_ENV: &str = "NVDEPLOY_CREDENTIALS_DIR";

/// Looks up a kubeconfig by credential id.
pub trait CredentialStore {
    fn acquire(&self, credential_id: &str) -> anyhow::Result<CredentialScope>;
}

/// Kubeconfig for a single cluster, valid until dropped.
#[derive(Debug)]
pub struct CredentialScope {
    credential_id: String,
    kubeconfig: NamedTempFile,
}

impl CredentialScope {
    /// Materialize kubeconfig content into a private temporary file.
    pub fn from_kubeconfig(credential_id: &str, content: &str) -> anyhow::Result<Self> {
        let mut kubeconfig = tempfile::Builder::new()
            .prefix("nvdeploy-kubeconfig-")
            .tempfile()
            .context("Failed to create temporary kubeconfig")?;
        kubeconfig
            .write_all(content.as_bytes())
            .and_then(|_| kubeconfig.flush())
            .context("Failed to write temporary kubeconfig")?;

        tracing::debug!(credential = credential_id, "Acquired credential scope");
        Ok(Self {
            credential_id: credential_id.to_string(),
            kubeconfig,
        })
    }

    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    /// Path to pass as `KUBECONFIG` to child processes.
    pub fn kubeconfig_path(&self) -> &Path {
        self.kubeconfig.path()
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        tracing::debug!(credential = %self.credential_id, "Released credential scope");
    }
}

/// Resolves credential ids to kubeconfig files inside one directory.
#[derive(Debug, Clone)]
pub struct DirCredentialStore {
    root: PathBuf,
}

impl DirCredentialStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Use `$NVDEPLOY_CREDENTIALS_DIR`, falling back to `<config_dir>/nvdeploy/credentials`.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Some(dir) = std::env::var_os(CREDENTIALS_DIR_ENV) {
            return Ok(Self::new(PathBuf::from(dir)));
        }
        let root = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("nvdeploy")
            .join("credentials");
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn credential_path(&self, credential_id: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(credential_id);
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(relative)),
            _ => anyhow::bail!("Invalid credential id: '{}'", credential_id),
        }
    }
}

impl CredentialStore for DirCredentialStore {
    fn acquire(&self, credential_id: &str) -> anyhow::Result<CredentialScope> {
        let path = self.credential_path(credential_id)?;
        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Credential '{}' not found at {}",
                credential_id,
                path.display()
            )
        })?;
        CredentialScope::from_kubeconfig(credential_id, &content)
    }
}
