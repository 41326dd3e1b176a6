//! Shared fakes and fixtures for integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nvdeploy_core::credentials::{CredentialScope, CredentialStore};
use nvdeploy_core::error::DeployError;
use nvdeploy_core::tools::{ClusterTools, ReleaseSpec, RepositorySpec, ToolVersions, WaitSpec};
use semver::Version;

/// One recorded adapter call, tagged with the credential it ran under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Prerequisites,
    Connectivity {
        credential: String,
        timeout: Duration,
    },
    SyncRepository {
        credential: String,
        repo: RepositorySpec,
    },
    UpgradeInstall {
        credential: String,
        release: ReleaseSpec,
    },
    WaitReady {
        credential: String,
        wait: WaitSpec,
    },
}

/// `ClusterTools` that records calls and fails on request.
#[derive(Default)]
pub struct FakeTools {
    pub calls: RefCell<Vec<Call>>,
    pub kubeconfigs: RefCell<Vec<PathBuf>>,
    fail_prerequisites: bool,
    fail_sync: bool,
    unreachable: Vec<String>,
    failing_installs: Vec<String>,
    unready_selectors: Vec<String>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_prerequisites(mut self) -> Self {
        self.fail_prerequisites = true;
        self
    }

    pub fn failing_sync(mut self) -> Self {
        self.fail_sync = true;
        self
    }

    pub fn unreachable(mut self, credential: &str) -> Self {
        self.unreachable.push(credential.to_string());
        self
    }

    pub fn failing_install(mut self, credential: &str) -> Self {
        self.failing_installs.push(credential.to_string());
        self
    }

    pub fn unready(mut self, selector: &str) -> Self {
        self.unready_selectors.push(selector.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, creds: &CredentialScope, call: Call) {
        assert!(
            creds.kubeconfig_path().exists(),
            "credential scope must be live during {call:?}"
        );
        self.kubeconfigs
            .borrow_mut()
            .push(creds.kubeconfig_path().to_path_buf());
        self.calls.borrow_mut().push(call);
    }
}

impl ClusterTools for FakeTools {
    fn check_prerequisites(&self) -> Result<ToolVersions, DeployError> {
        self.calls.borrow_mut().push(Call::Prerequisites);
        if self.fail_prerequisites {
            return Err(DeployError::Prerequisite {
                tool: "helm".to_string(),
                reason: "not found in PATH".to_string(),
            });
        }
        Ok(ToolVersions {
            helm: Version::new(3, 14, 2),
            kubectl: Version::new(1, 30, 1),
        })
    }

    fn check_connectivity(
        &self,
        creds: &CredentialScope,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        let credential = creds.credential_id().to_string();
        self.record(
            creds,
            Call::Connectivity {
                credential: credential.clone(),
                timeout,
            },
        );
        if self.unreachable.contains(&credential) {
            anyhow::bail!("Unable to connect to the server: dial tcp: i/o timeout");
        }
        Ok(())
    }

    fn sync_repository(
        &self,
        creds: &CredentialScope,
        repo: &RepositorySpec,
    ) -> anyhow::Result<()> {
        self.record(
            creds,
            Call::SyncRepository {
                credential: creds.credential_id().to_string(),
                repo: repo.clone(),
            },
        );
        if self.fail_sync {
            anyhow::bail!("Error: looks like the repository is not reachable");
        }
        Ok(())
    }

    fn upgrade_install(
        &self,
        creds: &CredentialScope,
        release: &ReleaseSpec,
    ) -> anyhow::Result<()> {
        let credential = creds.credential_id().to_string();
        self.record(
            creds,
            Call::UpgradeInstall {
                credential: credential.clone(),
                release: release.clone(),
            },
        );
        if self.failing_installs.contains(&credential) {
            anyhow::bail!("Error: UPGRADE FAILED: context deadline exceeded");
        }
        Ok(())
    }

    fn wait_ready(&self, creds: &CredentialScope, wait: &WaitSpec) -> anyhow::Result<()> {
        self.record(
            creds,
            Call::WaitReady {
                credential: creds.credential_id().to_string(),
                wait: wait.clone(),
            },
        );
        if self.unready_selectors.contains(&wait.selector) {
            anyhow::bail!("timed out waiting for the condition on pods");
        }
        Ok(())
    }
}

/// Credential store that fabricates kubeconfigs, except for `missing` ids.
#[derive(Default)]
pub struct FakeCredentials {
    pub acquired: RefCell<Vec<String>>,
    missing: Vec<String>,
}

impl FakeCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(mut self, credential: &str) -> Self {
        self.missing.push(credential.to_string());
        self
    }

    pub fn acquired(&self) -> Vec<String> {
        self.acquired.borrow().clone()
    }
}

impl CredentialStore for FakeCredentials {
    fn acquire(&self, credential_id: &str) -> anyhow::Result<CredentialScope> {
        self.acquired.borrow_mut().push(credential_id.to_string());
        if self.missing.iter().any(|m| m == credential_id) {
            anyhow::bail!("Credential '{}' not found", credential_id);
        }
        CredentialScope::from_kubeconfig(
            credential_id,
            &format!("# kubeconfig for {credential_id}\n"),
        )
    }
}

/// Create `<root>/clusters/<name>/` with the given files.
pub fn write_cluster(root: &Path, name: &str, values: Option<&str>, env: Option<&str>) -> PathBuf {
    let dir = root.join("clusters").join(name);
    std::fs::create_dir_all(&dir).expect("Failed to create cluster dir");
    if let Some(values) = values {
        std::fs::write(dir.join("values.yaml"), values).expect("Failed to write values.yaml");
    }
    if let Some(env) = env {
        std::fs::write(dir.join("env"), env).expect("Failed to write env");
    }
    dir
}
