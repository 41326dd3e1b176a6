//! `ClusterTools` backed by the `helm` and `kubectl` binaries.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::Context;

use super::{ClusterTools, ReleaseSpec, RepositorySpec, ToolVersions, WaitSpec, prereq};
use crate::credentials::CredentialScope;
use crate::error::DeployError;

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl CommandSpec {
    fn new(program: &str, kubeconfig: &Path) -> Self {
        let mut env = HashMap::new();
        env.insert(
            "KUBECONFIG".to_string(),
            kubeconfig.to_string_lossy().to_string(),
        );
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Render for logs and error messages.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run to completion, returning stdout. A non-zero exit is an error carrying stderr.
    pub fn run(&self) -> anyhow::Result<String> {
        tracing::debug!(command = %self.display(), "Running external command");

        let output = Command::new(&self.program)
            .args(&self.args)
            .envs(&self.env)
            .output()
            .with_context(|| format!("Failed to invoke {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            anyhow::bail!(
                "`{}` exited with status {}: {}",
                self.display(),
                code,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Runs `helm` and `kubectl` as child processes.
#[derive(Debug, Clone)]
pub struct CommandTools {
    helm: String,
    kubectl: String,
}

impl Default for CommandTools {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTools {
    pub fn new() -> Self {
        Self::with_binaries("helm", "kubectl")
    }

    /// Use explicit binary names or paths.
    pub fn with_binaries(helm: impl Into<String>, kubectl: impl Into<String>) -> Self {
        Self {
            helm: helm.into(),
            kubectl: kubectl.into(),
        }
    }

    pub fn connectivity_command(&self, kubeconfig: &Path, timeout: Duration) -> CommandSpec {
        CommandSpec::new(&self.kubectl, kubeconfig)
            .arg("cluster-info")
            .arg(format!("--request-timeout={}", go_duration(timeout)))
    }

    pub fn repo_add_command(&self, kubeconfig: &Path, repo: &RepositorySpec) -> CommandSpec {
        CommandSpec::new(&self.helm, kubeconfig).args([
            "repo",
            "add",
            repo.name.as_str(),
            repo.url.as_str(),
            "--force-update",
        ])
    }

    /// Refresh every configured repository index; helm before 3.7 takes no name here.
    pub fn repo_update_command(&self, kubeconfig: &Path) -> CommandSpec {
        CommandSpec::new(&self.helm, kubeconfig).args(["repo", "update"])
    }

    pub fn upgrade_install_command(&self, kubeconfig: &Path, release: &ReleaseSpec) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.helm, kubeconfig)
            .args([
                "upgrade",
                "--install",
                release.release_name.as_str(),
                release.chart.as_str(),
            ])
            .arg("--namespace")
            .arg(release.namespace.as_str())
            .arg("--create-namespace")
            .arg("--values")
            .arg(release.values_file.to_string_lossy());

        if let Some(version) = &release.version {
            spec = spec.arg("--version").arg(version.as_str());
        }
        if release.dry_run {
            spec = spec.arg("--dry-run");
        }

        spec.arg("--wait")
            .arg("--timeout")
            .arg(go_duration(release.timeout))
    }

    pub fn wait_command(&self, kubeconfig: &Path, wait: &WaitSpec) -> CommandSpec {
        CommandSpec::new(&self.kubectl, kubeconfig).args([
            "wait".to_string(),
            "--for=condition=ready".to_string(),
            "pod".to_string(),
            "-l".to_string(),
            wait.selector.clone(),
            "-n".to_string(),
            wait.namespace.clone(),
            format!("--timeout={}", go_duration(wait.timeout)),
        ])
    }
}

impl ClusterTools for CommandTools {
    fn check_prerequisites(&self) -> Result<ToolVersions, DeployError> {
        prereq::ensure_prerequisites(&self.helm, &self.kubectl)
    }

    fn check_connectivity(
        &self,
        creds: &CredentialScope,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        self.connectivity_command(creds.kubeconfig_path(), timeout)
            .run()
            .map(|_| ())
    }

    fn sync_repository(
        &self,
        creds: &CredentialScope,
        repo: &RepositorySpec,
    ) -> anyhow::Result<()> {
        self.repo_add_command(creds.kubeconfig_path(), repo).run()?;
        self.repo_update_command(creds.kubeconfig_path())
            .run()
            .map(|_| ())
    }

    fn upgrade_install(
        &self,
        creds: &CredentialScope,
        release: &ReleaseSpec,
    ) -> anyhow::Result<()> {
        let stdout = self
            .upgrade_install_command(creds.kubeconfig_path(), release)
            .run()?;
        for line in stdout.lines().filter(|l| !l.trim().is_empty()).take(20) {
            tracing::debug!(target: "nvdeploy::helm", "{line}");
        }
        Ok(())
    }

    fn wait_ready(&self, creds: &CredentialScope, wait: &WaitSpec) -> anyhow::Result<()> {
        self.wait_command(creds.kubeconfig_path(), wait)
            .run()
            .map(|_| ())
    }
}

/// Format as a Go duration string (`300s`), the unit both tools accept.
fn go_duration(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn release(version: Option<&str>, dry_run: bool) -> ReleaseSpec {
        ReleaseSpec {
            release_name: "neuvector".to_string(),
            chart: "neuvector/core".to_string(),
            version: version.map(str::to_string),
            namespace: "neuvector".to_string(),
            values_file: PathBuf::from("clusters/a/values.yaml"),
            dry_run,
            timeout: Duration::from_secs(600),
        }
    }

    #[test]
    fn test_upgrade_install_without_version() {
        let tools = CommandTools::new();
        let spec = tools.upgrade_install_command(Path::new("/tmp/kc"), &release(None, false));

        assert_eq!(spec.program, "helm");
        assert_eq!(
            spec.args,
            vec![
                "upgrade",
                "--install",
                "neuvector",
                "neuvector/core",
                "--namespace",
                "neuvector",
                "--create-namespace",
                "--values",
                "clusters/a/values.yaml",
                "--wait",
                "--timeout",
                "600s",
            ]
        );
        assert_eq!(spec.env.get("KUBECONFIG"), Some(&"/tmp/kc".to_string()));
    }

    #[test]
    fn test_upgrade_install_with_version_and_dry_run() {
        let tools = CommandTools::new();
        let spec = tools.upgrade_install_command(Path::new("/tmp/kc"), &release(Some("5.3.0"), true));

        let version_pos = spec.args.iter().position(|a| a == "--version").unwrap();
        assert_eq!(spec.args[version_pos + 1], "5.3.0");
        assert!(spec.args.contains(&"--dry-run".to_string()));
    }

    #[test]
    fn test_connectivity_command_uses_request_timeout() {
        let tools = CommandTools::with_binaries("/opt/helm", "/opt/kubectl");
        let spec = tools.connectivity_command(Path::new("/tmp/kc"), Duration::from_secs(5));

        assert_eq!(spec.program, "/opt/kubectl");
        assert_eq!(spec.args, vec!["cluster-info", "--request-timeout=5s"]);
    }

    #[test]
    fn test_wait_command() {
        let tools = CommandTools::new();
        let wait = WaitSpec {
            selector: "app=neuvector-manager-pod".to_string(),
            namespace: "security".to_string(),
            timeout: Duration::from_secs(300),
        };
        let spec = tools.wait_command(Path::new("/tmp/kc"), &wait);

        assert_eq!(
            spec.display(),
            "kubectl wait --for=condition=ready pod -l app=neuvector-manager-pod -n security --timeout=300s"
        );
    }

    #[test]
    fn test_repo_commands() {
        let tools = CommandTools::new();
        let repo = RepositorySpec {
            name: "neuvector".to_string(),
            url: "https://neuvector.github.io/neuvector-helm/".to_string(),
        };

        let add = tools.repo_add_command(Path::new("/tmp/kc"), &repo);
        assert_eq!(
            add.display(),
            "helm repo add neuvector https://neuvector.github.io/neuvector-helm/ --force-update"
        );

        let update = tools.repo_update_command(Path::new("/tmp/kc"));
        assert_eq!(update.args, vec!["repo", "update"]);
    }

    #[test]
    fn test_run_missing_binary_errors() {
        let spec = CommandSpec::new("nvdeploy-definitely-missing-binary", Path::new("/tmp/kc"));
        let err = spec.run().unwrap_err().to_string();
        assert!(err.contains("Failed to invoke"));
    }
}
