//! Deployment defaults and their TOML overrides.
//!
//! Everything the deployer would otherwise hardcode lives here so that a
//! repository can override it with an `nvdeploy.toml`:
//!
//! ```toml
//! namespace = "security"
//! readiness_timeout_secs = 600
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::changes::normalize_clusters_dir;

/// File name looked up at the repository root when no config is given.
pub const CONFIG_FILE_NAME: &str = "nvdeploy.toml";

/// Chart version that means "do not pin a version".
pub const LATEST_CHART_VERSION: &str = "latest";

/// Defaults applied to every cluster deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployDefaults {
    /// Directory (relative to the repository root) holding one folder per cluster
    pub clusters_dir: String,
    pub namespace: String,
    pub release_name: String,
    /// Chart version used when the env file has none; `latest` omits the pin
    pub chart_version: String,
    /// Chart reference passed to `helm upgrade --install`
    pub chart: String,
    pub repo_name: String,
    pub repo_url: String,
    /// Appended to the cluster name to form the default credential id
    pub credential_suffix: String,
    pub connect_timeout_secs: u64,
    pub install_timeout_secs: u64,
    pub readiness_timeout_secs: u64,
    /// Pod label selectors that must become ready after a real install
    pub readiness_selectors: Vec<String>,
}

impl Default for DeployDefaults {
    fn default() -> Self {
        Self {
            clusters_dir: "clusters".to_string(),
            namespace: "neuvector".to_string(),
            release_name: "neuvector".to_string(),
            chart_version: LATEST_CHART_VERSION.to_string(),
            chart: "neuvector/core".to_string(),
            repo_name: "neuvector".to_string(),
            repo_url: "https://neuvector.github.io/neuvector-helm/".to_string(),
            credential_suffix: "-kubeconfig".to_string(),
            connect_timeout_secs: 5,
            install_timeout_secs: 600,
            readiness_timeout_secs: 300,
            readiness_selectors: vec![
                "app=neuvector-controller-pod".to_string(),
                "app=neuvector-manager-pod".to_string(),
            ],
        }
    }
}

impl DeployDefaults {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    /// Load defaults from `path`, or from `<repo_root>/nvdeploy.toml` when
    /// `path` is `None`. A missing implicit file yields the built-in defaults.
    pub fn load(path: Option<&Path>, repo_root: &Path) -> Result<Self> {
        match path {
            Some(path) => parse_defaults_toml(path),
            None => {
                let implicit = repo_root.join(CONFIG_FILE_NAME);
                if implicit.exists() {
                    parse_defaults_toml(&implicit)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if normalize_clusters_dir(&self.clusters_dir).is_empty() {
            anyhow::bail!("clusters_dir must not be empty");
        }
        if Path::new(&self.clusters_dir).has_root() {
            anyhow::bail!(
                "clusters_dir must be relative to the repository root: {}",
                self.clusters_dir
            );
        }
        if self.clusters_dir.contains("..") {
            anyhow::bail!("clusters_dir must not contain '..': {}", self.clusters_dir);
        }
        if self.namespace.trim().is_empty() || self.release_name.trim().is_empty() {
            anyhow::bail!("namespace and release_name must not be empty");
        }
        if self.chart.trim().is_empty() {
            anyhow::bail!("chart must not be empty");
        }
        for (field, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("install_timeout_secs", self.install_timeout_secs),
            ("readiness_timeout_secs", self.readiness_timeout_secs),
        ] {
            if secs == 0 {
                anyhow::bail!("{field} must be greater than zero");
            }
        }
        Ok(())
    }
}

/// Parse an `nvdeploy.toml` file with detailed error messages
pub fn parse_defaults_toml(path: &Path) -> Result<DeployDefaults> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_defaults_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse `nvdeploy.toml` content from string
pub fn parse_defaults_str(content: &str) -> Result<DeployDefaults> {
    let defaults: DeployDefaults =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;
    defaults.validate()?;
    Ok(defaults)
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    match error.span() {
        Some(span) => {
            let line_num = content[..span.start.min(content.len())].matches('\n').count() + 1;
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line_num,
                get_line_context(content, line_num),
                message
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 1).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
