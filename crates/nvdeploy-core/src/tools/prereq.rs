//! Check that `helm` and `kubectl` are installed before touching any cluster.

use std::process::Command;

use anyhow::Context;
use semver::Version;
use serde::Deserialize;

use crate::error::DeployError;

/// Oldest helm release with `upgrade --install --create-namespace` semantics we rely on.
const MIN_HELM_VERSION: Version = Version::new(3, 2, 0);

/// Versions reported by the installed tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    pub helm: Version,
    pub kubectl: Version,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KubectlVersionOutput {
    client_version: KubectlClientVersion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KubectlClientVersion {
    git_version: String,
}

/// Verify both tools are present and recent enough.
pub fn ensure_prerequisites(helm: &str, kubectl: &str) -> Result<ToolVersions, DeployError> {
    let helm_version = tool_output(helm, &["version", "--short"])
        .and_then(|out| parse_helm_version(&out))
        .map_err(|err| prerequisite(helm, &err))?;

    if helm_version < MIN_HELM_VERSION {
        return Err(DeployError::Prerequisite {
            tool: helm.to_string(),
            reason: format!("helm {MIN_HELM_VERSION}+ is required, found {helm_version}"),
        });
    }

    let kubectl_version = tool_output(kubectl, &["version", "--client", "-o", "json"])
        .and_then(|out| parse_kubectl_version(&out))
        .map_err(|err| prerequisite(kubectl, &err))?;

    tracing::info!(
        helm = %helm_version,
        kubectl = %kubectl_version,
        "Prerequisites satisfied"
    );
    Ok(ToolVersions {
        helm: helm_version,
        kubectl: kubectl_version,
    })
}

fn prerequisite(tool: &str, err: &anyhow::Error) -> DeployError {
    DeployError::Prerequisite {
        tool: tool.to_string(),
        reason: crate::error::detail(err),
    }
}

fn tool_output(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to invoke {} {}", program, args.join(" ")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("{} {} failed: {}", program, args.join(" "), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `helm version --short` output, e.g. `v3.14.2+gc309b6f`.
pub fn parse_helm_version(output: &str) -> anyhow::Result<Version> {
    let token = output
        .split_whitespace()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty helm version output"))?;
    parse_tool_version(token)
}

/// Parse `kubectl version --client -o json` output.
pub fn parse_kubectl_version(output: &str) -> anyhow::Result<Version> {
    let parsed: KubectlVersionOutput =
        serde_json::from_str(output).context("Unexpected kubectl version output")?;
    parse_tool_version(&parsed.client_version.git_version)
}

fn parse_tool_version(raw: &str) -> anyhow::Result<Version> {
    let trimmed = raw.trim().trim_start_matches('v');
    Version::parse(trimmed).with_context(|| format!("Invalid version: {}", raw))
}
