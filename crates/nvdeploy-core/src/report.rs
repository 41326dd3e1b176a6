//! Run results, renderable as JSON.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::deploy::DeployOutcome;
use crate::error::DeployError;

/// Result of one cluster within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClusterStatus {
    Deployed,
    DryRun,
    Failed { kind: String, error: String },
    /// Not attempted because an earlier cluster failed in fail-fast mode
    Skipped,
}

impl ClusterStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ClusterStatus::Deployed => "deployed",
            ClusterStatus::DryRun => "dry-run",
            ClusterStatus::Failed { .. } => "failed",
            ClusterStatus::Skipped => "skipped",
        }
    }
}

impl From<Result<DeployOutcome, DeployError>> for ClusterStatus {
    fn from(result: Result<DeployOutcome, DeployError>) -> Self {
        match result {
            Ok(DeployOutcome::Deployed) => ClusterStatus::Deployed,
            Ok(DeployOutcome::DryRun) => ClusterStatus::DryRun,
            Err(err) => ClusterStatus::Failed {
                kind: err.kind().to_string(),
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterReport {
    pub cluster: String,
    #[serde(flatten)]
    pub status: ClusterStatus,
}

/// Outcome of a full run over all detected clusters.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub clusters: Vec<ClusterReport>,
}

impl RunReport {
    /// True when nothing changed and nothing was deployed.
    pub fn is_noop(&self) -> bool {
        self.clusters.is_empty()
    }

    /// True when no cluster failed. Skipped clusters only occur after a failure.
    pub fn is_success(&self) -> bool {
        !self
            .clusters
            .iter()
            .any(|c| matches!(c.status, ClusterStatus::Failed { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &ClusterReport> {
        self.clusters
            .iter()
            .filter(|c| matches!(c.status, ClusterStatus::Failed { .. }))
    }

    pub fn count(&self, label: &str) -> usize {
        self.clusters
            .iter()
            .filter(|c| c.status.label() == label)
            .count()
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
