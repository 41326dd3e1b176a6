//! Drive a full run: detect changed clusters, then deploy them in order.

use chrono::Utc;

use crate::changes::ChangeDetector;
use crate::deploy::ClusterDeployer;
use crate::error::DeployError;
use crate::report::{ClusterReport, ClusterStatus, RunReport};

/// Run-level behavior switches.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Stop after the first failed cluster; remaining ones are reported as skipped
    pub fail_fast: bool,
    /// Verify `helm`/`kubectl` before the first deployment
    pub check_prerequisites: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            check_prerequisites: true,
        }
    }
}

impl RunOptions {
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_prerequisite_check(mut self, check: bool) -> Self {
        self.check_prerequisites = check;
        self
    }
}

/// One pass over a change set.
pub struct DeployRun<'a> {
    detector: ChangeDetector,
    deployer: ClusterDeployer<'a>,
    options: RunOptions,
}

impl<'a> DeployRun<'a> {
    pub fn new(
        detector: ChangeDetector,
        deployer: ClusterDeployer<'a>,
        options: RunOptions,
    ) -> Self {
        Self {
            detector,
            deployer,
            options,
        }
    }

    /// Deploy every cluster touched by `paths`.
    ///
    /// Only a prerequisite failure is returned as `Err`; per-cluster
    /// failures are recorded in the report.
    pub fn execute<I, S>(&self, paths: I) -> Result<RunReport, DeployError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let started_at = Utc::now();
        let clusters = self.detector.detect(paths);

        if clusters.is_empty() {
            tracing::info!("No cluster configuration changes detected; nothing to deploy");
            return Ok(RunReport {
                started_at,
                finished_at: Utc::now(),
                clusters: Vec::new(),
            });
        }

        tracing::info!(count = clusters.len(), clusters = ?clusters, "Detected changed clusters");

        if self.options.check_prerequisites {
            self.deployer.tools().check_prerequisites()?;
        }

        let mut reports = Vec::with_capacity(clusters.len());
        let mut halted = false;
        for cluster in clusters {
            if halted {
                tracing::warn!(cluster = %cluster, "Skipping cluster after earlier failure");
                reports.push(ClusterReport {
                    cluster,
                    status: ClusterStatus::Skipped,
                });
                continue;
            }

            let result = self.deployer.deploy(&cluster);
            if let Err(err) = &result {
                tracing::error!(cluster = %cluster, kind = err.kind(), "{err}");
                halted = self.options.fail_fast;
            }
            reports.push(ClusterReport {
                cluster,
                status: ClusterStatus::from(result),
            });
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            clusters: reports,
        })
    }
}
