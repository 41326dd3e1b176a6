//! Per-cluster deployment: file checks, request resolution, and the
//! connectivity / install / readiness sequence.

pub mod deployer;
pub mod layout;
pub mod request;

pub use deployer::{ClusterDeployer, DeployOutcome, plan_cluster};
pub use layout::{ClusterLayout, ENV_FILE, VALUES_FILE};
pub use request::DeploymentRequest;
