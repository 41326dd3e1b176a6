//! nvdeploy Core Library
//!
//! Detects which cluster directories changed in a revision and rolls the
//! NeuVector Helm release out to each of them through `helm` and `kubectl`.

pub mod changes;
pub mod config;
pub mod credentials;
pub mod deploy;
pub mod error;
pub mod report;
pub mod run;
pub mod tools;

/// Re-exports of commonly used types
pub mod prelude {
    // Change detection
    pub use crate::changes::{ChangeDetector, ChangeRange, changed_paths};

    // Configuration
    pub use crate::config::{ClusterConfig, DeployDefaults};

    // Deployment
    pub use crate::credentials::{CredentialScope, CredentialStore, DirCredentialStore};
    pub use crate::deploy::{ClusterDeployer, DeployOutcome, DeploymentRequest};
    pub use crate::error::DeployError;
    pub use crate::tools::{ClusterTools, CommandTools};

    // Runs
    pub use crate::report::{ClusterReport, ClusterStatus, RunReport};
    pub use crate::run::{DeployRun, RunOptions};
}
