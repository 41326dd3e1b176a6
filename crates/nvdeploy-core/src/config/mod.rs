//! Configuration inputs for a deployment run
//!
//! Two sources feed the deployer:
//! - `env_file`: per-cluster `KEY=VALUE` settings
//! - `defaults`: repository-wide defaults, optionally overridden by `nvdeploy.toml`

pub mod defaults;
pub mod env_file;

pub use defaults::{
    CONFIG_FILE_NAME, DeployDefaults, LATEST_CHART_VERSION, parse_defaults_str,
    parse_defaults_toml,
};
pub use env_file::{ClusterConfig, load_env_file};
