//! nvdeploy - change-driven NeuVector deployments
//!
//! Usage:
//!   nvdeploy run              # Deploy clusters changed by the last commit
//!   nvdeploy detect           # List clusters changed by the last commit
//!   nvdeploy plan <cluster>   # Show the resolved deployment for one cluster
//!   nvdeploy check            # Verify helm and kubectl are installed

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nvdeploy_core::changes::{ChangeDetector, ChangeRange, changed_paths};
use nvdeploy_core::config::DeployDefaults;
use nvdeploy_core::credentials::{CREDENTIALS_DIR_ENV, DirCredentialStore};
use nvdeploy_core::deploy::{ClusterDeployer, DeploymentRequest, plan_cluster};
use nvdeploy_core::report::{ClusterStatus, RunReport};
use nvdeploy_core::run::{DeployRun, RunOptions};
use nvdeploy_core::tools::{ClusterTools, CommandTools};

#[derive(Parser)]
#[command(name = "nvdeploy")]
#[command(about = "Deploy NeuVector to clusters whose configuration changed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect changed clusters and deploy each of them
    Run(RunArgs),

    /// Print the clusters affected by a change set
    Detect {
        #[command(flatten)]
        repo: RepoArgs,

        #[command(flatten)]
        changes: ChangeArgs,
    },

    /// Validate a cluster directory and show the resolved deployment
    Plan {
        /// Cluster directory name under the clusters directory
        cluster: String,

        #[command(flatten)]
        repo: RepoArgs,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Verify helm and kubectl are installed
    Check {
        #[command(flatten)]
        binaries: BinaryArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    repo: RepoArgs,

    #[command(flatten)]
    changes: ChangeArgs,

    #[command(flatten)]
    binaries: BinaryArgs,

    /// Directory holding kubeconfig files named by credential id
    #[arg(long, env = CREDENTIALS_DIR_ENV)]
    credentials_dir: Option<PathBuf>,

    /// Stop after the first failed cluster
    #[arg(long)]
    fail_fast: bool,

    /// Do not verify helm/kubectl before deploying
    #[arg(long)]
    skip_prereq_check: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct RepoArgs {
    /// Repository root containing the clusters directory
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Defaults file (falls back to <repo>/nvdeploy.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ChangeArgs {
    /// Base revision (defaults to the first parent of --head)
    #[arg(long)]
    base: Option<String>,

    /// Head revision
    #[arg(long, default_value = "HEAD")]
    head: String,

    /// Use these changed paths instead of reading git history
    #[arg(long = "path", value_name = "PATH")]
    paths: Vec<String>,
}

#[derive(Args)]
struct BinaryArgs {
    /// helm binary
    #[arg(long, default_value = "helm", env = "NVDEPLOY_HELM")]
    helm: String,

    /// kubectl binary
    #[arg(long, default_value = "kubectl", env = "NVDEPLOY_KUBECTL")]
    kubectl: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nvdeploy=info,nvdeploy_core=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_deploy(args)?,
        Commands::Detect { repo, changes } => run_detect(repo, changes)?,
        Commands::Plan {
            cluster,
            repo,
            format,
        } => run_plan(&cluster, repo, format)?,
        Commands::Check { binaries } => run_check(binaries)?,
    }

    Ok(())
}

fn run_deploy(args: RunArgs) -> Result<()> {
    let defaults = load_defaults(&args.repo)?;
    let paths = collect_changes(&args.repo.repo, &args.changes)?;

    let tools = CommandTools::with_binaries(args.binaries.helm, args.binaries.kubectl);
    let credentials = match args.credentials_dir {
        Some(dir) => DirCredentialStore::new(dir),
        None => DirCredentialStore::from_env()?,
    };
    tracing::debug!(credentials_dir = %credentials.root().display(), "Using credential store");

    let deployer = ClusterDeployer::new(args.repo.repo.clone(), &defaults, &tools, &credentials);
    let options = RunOptions::default()
        .with_fail_fast(args.fail_fast)
        .with_prerequisite_check(!args.skip_prereq_check);
    let run = DeployRun::new(
        ChangeDetector::new(defaults.clusters_dir.clone()),
        deployer,
        options,
    );

    let report = run.execute(&paths)?;

    match args.format {
        OutputFormat::Table => print_report_table(&report),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_detect(repo: RepoArgs, changes: ChangeArgs) -> Result<()> {
    let defaults = load_defaults(&repo)?;
    let paths = collect_changes(&repo.repo, &changes)?;

    for cluster in ChangeDetector::new(defaults.clusters_dir).detect(&paths) {
        println!("{cluster}");
    }
    Ok(())
}

fn run_plan(cluster: &str, repo: RepoArgs, format: OutputFormat) -> Result<()> {
    let defaults = load_defaults(&repo)?;
    let request = plan_cluster(&repo.repo, &defaults, cluster)?;
    match format {
        OutputFormat::Table => print_plan(&request, &defaults),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&request)?),
    }
    Ok(())
}

fn run_check(binaries: BinaryArgs) -> Result<()> {
    let tools = CommandTools::with_binaries(binaries.helm, binaries.kubectl);
    let versions = tools.check_prerequisites()?;
    println!("helm     {}", versions.helm);
    println!("kubectl  {}", versions.kubectl);
    println!("{}", style("All prerequisites satisfied").green());
    Ok(())
}

// =============================================================================
// Input helpers
// =============================================================================

fn load_defaults(repo: &RepoArgs) -> Result<DeployDefaults> {
    DeployDefaults::load(repo.config.as_deref(), &repo.repo)
}

fn collect_changes(repo_root: &Path, changes: &ChangeArgs) -> Result<Vec<String>> {
    if !changes.paths.is_empty() {
        return Ok(changes.paths.clone());
    }
    let range = ChangeRange::new(changes.base.clone(), changes.head.clone());
    changed_paths(repo_root, &range)
        .with_context(|| format!("Failed to read changes from {}", repo_root.display()))
}

// =============================================================================
// Output
// =============================================================================

fn print_report_table(report: &RunReport) {
    if report.is_noop() {
        println!("No cluster configuration changes detected. Nothing to deploy.");
        return;
    }

    println!("Clusters ({}):", report.clusters.len());
    println!("  {:<30} Status", "Cluster");
    println!("  {}", "-".repeat(50));
    for entry in &report.clusters {
        println!(
            "  {:<30} {}",
            truncate(&entry.cluster, 30),
            status_symbol(&entry.status)
        );
    }

    let failures: Vec<_> = report.failed().collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for entry in failures {
            if let ClusterStatus::Failed { error, .. } = &entry.status {
                println!("  {}", style(error).red());
            }
        }
    }

    println!();
    let elapsed = report.finished_at - report.started_at;
    println!(
        "Summary: {} deployed, {} dry-run, {} failed, {} skipped ({}s)",
        report.count("deployed"),
        report.count("dry-run"),
        report.count("failed"),
        report.count("skipped"),
        elapsed.num_seconds()
    );
}

fn print_plan(request: &DeploymentRequest, defaults: &DeployDefaults) {
    println!("Cluster:     {}", style(&request.cluster).bold());
    println!("Credential:  {}", request.credential);
    println!("Namespace:   {}", request.namespace);
    println!("Release:     {}", request.release_name);
    println!("Chart:       {}", defaults.chart);
    println!(
        "Version:     {}",
        request.pinned_version().unwrap_or("(latest, unpinned)")
    );
    println!("Values:      {}", request.values_file.display());
    println!(
        "Dry run:     {}",
        if request.dry_run { "yes" } else { "no" }
    );
    if !request.dry_run {
        println!("Readiness:   {}", defaults.readiness_selectors.join(", "));
    }
}

fn status_symbol(status: &ClusterStatus) -> String {
    match status {
        ClusterStatus::Deployed => style("[Deployed]").green().to_string(),
        ClusterStatus::DryRun => style("[Dry Run]").cyan().to_string(),
        ClusterStatus::Failed { kind, .. } => style(format!("[Failed: {kind}]")).red().to_string(),
        ClusterStatus::Skipped => style("[Skipped]").yellow().to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}
