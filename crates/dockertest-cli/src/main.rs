//! dockertest - bring test services up and down from the shell
//!
//! ## Commands
//!
//! - `compose up|down|run`: `docker compose -f <file> ...`
//! - `kube apply|delete|apply-file|delete-file|wait|check|status`: kubectl lifecycle

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dockertest_core::config::{ENV_DOCKER, ENV_KUBECTL, ENV_NAMESPACE, ENV_TIMEOUT};
use dockertest_core::{CommandResult, ComposeRunner, KubectlRunner, RunnerConfig, WaitTarget};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "dockertest")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "docker compose and kubectl lifecycle helpers for integration tests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and command results
    #[arg(long, global = true)]
    json: bool,

    /// Program to run in place of `docker`
    #[arg(long, global = true, env = ENV_DOCKER)]
    docker: Option<String>,

    /// Program to run in place of `kubectl`
    #[arg(long, global = true, env = ENV_KUBECTL)]
    kubectl: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive docker compose against a compose file
    Compose {
        #[command(subcommand)]
        action: ComposeAction,
    },

    /// Drive kubectl against manifests and namespaces
    Kube {
        #[command(subcommand)]
        action: KubeAction,
    },
}

#[derive(Subcommand)]
enum ComposeAction {
    /// Start services and wait until healthy (`up --wait`)
    Up {
        /// Compose file
        file: PathBuf,
    },
    /// Stop services and remove volumes (`down -v`)
    Down {
        /// Compose file
        file: PathBuf,
    },
    /// Run any compose subcommand, e.g. `compose run docker-compose.yml -- ps`
    Run {
        /// Compose file
        file: PathBuf,

        /// Arguments passed after `-f <file>`
        #[arg(last = true, required = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum KubeAction {
    /// Apply every manifest in a directory
    Apply {
        /// Directory holding .yml/.yaml/.json manifests
        dir: PathBuf,

        /// Wait for the applied resources (`--wait`)
        #[arg(long)]
        wait: bool,

        /// Timeout used with --wait; defaults to DOCKERTEST_TIMEOUT or 300s
        #[arg(long, requires = "wait")]
        timeout: Option<String>,
    },
    /// Delete every manifest in a directory
    Delete {
        /// Directory holding .yml/.yaml/.json manifests
        dir: PathBuf,
    },
    /// Apply a single manifest file
    ApplyFile {
        file: PathBuf,
    },
    /// Delete a single manifest file
    DeleteFile {
        file: PathBuf,
    },
    /// Wait for all deployments or pods in a namespace
    Wait {
        #[arg(value_enum)]
        target: WaitKind,

        #[arg(short, long, env = ENV_NAMESPACE)]
        namespace: Option<String>,

        #[arg(long, env = ENV_TIMEOUT)]
        timeout: Option<String>,
    },
    /// Check that kubectl runs and the cluster answers
    Check,
    /// Print `kubectl get all` for a namespace
    Status {
        #[arg(short, long, env = ENV_NAMESPACE)]
        namespace: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum WaitKind {
    Deployments,
    Pods,
}

impl From<WaitKind> for WaitTarget {
    fn from(kind: WaitKind) -> Self {
        match kind {
            WaitKind::Deployments => WaitTarget::Deployments,
            WaitKind::Pods => WaitTarget::Pods,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    dockertest_core::init_tracing(cli.json, level);

    let mut config = RunnerConfig::from_env();
    if let Some(docker) = cli.docker {
        config.docker_program = docker;
    }
    if let Some(kubectl) = cli.kubectl {
        config.kubectl_program = kubectl;
    }

    match cli.command {
        Commands::Compose { action } => {
            cmd_compose(&ComposeRunner::from_config(&config), action, cli.json)
        }
        Commands::Kube { action } => cmd_kube(&KubectlRunner::from_config(&config), action),
    }
}

fn cmd_compose(runner: &ComposeRunner, action: ComposeAction, json: bool) -> Result<()> {
    match action {
        ComposeAction::Up { file } => {
            runner
                .up(&file)
                .with_context(|| format!("docker compose up failed for {}", file.display()))?;
            info!(file = %file.display(), "Services are up");
        }
        ComposeAction::Down { file } => {
            runner
                .down(&file)
                .with_context(|| format!("docker compose down failed for {}", file.display()))?;
            info!(file = %file.display(), "Services are down");
        }
        ComposeAction::Run { file, args } => {
            let result = runner
                .run(&file, args)
                .with_context(|| format!("docker compose command failed for {}", file.display()))?;
            print_result(&result, json)?;
        }
    }
    Ok(())
}

fn cmd_kube(runner: &KubectlRunner, action: KubeAction) -> Result<()> {
    match action {
        KubeAction::Apply { dir, wait, timeout } => {
            if wait {
                let timeout = timeout.unwrap_or_else(|| runner.default_timeout().to_string());
                runner
                    .apply_directory_and_wait(&dir, &timeout)
                    .with_context(|| apply_context(&dir))?;
            } else {
                runner.apply_directory(&dir).with_context(|| apply_context(&dir))?;
            }
            info!(dir = %dir.display(), "Resources applied");
        }
        KubeAction::Delete { dir } => {
            runner
                .delete_directory(&dir)
                .with_context(|| format!("Failed to delete manifests in {}", dir.display()))?;
            info!(dir = %dir.display(), "Resources deleted");
        }
        KubeAction::ApplyFile { file } => {
            runner
                .apply_file(&file)
                .with_context(|| format!("Failed to apply {}", file.display()))?;
            info!(file = %file.display(), "Resource file applied");
        }
        KubeAction::DeleteFile { file } => {
            runner
                .delete_file(&file)
                .with_context(|| format!("Failed to delete {}", file.display()))?;
            info!(file = %file.display(), "Resource file deleted");
        }
        KubeAction::Wait {
            target,
            namespace,
            timeout,
        } => {
            let namespace = namespace.unwrap_or_else(|| runner.default_namespace().to_string());
            let timeout = timeout.unwrap_or_else(|| runner.default_timeout().to_string());
            runner
                .wait_for(target.into(), &namespace, &timeout)
                .with_context(|| format!("Resources in namespace {namespace} not ready"))?;
            info!(namespace = %namespace, "Resources ready");
        }
        KubeAction::Check => {
            runner.check_availability()?;
            info!("kubectl is available and cluster is accessible");
        }
        KubeAction::Status { namespace } => {
            let namespace = namespace.unwrap_or_else(|| runner.default_namespace().to_string());
            let status = runner
                .get_status(&namespace)
                .context("Failed to run kubectl get all")?;
            println!("{}", status);
        }
    }
    Ok(())
}

fn apply_context(dir: &Path) -> String {
    format!("Failed to apply manifests in {}", dir.display())
}

fn print_result(result: &CommandResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", result.output);
    }
    Ok(())
}
