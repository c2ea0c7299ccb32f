//! Loftsman CLI - managed releases of Helm chart workloads to Kubernetes

use clap::{Parser, Subcommand};
use loftsman_kube::{DEFAULT_RECORDS_NAMESPACE, HEADER_TARGET};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;
mod settings;

use commands::GlobalSettings;
use error::Result;
use settings::ChartsSource;

#[derive(Parser)]
#[command(name = "loftsman")]
#[command(version)]
#[command(about = "Managed releases of Helm chart workloads to Kubernetes clusters", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the Kubernetes config file to use (default is the system default)
    #[arg(long, global = true, env = "LOFTSMAN_KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// The name of the Kubernetes config context to use (default is the current-context)
    #[arg(long, global = true, env = "LOFTSMAN_KUBE_CONTEXT")]
    kube_context: Option<String>,

    /// The Helm binary to use; it must be a Helm v3 client
    #[arg(long, global = true, env = "LOFTSMAN_HELM_BINARY", default_value = "helm")]
    helm_binary: String,

    /// The namespace where loftsman ship records are stored
    #[arg(long, global = true, env = "LOFTSMAN_NAMESPACE", default_value = DEFAULT_RECORDS_NAMESPACE)]
    loftsman_namespace: String,

    /// File that JSON/machine-readable logs are written to, in addition to the console
    #[arg(long, global = true, env = "LOFTSMAN_JSON_LOG_PATH")]
    json_log_path: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true, env = "LOFTSMAN_DEBUG")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Operations related to creating and maintaining Loftsman manifests
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },

    /// Ship out your Helm chart workloads to run in your Kubernetes cluster
    Ship {
        /// Local path to the Loftsman manifest file
        #[arg(long, env = "LOFTSMAN_MANIFEST_PATH")]
        manifest_path: PathBuf,

        /// Root URL of a chart repository for charts that name no source (required if not using --charts-path)
        #[arg(long, env = "LOFTSMAN_CHARTS_REPO")]
        charts_repo: Option<String>,

        /// Local directory of packaged charts, e.g. my-chart-0.1.0.tgz (required if not using --charts-repo)
        #[arg(long, env = "LOFTSMAN_CHARTS_PATH")]
        charts_path: Option<PathBuf>,

        /// Username for --charts-repo, if applicable
        #[arg(long, env = "LOFTSMAN_CHARTS_REPO_USERNAME")]
        charts_repo_username: Option<String>,

        /// Password for --charts-repo, if applicable
        #[arg(long, env = "LOFTSMAN_CHARTS_REPO_PASSWORD", hide_env_values = true)]
        charts_repo_password: Option<String>,
    },

    /// Halt or clear an existing ship that's stuck
    Avast {
        /// Local path to the manifest whose ship to halt (required if not using --manifest-name)
        #[arg(long, env = "LOFTSMAN_MANIFEST_PATH")]
        manifest_path: Option<PathBuf>,

        /// Name of the manifest whose ship to halt (required if not using --manifest-path)
        #[arg(long)]
        manifest_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ManifestCommands {
    /// Create a new manifest source file, written to stdout
    Create {
        /// A comma-delimited list of charts to initialize in the manifest
        #[arg(long, value_delimiter = ',')]
        chart_names: Vec<String>,
    },

    /// Validate manifest files against their schema
    Validate {
        /// Manifest file(s)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

/// Console logs on stderr, plus JSON logs when a file is given
fn init_tracing(debug: bool, json_log_path: Option<&Path>) -> std::io::Result<()> {
    let default_filter = if debug {
        "info,loftsman=debug,loftsman_core=debug,loftsman_helm=debug,loftsman_kube=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Headers are already printed as styled banners
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter_fn(|meta| meta.target() != HEADER_TARGET));

    let json = match json_log_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(json)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let global = GlobalSettings {
        kubeconfig: cli.kubeconfig,
        kube_context: cli.kube_context,
        helm_binary: cli.helm_binary,
        namespace: cli.loftsman_namespace,
    };

    match cli.command {
        Commands::Manifest { command } => match command {
            ManifestCommands::Create { chart_names } => commands::manifest::create(&chart_names),
            ManifestCommands::Validate { paths } => commands::manifest::validate(&paths),
        },

        Commands::Ship {
            manifest_path,
            charts_repo,
            charts_path,
            charts_repo_username,
            charts_repo_password,
        } => {
            let source = ChartsSource {
                repo: charts_repo,
                path: charts_path,
                repo_username: charts_repo_username,
                repo_password: charts_repo_password,
            };
            commands::ship::run(&global, &manifest_path, &source).await
        }

        Commands::Avast {
            manifest_path,
            manifest_name,
        } => {
            commands::avast::run(&global, manifest_path.as_deref(), manifest_name.as_deref()).await
        }
    }
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.debug, cli.json_log_path.as_deref()) {
        eprintln!("Error: could not open the JSON log file: {}", e);
        std::process::exit(exit_codes::IO_ERROR);
    }

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            let code = e.exit_code();
            tracing::debug!(exit_code = code, "command failed");
            eprintln!("{:?}", miette::Report::new(e));
            code
        }
    };
    std::process::exit(code);
}
