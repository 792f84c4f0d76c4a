//! Sentinel CLI: the main entry point.
//!
//! Commands:
//! - `init`       : Write a default config file
//! - `agent`      : Interactive REPL or single-message mode
//! - `gateway`    : Start the HTTP façade
//! - `calibrate`  : Select few-shot demonstrations for the decision policy
//! - `diagnose`   : Run the decision policy on one container's logs
//! - `containers` : List running workloads
//! - `status`     : Show configuration and policy state

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "sentinel",
    about = "Sentinel: autonomous SRE assistant for container workloads",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Use the built-in demo workloads instead of Docker
    #[arg(long = "static", global = true)]
    static_runtime: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Talk to the SRE agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Start the HTTP gateway
    Gateway {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Bootstrap few-shot demonstrations for the decision policy
    Calibrate {
        /// JSON file of labeled examples (defaults to the built-in set)
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        /// Maximum demonstrations to keep
        #[arg(long)]
        max_demos: Option<usize>,
    },

    /// Ask the decision policy about one container
    Diagnose {
        /// Container name
        container: String,

        /// Number of log lines to fetch
        #[arg(short, long)]
        tail: Option<usize>,

        /// Read logs from a file instead of the runtime
        #[arg(long)]
        logs_file: Option<PathBuf>,
    },

    /// List running containers
    Containers,

    /// Show configuration and policy state
    Status,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    if let Commands::Init { force } = cli.command {
        return commands::init::run(force).await;
    }

    let config = commands::load_config(cli.static_runtime)?;
    match cli.command {
        Commands::Init { .. } => {}
        Commands::Agent { message } => commands::agent::run(config, message).await?,
        Commands::Gateway { port } => commands::gateway::run(config, port).await?,
        Commands::Calibrate { dataset, max_demos } => {
            commands::calibrate::run(config, dataset, max_demos).await?
        }
        Commands::Diagnose {
            container,
            tail,
            logs_file,
        } => commands::diagnose::run(config, container, tail, logs_file).await?,
        Commands::Containers => commands::containers::run(config).await?,
        Commands::Status => commands::status::run(config).await?,
    }

    Ok(())
}
