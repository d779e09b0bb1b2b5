use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "tessera",
    about = "Tessera — membership administration for a compute/storage-separated cluster",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Cluster definition file.
    #[arg(short, long, global = true, default_value = "cluster.toml")]
    config: PathBuf,
    /// Query port of the coordinator to talk to. Skips discovery of the
    /// initial port; the master is still followed among the coordinators
    /// listed in the cluster file.
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show coordinator and worker membership as the master reports it.
    Status {
        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: commands::status::OutputFormat,
    },
    /// Register a coordinator as a follower.
    AddFe {
        /// Coordinator edit-log endpoint, e.g. 172.20.80.2:9010
        endpoint: String,
    },
    /// Remove a coordinator. Already-removed coordinators are a no-op.
    DropFe { endpoint: String },
    /// Register a worker.
    AddBe {
        /// Worker heartbeat endpoint, e.g. 172.20.81.1:9050
        endpoint: String,
    },
    /// Force-remove a worker without migrating its tablets.
    DropBe { endpoint: String },
    /// Drain a worker's tablets and wait until the cluster drops it.
    ///
    /// Ctrl-C stops waiting; the worker stays marked as decommissioned.
    DecommissionBe { endpoint: String },
    /// Create the S3 storage vault from [cloud_store] and make it the default.
    CreateVault,
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,tessera=info"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let session = commands::Session::load(&cli.config, cli.port)?;

    match cli.command {
        Commands::Status { format } => commands::status::show(&session, format).await,
        Commands::AddFe { endpoint } => commands::membership::add_fe(&session, &endpoint).await,
        Commands::DropFe { endpoint } => commands::membership::drop_fe(&session, &endpoint).await,
        Commands::AddBe { endpoint } => commands::membership::add_be(&session, &endpoint).await,
        Commands::DropBe { endpoint } => commands::membership::drop_be(&session, &endpoint).await,
        Commands::DecommissionBe { endpoint } => {
            commands::decommission::run(&session, &endpoint).await
        }
        Commands::CreateVault => commands::membership::create_vault(&session).await,
    }
}
