//! orch-discovery: broadcaster-side orchestrator selection node
//!
//! Keeps a local cache of the orchestrator registry current and selects
//! responsive orchestrators from it (or from a static address list). Can
//! also answer probes itself when run as an orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use orch_discovery::config::Config;
use orch_discovery::discovery::{Discovery, OrchestratorSource, RegistrySync, SyncLoop};
use orch_discovery::net::{server, HttpProbeClient, OrchestratorInfo};
use orch_discovery::registry::{HttpRegistry, OrchestratorRegistry, StaticRegistry};
use orch_discovery::storage::RegistryStore;

#[derive(Parser)]
#[command(name = "orch-discovery")]
#[command(about = "Orchestrator discovery and selection for broadcaster nodes")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "orch-discovery.toml")]
    config: String,

    /// Data directory
    #[arg(short, long, env = "ORCH_DISCOVERY_DATA_DIR")]
    data_dir: Option<String>,

    /// Registry indexer URL (overrides config file)
    #[arg(long, env = "ORCH_DISCOVERY_REGISTRY_URL")]
    registry_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Select responsive orchestrators and print them
    Select {
        /// Number of orchestrators to select
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Static orchestrator address (repeatable); skips the registry
        #[arg(long = "orch-addr")]
        orch_addrs: Vec<String>,

        /// Read the registry directly instead of the local cache
        #[arg(long)]
        fresh: bool,
    },

    /// Sync the registry cache once
    Sync,

    /// Print the cached registry
    List,

    /// Answer probes as an orchestrator
    Serve,

    /// Keep the registry cache synced until interrupted (default)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orch_discovery=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = if std::path::Path::new(&cli.config).exists() {
        let content = std::fs::read_to_string(&cli.config)?;
        Config::from_toml(&content)?
    } else {
        info!("Config file {} not found, using defaults", cli.config);
        Config::default()
    };

    if let Some(data_dir) = cli.data_dir {
        config.node.data_dir = PathBuf::from(data_dir);
    }
    if let Some(url) = cli.registry_url {
        config.registry.url = Some(url);
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Serve => {
            let info = OrchestratorInfo {
                transcoder: config.server.transcoder.clone(),
                address: config.server.address.clone(),
                terms: None,
            };
            server::serve(config.server.listen, info).await?;
        }

        Command::List => {
            let store = RegistryStore::open(&config.node.data_dir)?;
            for record in store.select_all()? {
                println!("{}\t{}\t{}", record.address, record.service_uri, record.updated_at);
            }
        }

        Command::Sync => {
            let discovery = build_discovery(&config)?;
            let count = discovery.sync().await?;
            println!("Synced {} orchestrators", count);
        }

        Command::Select {
            count,
            orch_addrs,
            fresh,
        } => {
            let discovery = build_discovery(&config)?;
            let count = count.unwrap_or(config.discovery.select_count);

            let addrs = if orch_addrs.is_empty() {
                config.discovery.orch_addrs.clone()
            } else {
                orch_addrs
            };

            let source: Box<dyn OrchestratorSource> = if !addrs.is_empty() {
                Box::new(discovery.static_pool(&addrs))
            } else if fresh {
                Box::new(discovery.onchain_pool().await?)
            } else {
                Box::new(discovery.cached_pool().await?)
            };

            info!(candidates = source.size(), count, "Selecting orchestrators");
            let infos = source.get_orchestrators(count).await?;

            if infos.is_empty() {
                println!("No orchestrators available");
            } else {
                if infos.len() < count {
                    warn!(found = infos.len(), requested = count, "Fewer orchestrators than requested");
                }
                println!("{}", serde_json::to_string_pretty(&infos)?);
            }
        }

        Command::Run => {
            let discovery = build_discovery(&config)?;

            let Some(interval) = config.discovery.sync_interval() else {
                info!("Periodic sync disabled, syncing once");
                discovery.sync().await?;
                return Ok(());
            };

            let sync_loop = SyncLoop::start(discovery.registry_sync().clone(), interval);
            tokio::signal::ctrl_c().await?;
            sync_loop.stop().await;
        }
    }

    Ok(())
}

fn build_discovery(config: &Config) -> anyhow::Result<Discovery> {
    info!("Data dir: {}", config.node.data_dir.display());
    let store = Arc::new(RegistryStore::open(&config.node.data_dir)?);

    let registry: Arc<dyn OrchestratorRegistry> = match &config.registry.url {
        Some(url) => {
            info!("Registry: {}", url);
            Arc::new(HttpRegistry::new(url.clone()))
        }
        None => {
            info!(
                entries = config.registry.orchestrators.len(),
                "Registry: static list from config"
            );
            Arc::new(StaticRegistry::new(config.registry.orchestrators.clone()))
        }
    };

    let sync = RegistrySync::new(registry, store).with_prune(config.discovery.prune_deregistered);

    let probe = HttpProbeClient::new(config.discovery.probe_timeout())?
        .with_broadcaster(config.node.broadcaster_address.clone());

    Ok(Discovery::new(Arc::new(sync), Arc::new(probe))
        .with_probe_timeout(config.discovery.probe_timeout()))
}
