mod config;
mod identity;

use clap::{Parser, Subcommand};
use config::Config;
use rosterd_core::{
    ClusterManager, DownstreamPublisher, EnsemblePublisher, MemberListPublisher, Registration,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "rosterd")]
#[command(about = "Membership tracking and slot assignment for fixed-size clusters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the membership manager for this node
    Start {
        /// Path to configuration file
        #[arg(long = "conf", default_value = "config.yaml")]
        conf: String,

        /// Override this node's advertised address
        #[arg(long)]
        address: Option<String>,

        /// Override this node's display name
        #[arg(long)]
        node: Option<String>,

        /// Override the slot requested at first registration
        #[arg(long = "requested-slot")]
        requested_slot: Option<u16>,
    },
}

async fn run_start(cfg: Config) {
    let identity = match identity::load_or_create(&cfg.node.identity_file) {
        Ok(identity) => identity,
        Err(error) => {
            tracing::error!("Failed to establish node identity: {}", error);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Node identity {}, address {}, cluster size {}",
        identity,
        cfg.node.address,
        cfg.cluster.size
    );

    let registry = match cfg.registry_builder().build().await {
        Ok(registry) => registry,
        Err(error) => {
            tracing::error!("Failed to create registry: {}", error);
            std::process::exit(1);
        }
    };

    let registration = Registration {
        identity: identity.clone(),
        name: cfg.node.name.clone(),
        address: cfg.node.address.clone(),
        requested_slot: cfg.node.requested_slot,
    };

    let publishers: Vec<Box<dyn DownstreamPublisher>> = vec![
        Box::new(EnsemblePublisher::new(identity)),
        Box::new(MemberListPublisher::new()),
    ];

    let manager = ClusterManager::new(cfg.manager_settings(), registration, registry, publishers);

    if let Err(error) = manager.run().await {
        tracing::error!("Cluster manager error: {}", error);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rosterd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            conf,
            address,
            node,
            requested_slot,
        } => {
            tracing::info!("Starting rosterd with config: {}", conf);

            let mut cfg = match Config::from_file(&conf) {
                Ok(c) => c,
                Err(error) => {
                    tracing::error!("Failed to load config: {}", error);
                    std::process::exit(1);
                }
            };

            if let Some(address) = address {
                cfg.node.address = address;
            }
            if let Some(node) = node {
                cfg.node.name = node;
            }
            if let Some(slot) = requested_slot {
                cfg.node.requested_slot = slot;
            }

            if let Err(error) = cfg.validate() {
                tracing::error!("Invalid configuration: {}", error);
                std::process::exit(2);
            }

            run_start(cfg).await;
        }
    }
}
