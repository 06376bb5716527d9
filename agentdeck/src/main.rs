use clap::{Parser, Subcommand};
use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agentdeck::api::{ApiServer, ApiServerConfig};
use agentdeck::producers::context_window;
use agentdeck::{AppConfig, ComponentBuilderClient, OrchestratorClient, Producers};
use agentdeck_cache::{CacheConfig, TagCache};

#[derive(Parser)]
#[command(name = "agentdeck")]
#[command(about = "Cached gateway for agent orchestration services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Host to bind to (overrides AGENTDECK_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides AGENTDECK_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// List the registered cache profiles
    Profiles,

    /// Show the context window of a model
    ContextWindow {
        /// Model name (e.g., "gpt-4")
        model: String,
    },

    /// Fetch aggregated stats of the backend services once
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "agentdeck=info,agentdeck_cache=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            let server = ApiServer::new(ApiServerConfig::from_app_config(config));
            server.start().await?;
        }

        Commands::Profiles => {
            let cache_config = CacheConfig::default();
            println!("{:<10} {:>8} {:>11} {:>9}", "PROFILE", "STALE", "REVALIDATE", "EXPIRE");
            for (name, profile) in cache_config.profiles.iter() {
                let flag = if profile.check_ordering().is_empty() { "" } else { "  (inverted)" };
                println!(
                    "{:<10} {:>7}s {:>10}s {:>8}s{}",
                    name,
                    profile.stale.as_secs(),
                    profile.revalidate.as_secs(),
                    profile.expire.as_secs(),
                    flag
                );
            }
        }

        Commands::ContextWindow { ref model } => {
            println!("{}: {} tokens", model, context_window(model));
        }

        Commands::Stats => {
            let producers = Producers::new(
                TagCache::new(CacheConfig::default()),
                OrchestratorClient::new(config.orchestrator_url.clone()),
                ComponentBuilderClient::new(config.component_builder_url.clone()),
            );
            let report = producers.agent_stats().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
