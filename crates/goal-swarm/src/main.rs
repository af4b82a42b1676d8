use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use goal_swarm::pipeline::{Orchestrator, RunRequest};
use goal_swarm::providers::Credentials;
use goal_swarm::server::{self, AppState};
use goal_swarm::OrchestratorConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "goal-swarm")]
#[command(about = "Decompose goals and resolve them with a racing provider ensemble")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// TOML config file; defaults plus GOAL_SWARM_* overrides when omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run one goal with credentials from <PROVIDER>_API_KEY variables
    Run {
        goal: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate configuration and list providers with credentials
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<OrchestratorConfig> {
    let config = match path {
        Some(path) => OrchestratorConfig::from_toml_file(path)?,
        None => OrchestratorConfig::from_env(),
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

fn http_client(config: &OrchestratorConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()
        .context("failed to build HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, config } => {
            let config = load_config(config.as_ref())?;
            let http = http_client(&config)?;
            info!(
                quorum = config.quorum,
                ceiling_ms = config.ceiling_ms,
                fast_provider = %config.fast_provider,
                "starting goal-swarm server"
            );

            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("shutdown requested"),
                    Err(e) => warn!(error = %e, "failed to listen for ctrl-c"),
                }
                signal.cancel();
            });

            server::serve(bind, AppState::new(config, http), shutdown).await?;
        }
        Commands::Run { goal, config } => {
            let config = load_config(config.as_ref())?;
            let http = http_client(&config)?;
            let credentials = Credentials::from_env();
            let orchestrator = Orchestrator::from_credentials(config, &credentials, &http)?;

            let request = RunRequest::new(goal).with_credentials(credentials);
            let response = orchestrator.run(&request).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config.as_ref())?;
            println!("{}", toml::to_string_pretty(&config)?);

            let configured = Credentials::from_env().configured();
            if configured.is_empty() {
                warn!("no <PROVIDER>_API_KEY variables set; `run` will fail");
            }
            for kind in configured {
                println!("credential: {kind} ({})", kind.default_model());
            }
        }
    }

    Ok(())
}
