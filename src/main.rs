//! mcp-auth-proxy - authenticating reverse proxy for MCP servers

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mcp_auth_proxy::{proxy::create_router, ProxyConfig, ProxyContext};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the proxy (default)
    Serve {
        /// Path to a TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate an example configuration file
    Init {
        /// Output path for the configuration
        #[arg(short, long, default_value = "proxy.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "mcp_auth_proxy=info,tower_http=info".to_string()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve {
        config: None,
        port: None,
    }) {
        Commands::Serve { config, port } => serve(config, port).await,
        Commands::Init { output } => generate_config(output).await,
    }
}

async fn serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config =
        ProxyConfig::load(config_path.as_deref()).context("failed to load configuration")?;
    if let Some(port) = port {
        config.port = port;
    }

    info!(
        mode = ?config.auth_mode,
        downstream = %config.downstream_url,
        "starting proxy"
    );

    let addr = format!("{}:{}", config.host, config.port);
    let context = ProxyContext::new(config).context("invalid configuration")?;
    let app = create_router(context);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("proxy listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn generate_config(output: PathBuf) -> anyhow::Result<()> {
    if output.exists() {
        anyhow::bail!("configuration file already exists: {}", output.display());
    }

    let example = include_str!("../proxy-config.example.toml");
    tokio::fs::write(&output, example).await?;

    info!("generated configuration file: {}", output.display());
    info!(
        "edit it, then run: mcp-auth-proxy serve --config {}",
        output.display()
    );

    Ok(())
}
