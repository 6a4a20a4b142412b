//! cloudgate: MCP gateway for GCP and Azure CLI operations.
//!
//! Two subcommands:
//! - `cloudgate serve`: REST routes plus Streamable HTTP MCP on one port
//! - `cloudgate stdio`: STDIO transport for desktop MCP clients

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nimbus_cloudgate::{resolve_config_path, GatewayConfig, GatewayMcpServer, ToolRouter};
use rmcp::ServiceExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// cloudgate: GCP and Azure operations as MCP tools.
#[derive(Parser)]
#[command(
    name = "cloudgate",
    version,
    about = "MCP gateway exposing GCP and Azure operations as tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve REST routes and Streamable HTTP MCP
    Serve {
        /// Path to cloudgate.toml [default: ./cloudgate.toml or ~/.config/cloudgate/cloudgate.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// HTTP port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
        /// Bind address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
    /// Serve MCP over STDIO
    Stdio {
        /// Path to cloudgate.toml [default: ./cloudgate.toml or ~/.config/cloudgate/cloudgate.toml]
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP stream in stdio mode, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancellationToken::new();

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutting down cloudgate...");
        cancel_for_signal.cancel();
    });

    match cli.command {
        Commands::Serve { config, port, host } => {
            let router = build_router(config).await?;
            run_serve(router, host, port, cancel).await?;
        }
        Commands::Stdio { config } => {
            let router = build_router(config).await?;
            run_stdio(router, cancel).await?;
        }
    }

    Ok(())
}

/// Serve the REST routes with the MCP service as fallback on one listener.
async fn run_serve(
    router: ToolRouter,
    host: String,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let app = nimbus_cloudgate::server::app(router, cancel.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(host = %host, port = %port, "cloudgate HTTP server listening");
    tracing::info!("Connect your MCP client to http://{}:{}/mcp", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("cloudgate HTTP server error: {}", e))?;

    tracing::info!("cloudgate HTTP server stopped");
    Ok(())
}

/// Serve MCP over stdin/stdout until the client disconnects or Ctrl-C.
async fn run_stdio(router: ToolRouter, cancel: CancellationToken) -> Result<()> {
    let server = GatewayMcpServer::new(router);

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let running = server
        .serve_with_ct(transport, cancel.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize stdio transport: {:?}", e))?;

    tracing::info!("cloudgate stdio transport initialized, waiting for messages");

    tokio::select! {
        result = running.waiting() => {
            match result {
                Ok(reason) => {
                    tracing::info!(?reason, "stdio transport completed");
                }
                Err(e) => {
                    tracing::error!(error = %e, "stdio transport error");
                    return Err(anyhow::anyhow!("stdio transport error: {}", e));
                }
            }
        }
        _ = cancel.cancelled() => {
            tracing::info!("stdio transport cancelled");
        }
    }

    Ok(())
}

/// Load config (or defaults when no file is found) and build the router.
async fn build_router(explicit: Option<PathBuf>) -> Result<ToolRouter> {
    let config = load_config(explicit).await?;
    ToolRouter::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to build tool router: {}", e))
}

async fn load_config(explicit: Option<PathBuf>) -> Result<GatewayConfig> {
    let cwd = std::env::current_dir()
        .map_err(|e| anyhow::anyhow!("Failed to read working directory: {}", e))?;
    let config_dir = dirs::config_dir();

    match resolve_config_path(explicit, &cwd, config_dir.as_deref()) {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            GatewayConfig::load(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to load config {:?}: {}", path, e))
        }
        None => {
            tracing::info!("no cloudgate.toml found, using built-in defaults");
            Ok(GatewayConfig::default())
        }
    }
}
