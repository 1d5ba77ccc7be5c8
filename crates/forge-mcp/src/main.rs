//! forge-mcp
//!
//! MCP server exposing GitHub pull requests, commits and local git
//! operations to agentic clients.
//!
//! # Usage
//!
//! ```bash
//! GITHUB_TOKEN=... forge-mcp [--transport sse|stdio] [--port 3000] [--config forge.toml]
//! ```
//!
//! # Environment Variables
//!
//! - `GITHUB_TOKEN`: GitHub API token (required)
//! - `PORT`: SSE listen port (default: 3000)
//! - `GITHUB_API_URL`: API base URL, for GitHub Enterprise
//! - `RUST_LOG`: Control log verbosity (default: `forge_mcp=info`)
//!
//! Logs always go to stderr; with `--transport stdio` stdout carries the
//! protocol.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use forge_host::GitHubClient;
use forge_mcp::transport::{self, SseState};
use forge_mcp::{
    CapabilityContext, CapabilityRegistry, Config, Error, McpServer, Outcome, Overrides,
    SessionRegistry, Supervisor, TransportKind, shutdown_signal,
};
use forge_shell::SystemShell;

/// MCP server for GitHub and local git
#[derive(Parser)]
#[command(name = "forge-mcp")]
#[command(about = "MCP server for GitHub and local git")]
#[command(version)]
struct Args {
    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Transport to serve
    #[arg(long, value_enum)]
    transport: Option<TransportKind>,

    /// Address to bind the SSE transport on
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the SSE transport on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl From<Args> for Overrides {
    fn from(args: Args) -> Self {
        Self {
            github_token: args.github_token,
            transport: args.transport,
            host: args.host,
            port: args.port,
            api_url: args.api_url,
            config: args.config,
        }
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr (stdout may carry the stdio transport)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "forge_mcp=info"
                    .parse()
                    .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into()),
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let outcome = match Config::resolve(Args::parse().into()) {
        Ok(config) => run(config).await,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            Outcome::Failed(e.to_string())
        }
    };

    std::process::exit(outcome.exit_code());
}

async fn run(config: Config) -> Outcome {
    tracing::info!(?config, "Starting forge-mcp");

    let host = match GitHubClient::with_base_url(&config.github_token, &config.api_url) {
        Ok(host) => host,
        Err(e) => return Outcome::Failed(format!("cannot build GitHub client: {e}")),
    };
    let context = CapabilityContext::new(Arc::new(host), Arc::new(SystemShell::new()));
    let registry = Arc::new(CapabilityRegistry::standard());
    tracing::info!(capabilities = registry.len(), "Registered capabilities");

    let server = McpServer::new(registry, context);
    let sessions = Arc::new(SessionRegistry::new());
    let supervisor = Supervisor::new(sessions.clone());
    let shutdown = supervisor.shutdown_token();

    match config.transport {
        TransportKind::Sse => {
            let state = SseState::new(server, sessions, supervisor.spawner());
            let address = config.bind_address();
            let main = async move {
                let listener = tokio::net::TcpListener::bind(&address)
                    .await
                    .map_err(|e| Error::Server(format!("failed to bind to {address}: {e}")))?;
                transport::sse::serve(listener, state, shutdown).await
            };
            supervisor.run(main, shutdown_signal()).await
        }
        TransportKind::Stdio => {
            let main = transport::run_stdio(server, shutdown);
            supervisor.run(main, shutdown_signal()).await
        }
    }
}
