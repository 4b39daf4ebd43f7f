//! TableGate CLI
//!
//! Command-line interface for the TableGate data-access server.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tablegate_api::{AdapterKind, ApiConfig, ApiServer, AppState};

/// TableGate - provider-agnostic CRUD over REST
#[derive(Parser)]
#[command(name = "tablegate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "TABLEGATE_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000", env = "TABLEGATE_PORT")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0", env = "TABLEGATE_BIND")]
        bind: String,
    },

    /// Check the configured backend
    Health,
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "tablegate=debug,tower_http=debug,info"
    } else {
        "tablegate=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(port, &bind).await,
        Commands::Health => cmd_health().await,
    }
}

fn describe_adapter(config: &ApiConfig) -> String {
    match &config.adapter {
        AdapterKind::Memory => "memory".into(),
        AdapterKind::Rest(rest) => format!("rest ({})", rest.base_url),
    }
}

/// Run the API server
async fn cmd_serve(port: u16, bind: &str) -> Result<()> {
    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;
    info!(
        adapter = %describe_adapter(&config),
        %addr,
        rate_limit = config.rate_limit.max_requests,
        "Configuration loaded"
    );

    println!("{}", "Starting TableGate API server...".cyan().bold());
    println!("   {} {}", "Adapter:".green(), describe_adapter(&config));
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::new(config).context("Failed to initialize server")?;
    server.run(addr).await.context("Server error")?;

    Ok(())
}

/// Probe the configured backend once
async fn cmd_health() -> Result<()> {
    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    let adapter = describe_adapter(&config);
    let state = AppState::new(config).context("Failed to build adapter")?;

    debug!(adapter = %adapter, "Probing backend");
    let status = state.service.health_check().await;
    if status.ok {
        println!(
            "{} {} ({} ms)",
            "Healthy:".green().bold(),
            adapter,
            status.latency_ms
        );
        Ok(())
    } else {
        println!("{} {}", "Unhealthy:".red().bold(), adapter);
        anyhow::bail!("backend health check failed")
    }
}
