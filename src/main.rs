//! Astrolabe MCP Server - Entry Point
//!
//! This binary provides an MCP server via STDIO transport for chart computation.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use astrolabe::config::Settings;
use astrolabe::ephemeris::SwissEphemeris;
use astrolabe::{AstrolabeServer, ChartService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging to stderr (stdout is used for MCP communication)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!("Starting Astrolabe MCP Server");

    let settings = Settings::from_env().context("Invalid ASTROLABE_* configuration")?;
    let ephemeris = SwissEphemeris::new(settings.ephemeris_path.as_deref())
        .context("Failed to initialize the Swiss Ephemeris")?;

    // Create and run the MCP server
    let service = Arc::new(ChartService::new(Arc::new(ephemeris), settings));
    let server = AstrolabeServer::new(service);
    let running = server.serve(stdio()).await?;

    tracing::info!("Server initialized, waiting for requests...");

    // Wait for shutdown
    running.waiting().await?;

    tracing::info!("Server shutting down");

    Ok(())
}
