//! PDF Converter Web - HTTP service that converts uploaded batches to PDF.

mod helpers;
mod routes;
mod state;
mod sweeper;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pdf_converter_core::AppConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-converter-web")]
#[command(author, version, about = "PDF Converter Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Config file (TOML); PDF_CONVERTER__* variables override it
    #[arg(short, long, env = "PDF_CONVERTER_CONFIG")]
    config: Option<PathBuf>,

    /// Never start the headless browser; use renderer-free fallbacks only
    #[arg(long)]
    no_renderer: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // chromiumoxide logs every unrecognised CDP message at warn
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},chromiumoxide=error")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = match &args.config {
        Some(path) => AppConfig::load_layered(Some(path.as_path()))?,
        None => AppConfig::load(),
    };
    if args.no_renderer {
        config.renderer.enabled = false;
    }

    let state = Arc::new(AppState::new(config).context("Failed to initialize application state")?);

    sweeper::spawn(Arc::clone(&state));

    let app = routes::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
