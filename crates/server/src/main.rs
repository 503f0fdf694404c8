// crates/server/src/main.rs
//! Netboost server binary.
//!
//! Binds the Axum HTTP server on localhost, serves the dashboard bundle
//! when present, and opens the browser — job workers are spawned on
//! demand by the API, so startup is immediate.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use netboost_server::{create_app, AppState};
use tracing_subscriber::EnvFilter;

/// Default port for the server.
const DEFAULT_PORT: u16 = 47870;

#[derive(Debug, Parser)]
#[command(name = "netboost", version, about = "Developer-workstation network assistant")]
struct Args {
    /// Port to listen on (NETBOOST_PORT overrides the default too).
    #[arg(long)]
    port: Option<u16>,

    /// Do not open the browser after binding.
    #[arg(long)]
    no_open: bool,

    /// Directory with the dashboard bundle; defaults to ./dist when it
    /// exists, otherwise the server runs API-only.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

fn resolve_port(args: &Args) -> u16 {
    args.port
        .or_else(|| {
            std::env::var("NETBOOST_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
        })
        .unwrap_or(DEFAULT_PORT)
}

fn resolve_static_dir(args: &Args) -> Option<PathBuf> {
    args.static_dir.clone().or_else(|| {
        let dist = PathBuf::from("dist");
        dist.exists().then_some(dist)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Quiet by default; RUST_LOG opens it up.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let args = Args::parse();
    let port = resolve_port(&args);
    let static_dir = resolve_static_dir(&args);

    eprintln!("\n\u{1f680} netboost v{}\n", env!("CARGO_PKG_VERSION"));

    let state = AppState::new();
    let app = create_app(state, static_dir);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let url = format!("http://localhost:{port}");
    eprintln!("  \u{2713} Ready \u{2014} {url}\n");

    if !args.no_open {
        // Best effort; a headless session just skips it.
        if let Err(e) = open::that_detached(&url) {
            tracing::debug!("could not open browser: {e}");
        }
    }

    axum::serve(listener, app).await?;

    Ok(())
}
