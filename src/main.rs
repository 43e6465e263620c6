//! Content router.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                   CONTENT ROUTER                      │
//!                 │                                                       │
//!   Client ──────▶│  http::server ──▶ http::dispatch ──▶ routing::table   │
//!                 │                        │              (ArcSwap)       │
//!                 │                        ├──▶ redirect / gone / 404     │
//!                 │                        └──▶ http::proxy ─────────────┼──▶ Backend
//!                 │                                                       │
//!                 │  store ──▶ routing::builder ──▶ reload::refresher ────┤
//!                 │  (file)                          ▲      ▲            │
//!                 │                 admin /reload ───┘      └── SIGHUP   │
//!                 └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use content_router::config::{config_warnings, load_config};
use content_router::lifecycle::signals::handle_signals;
use content_router::observability::{logging::init_logging, metrics::init_metrics};
use content_router::reload::StoreWatcher;
use content_router::store::FileStore;
use content_router::{version_info, RouterApp};

#[derive(Parser)]
#[command(name = "content-router", about = "Path-based content router", disable_version_flag = true)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "ROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Print the build identity and exit.
    #[arg(short = 'V', long)]
    version: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if cli.version {
        println!("content-router {}", version_info());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability)?;

    tracing::info!(version = %version_info(), "content-router starting");
    tracing::info!(
        public_address = %config.listener.public_address,
        admin_address = %config.listener.admin_address,
        store = %config.store.path.display(),
        poll_interval = ?config.store.poll_interval,
        connect_timeout = ?config.backend.connect_timeout,
        header_timeout = ?config.backend.header_timeout,
        read_timeout = ?config.listener.read_timeout,
        write_timeout = ?config.listener.write_timeout,
        "Configuration loaded"
    );
    for warning in config_warnings(&config) {
        tracing::warn!("{warning}");
    }

    if let Some(address) = &config.observability.metrics_address {
        init_metrics(address.parse()?);
    }

    let store = FileStore::new(&config.store.path);
    let watch_path = config.store.watch.then(|| store.path().to_path_buf());

    let app = RouterApp::start(config, Arc::new(store)).await?;
    tracing::info!(
        public = %app.public_addr()?,
        admin = %app.admin_addr()?,
        "Listening for connections"
    );

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match watch_path {
        Some(path) => Some(StoreWatcher::new(&path, app.reload_handle()).run()?),
        None => None,
    };

    tokio::spawn(handle_signals(app.shutdown(), app.reload_handle()));
    app.serve().await?;
    Ok(())
}
