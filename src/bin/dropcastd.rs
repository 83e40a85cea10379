//! dropcast daemon - SSE broadcast server with a watched drop folder
//!
//! Streams events to every client connected to `GET /events`. Events come
//! from `POST /trigger-event` and from new files appearing in the watched
//! folder.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default port (3000), watching ./watched
//! dropcastd
//!
//! # Custom port and folder
//! dropcastd --port 5000 --watch-folder /srv/inbox
//!
//! # Same, via environment (a .env file is loaded if present)
//! PORT=5000 WATCH_FOLDER=/srv/inbox dropcastd
//!
//! # Enable debug logging
//! RUST_LOG=dropcastd=debug dropcastd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown (open streams are closed, 10s grace)

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dropcastd::config::{CorsConfig, ServerConfig, DEFAULT_PORT, DEFAULT_WATCH_FOLDER};
use dropcastd::registry::{spawn_registry, ConnectionRegistry};
use dropcastd::server::HttpServer;
use dropcastd::watcher::DirectoryWatcher;

/// dropcast daemon - server-sent event broadcaster
#[derive(Parser, Debug)]
#[command(name = "dropcastd", version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory watched for new files
    #[arg(short, long, env = "WATCH_FOLDER", default_value = DEFAULT_WATCH_FOLDER)]
    watch_folder: PathBuf,

    /// Don't watch any directory
    #[arg(long, env = "DROPCAST_NO_WATCH")]
    no_watch: bool,

    /// Allowed CORS origin(s): `*` or a comma-separated list
    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    cors_origin: String,

    /// Allow credentialed CORS requests
    #[arg(long, env = "CORS_CREDENTIALS")]
    cors_credentials: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            watch_folder: (!self.no_watch).then_some(self.watch_folder),
            cors: CorsConfig::new(&self.cors_origin, self.cors_credentials),
        }
    }
}

fn main() -> Result<()> {
    // Loaded before parsing so its variables act as flag fallbacks
    let env_file_error = env_file_error(dotenvy::dotenv());

    let args = Args::parse();
    run_daemon(args.into_config(), env_file_error)
}

/// Filters the result of loading `.env`.
///
/// A missing file is normal; an unreadable or malformed one is returned so
/// it can be reported once logging is up.
fn env_file_error(result: dotenvy::Result<PathBuf>) -> Option<dotenvy::Error> {
    match result {
        Ok(_) => None,
        Err(e) if e.not_found() => None,
        Err(e) => Some(e),
    }
}

/// Runs the daemon (async entry point).
#[tokio::main]
async fn run_daemon(config: ServerConfig, env_file_error: Option<dotenvy::Error>) -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("dropcastd=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    if let Some(e) = env_file_error {
        warn!(error = %e, "Ignoring .env file");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "dropcast daemon starting"
    );

    // Spawn the connection registry
    let registry = spawn_registry();
    info!("Connection registry started");

    // Start the directory watcher (failure is fatal)
    let mut watcher = match &config.watch_folder {
        Some(path) => Some(start_watcher(path, &registry)?),
        None => {
            info!("Directory watcher disabled");
            None
        }
    };

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    // Setup signal handlers
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    // Create and run the server
    let server = HttpServer::new(config, registry, cancel_token);
    let result = server.run().await;

    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("dropcast daemon stopped");
    Ok(())
}

/// Creates the watch folder if needed and starts forwarding new files.
fn start_watcher(path: &Path, registry: &ConnectionRegistry) -> Result<DirectoryWatcher> {
    let mut watcher = DirectoryWatcher::new(path)
        .with_context(|| format!("Failed to create watch folder {}", path.display()))?;

    watcher.on_file_added(Arc::new(registry.clone()));
    watcher
        .start()
        .with_context(|| format!("Failed to start file watcher for {}", path.display()))?;

    Ok(watcher)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
