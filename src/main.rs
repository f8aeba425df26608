//! Server binary
//!
//! Usage: `<jpeg stream> | mjpeg-rs [options]`
//!
//! Reads the motion-JPEG stream on stdin and serves it to every HTTP client
//! that connects. Exits 0 on a clean shutdown (signal or end of input) and
//! nonzero on any setup failure.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use mjpeg_rs::server::config::{DEFAULT_CLIENT_TIMEOUT, DEFAULT_PORT};
use mjpeg_rs::{FrameHub, IngestLoop, MjpegServer, Result, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "mjpeg-rs", version, about = "MJPEG streaming server")]
struct Args {
    /// Listen only on the localhost interface
    #[arg(short = 'l', long)]
    localhost: bool,

    /// TCP port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Separator between frames received at input
    /// (autodetects JPEG frame markers by default)
    #[arg(short = 's', long)]
    separator: Option<String>,

    /// Client read timeout, in seconds
    #[arg(short = 't', long, default_value_t = DEFAULT_CLIENT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Debug mode, increased log verbosity
    #[arg(short = 'd', long, conflicts_with = "quiet")]
    debug: bool,

    /// Quiet mode, log only errors
    #[arg(short = 'q', long)]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::default()
            .port(self.port)
            .listen_localhost(self.localhost)
            .client_timeout(Duration::from_secs(self.timeout));
        if let Some(separator) = self.separator {
            config = config.separator(separator.into_bytes());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "mjpeg-rs");

    let config = args.into_config();
    let shutdown = CancellationToken::new();
    let hub = Arc::new(FrameHub::new());

    // fatal setup errors surface here, before anything is running
    let server = MjpegServer::bind(config.clone(), Arc::clone(&hub)).await?;

    tokio::spawn(watch_signals(shutdown.clone()));

    let ingest = IngestLoop::new(&config, hub, shutdown.clone());
    let ingest_task = tokio::spawn(ingest.run(tokio::io::stdin()));

    server.run(shutdown).await?;

    match ingest_task.await {
        Ok(result) => result?,
        Err(e) => tracing::error!(error = %e, "ingest task panicked"),
    }

    tracing::info!("bye");
    Ok(())
}

/// Cancel `shutdown` on the first termination signal; later signals are
/// logged and ignored
async fn watch_signals(shutdown: CancellationToken) {
    loop {
        wait_for_signal().await;
        if shutdown.is_cancelled() {
            tracing::info!("interrupt already received, ignoring signal");
        } else {
            tracing::info!("interrupt received, quitting");
            shutdown.cancel();
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
