//! Graceful shutdown demo.
//!
//! Runs an HTTP server and a client polling it under one orchestrator. The
//! process stops on SIGTERM/SIGINT, or when the configured lifetime ends.
//!
//! ```text
//!          ┌──────────────── Graceful ────────────────┐
//!          │                                           │
//!          │  ┌──────────┐   GET /    ┌────────────┐   │
//!          │  │  Poller  │──────────▶│ HttpServer │   │
//!          │  └────┬─────┘            └────────────┘   │
//!          │       │ status                            │
//!          │       ▼                                   │
//!          │  ┌──────────┐                             │
//!          │  │ Reporter │                             │
//!          │  └──────────┘                             │
//!          └───────────────────────────────────────────┘
//!                 ▲                        ▲
//!        lifetime deadline          SIGTERM / SIGINT
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::http::StatusCode;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use graceful::config::{load_config, GracefulConfig};
use graceful::http::{HttpServer, Poller};
use graceful::lifecycle::{Graceful, Outcome, Signals, Task, TaskFailure};
use graceful::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "graceful")]
#[command(about = "Run a server and client under a graceful shutdown orchestrator", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the drain timeout (milliseconds).
    #[arg(long)]
    drain_timeout_ms: Option<u64>,

    /// Override the lifetime deadline (seconds, 0 disables it).
    #[arg(long)]
    lifetime_secs: Option<u64>,
}

/// Logs each status the poller observes until the poller stops.
struct Reporter {
    statuses: Mutex<Option<mpsc::Receiver<StatusCode>>>,
}

#[async_trait]
impl Task for Reporter {
    async fn run(&self, _shutdown: CancellationToken) -> Result<(), TaskFailure> {
        let taken = self.statuses.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(mut statuses) = taken else {
            return Ok(());
        };

        // Ends when the poller drops its sender.
        while let Some(status) = statuses.recv().await {
            tracing::info!(status = %status, "Request");
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => GracefulConfig::default(),
    };
    if let Some(ms) = cli.drain_timeout_ms {
        config.shutdown.drain_timeout_ms = ms;
    }
    if let Some(secs) = cli.lifetime_secs {
        config.shutdown.lifetime_secs = (secs > 0).then_some(secs);
    }

    logging::init_logging(&config.observability);
    tracing::info!("graceful v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Shutdown finished with errors");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: GracefulConfig) -> Result<(), Box<dyn std::error::Error>> {
    let root = CancellationToken::new();
    if let Some(lifetime) = config.shutdown.lifetime() {
        let root = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            tracing::info!(lifetime = ?lifetime, "Lifetime deadline reached");
            root.cancel();
        });
    }

    let (statuses_tx, statuses) = mpsc::channel(16);
    let server = HttpServer::new(config.server.clone(), &config.security)?;
    let poller = Poller::from_config(&config.client, &config.security, statuses_tx)?;
    let reporter = Reporter {
        statuses: Mutex::new(Some(statuses)),
    };

    let graceful = Graceful::from_config(&root, &config.shutdown);
    graceful.register([
        Arc::new(server) as Arc<dyn Task>,
        Arc::new(poller),
        Arc::new(reporter),
    ]);

    let report = graceful
        .wait_with_report(Signals::new(config.shutdown.signals.iter().copied()))
        .await;

    if let Outcome::TimedOut { outstanding } = report.outcome {
        tracing::warn!(outstanding, "Some tasks did not stop in time");
    }
    report.errors?;
    Ok(())
}
