//! Access-control event monitor binary.
//!
//! Connects to the RusGuard server, then runs two loops against the shared
//! session until Ctrl-C/SIGTERM: a periodic event poll and a long-poll
//! notification listener.

use anyhow::{Context, Result};
use clap::Parser;
use rusguard_client::{ClientConfig, ClientError, HttpTransport, SoapSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Event monitor for a RusGuard access-control server.
///
/// Authenticates against the LNetworkService SOAP endpoint and streams the
/// server's event log and passage notifications to structured logs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting ACS monitor v{}", env!("CARGO_PKG_VERSION"));

    let config: ClientConfig = if args.config.exists() {
        let content = tokio::fs::read_to_string(&args.config)
            .await
            .context("Failed to read config file")?;
        serde_yaml::from_str(&content).context("Failed to parse config file")?
    } else {
        info!("Config file not found, using defaults");
        ClientConfig::default()
    };

    let poll_interval = std::time::Duration::from_secs(config.poll_interval_secs);
    let transport = HttpTransport::new(&config).context("Failed to build HTTP transport")?;
    let session = Arc::new(SoapSession::new(config, transport));

    session.connect().await.context("Connect failed")?;
    let version = session.get_version().await.context("Version query failed")?;
    info!(version = %version, "server reachable");

    let result = tokio::select! {
        result = poll_events(session.clone(), poll_interval) => result,
        result = poll_notifications(session.clone()) => result,
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    if let Err(e) = session.disconnect().await {
        error!(error = %e, "Disconnect failed");
    }

    result
}

/// Poll the event log, advancing the cursor past every message seen.
async fn poll_events(
    session: Arc<SoapSession<HttpTransport>>,
    interval: std::time::Duration,
) -> Result<()> {
    let mut cursor = session
        .get_last_event()
        .await
        .context("Initial event cursor fetch failed")?
        .id
        .unwrap_or(0);

    loop {
        let events = match session.get_events(Some(cursor)).await {
            Ok(events) => events,
            Err(ClientError::Fault {
                faultcode,
                faultstring,
            }) => {
                error!(%faultcode, %faultstring, "event poll rejected");
                Vec::new()
            }
            Err(e) => return Err(e).context("Event poll failed"),
        };

        for event in events {
            if let Some(id) = event.id {
                if id > cursor {
                    cursor = id;
                }
            }
            info!(
                id = ?event.id,
                message = event.message.as_deref().unwrap_or(""),
                details = event.details.as_deref().unwrap_or(""),
                "event"
            );
        }
        tokio::time::sleep(interval).await;
    }
}

/// Long-poll for passage notifications; timeouts just mean no news yet.
async fn poll_notifications(session: Arc<SoapSession<HttpTransport>>) -> Result<()> {
    loop {
        let notifications = match session.get_notification().await {
            Ok(notifications) => notifications,
            Err(ClientError::LongPollTimeout) => continue,
            Err(e) => return Err(e).context("Notification poll failed"),
        };

        for passage in notifications {
            info!(
                employee = format!(
                    "{} {}",
                    passage.employee_first_name.as_deref().unwrap_or(""),
                    passage.employee_last_name.as_deref().unwrap_or("")
                ),
                message = passage.message.as_deref().unwrap_or(""),
                "passage"
            );
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
