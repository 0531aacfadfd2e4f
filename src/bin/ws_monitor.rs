//! WebSocket push monitor
//!
//! Connects to a push service through the livesocket connection manager,
//! subscribes to the configured resources and logs every status change and
//! message until Ctrl+C or until reconnection gives up.
//!
//! Usage: ws_monitor [config.yaml]

use anyhow::{Context, Result};
use livesocket_monitor::bin_common::{
    init_tracing, parse_args, resolve_config_path, ConfigType, MonitorConfig,
};
use livesocket_monitor::livesocket::{self, ConnectionStatus, Event};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = resolve_config_path(&parse_args(), ConfigType::Monitor);
    let config = MonitorConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config.log_level);
    config.log();

    let manager = livesocket::builder()
        .url(config.url.clone())
        .config(config.manager.clone())
        .subscriptions(config.resources.iter().cloned())
        .on_reconnect(|attempt| info!(attempt, "Reconnecting"))
        .build()
        .context("building connection manager")?;

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    manager.on("connection", move |event: &Event| {
        if let Event::Status(status) = event {
            let _ = status_tx.send(status.clone());
        }
    });
    manager.on("error", |event: &Event| {
        if let Event::Error(message) = event {
            warn!(%message, "Transport error");
        }
    });
    manager.on("*", |event: &Event| {
        if let Event::Message(message) = event {
            info!(
                kind = message.kind.as_deref().unwrap_or("-"),
                payload = %message.payload,
                "Message"
            );
        }
    });

    info!("Press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            status = status_rx.recv() => match status {
                Some(ConnectionStatus::Connected) => info!(url = %manager.url(), "Connected"),
                Some(ConnectionStatus::Disconnected { code, reason }) => {
                    warn!(code, %reason, "Disconnected")
                }
                Some(ConnectionStatus::Failed { attempts }) => {
                    error!(attempts, "Giving up after repeated connection failures");
                    break;
                }
                None => break,
            },
        }
    }

    manager.close();

    let metrics = manager.metrics();
    info!(
        sent = metrics.messages_sent,
        received = metrics.messages_received,
        reconnects = metrics.reconnect_count,
        dropped = metrics.messages_dropped,
        malformed = metrics.malformed_frames,
        "Shutdown complete"
    );
    Ok(())
}
