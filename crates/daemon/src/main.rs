//! Dispatch daemon - Main Entry Point
//!
//! Hosts one in-memory dispatch queue behind the JSON-RPC server.

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use config::DaemonConfig;
use dispatch_api_rpc::RpcServer;
use dispatch_core::port::{
    DeliveryLog, NullDeliveryLog, SystemTimeProvider, Transport, UuidProvider,
};
use dispatch_core::DispatchQueue;
use dispatch_infra_transport::{FileDeliveryLog, LogTransport, WebhookTransport};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long shutdown waits for the in-flight send
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env().context("Failed to load configuration")?;

    // 2. Initialize logging
    let _log_guard = logging::init(config.log_format, config.log_dir.as_deref())?;

    info!("Dispatch daemon v{} starting...", VERSION);

    // 3. Setup dependencies (DI wiring)
    let transport: Arc<dyn Transport> = match &config.webhook {
        Some(webhook) => {
            let transport = WebhookTransport::new(webhook.clone())?;
            info!(url = %transport.url(), "Using webhook transport");
            Arc::new(transport)
        }
        None => {
            warn!("DISPATCH_WEBHOOK_URL not set; messages are only logged (dry run)");
            Arc::new(LogTransport::new())
        }
    };

    let delivery_log: Arc<dyn DeliveryLog> = match &config.delivery_log {
        Some(path) => Arc::new(
            FileDeliveryLog::open(path)
                .await
                .with_context(|| format!("Failed to open delivery log {}", path.display()))?,
        ),
        None => Arc::new(NullDeliveryLog),
    };

    let queue = DispatchQueue::new(
        config.queue.clone(),
        transport,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        delivery_log,
    )
    .context("Failed to create dispatch queue")?;

    // 4. Start JSON-RPC server
    let (addr, rpc_handle) = RpcServer::new(config.rpc.clone(), queue.clone())
        .start()
        .await
        .context("RPC server start failed")?;

    info!(addr = %addr, "System ready. Waiting for messages...");
    info!("Press Ctrl+C to shutdown");

    // 5. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown: stop admission, let the in-flight send finish
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    queue.pause().await;

    if tokio::time::timeout(SHUTDOWN_GRACE, queue.wait_idle())
        .await
        .is_err()
    {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "In-flight send did not finish before shutdown"
        );
    }

    let stats = queue.get_stats().await;
    if stats.current_queue_length > 0 {
        warn!(
            discarded = stats.current_queue_length,
            "Pending jobs discarded (queue is in-memory only)"
        );
    }

    info!(
        sent = stats.total_sent,
        failed = stats.total_failed,
        retried = stats.total_retried,
        "Shutdown complete."
    );

    Ok(())
}
