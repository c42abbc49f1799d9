/// Restaurant Order Processing Application
///
/// This is the main entry point for the order processing service. It wires
/// the in-memory stores into the order facade and runs the kitchen sweep:
/// a periodic batch pass that advances every outstanding order to a
/// terminal state.
///
/// # Architecture
///
/// The application follows a modular architecture with:
/// - Store layer for data access
/// - Service layer for the reservation/lifecycle/batch core
/// - Periodic kitchen sweep driving batch processing
///
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use app_config::AppConfig;
use service::{OrderProcessingService, ServiceError};
use store::{MemDishStore, MemOrderLineStore, MemOrderStore};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    tracing_subscriber::fmt::init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    if let Err(err) = init_logger() {
        eprintln!("Failed to initialize logger: {}", err);
        return Err(anyhow::anyhow!("Failed to initialize logger"));
    }

    info!("Restaurant order processing starting...");

    // Create a notification handle for graceful shutdown
    let shutdown = Arc::new(Notify::new());

    // Set up signal handler for graceful shutdown
    let shutdown_signal = shutdown.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                shutdown_signal.notify_waiters();
            }
            Err(err) => {
                error!("Failed to listen for shutdown signal: {}", err);
            }
        }
    });

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize stores and the order facade
    let dishes = Arc::new(MemDishStore::new());
    let orders = Arc::new(MemOrderStore::new());
    let lines = Arc::new(MemOrderLineStore::new());
    let service = Arc::new(OrderProcessingService::new(
        dishes,
        orders,
        lines,
        config.cook_time_per_line,
    ));

    // Create a JoinSet to manage all our tasks
    let mut tasks = JoinSet::new();

    // Kitchen sweep: periodically dispatch outstanding orders for cooking
    let sweep_service = service.clone();
    let sweep_shutdown = shutdown.clone();
    let batch_interval = config.batch_interval;
    tasks.spawn(async move {
        let mut ticker = tokio::time::interval(batch_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match sweep_service.process_orders().await {
                        Ok(count) => info!("Dispatched {} orders to the kitchen", count),
                        Err(ServiceError::NotFound(_)) => debug!("No unprocessed orders"),
                        Err(err) => error!("Kitchen sweep failed: {}", err),
                    }
                }
                _ = sweep_shutdown.notified() => {
                    info!("Kitchen sweep stopping");
                    break;
                }
            }
        }
    });

    // Wait for the shutdown signal, then drain tasks within the timeout
    shutdown.notified().await;
    let drain = async {
        while let Some(res) = tasks.join_next().await {
            if let Err(err) = res {
                error!("Task error: {}", err);
            }
        }
    };
    if tokio::time::timeout(config.shutdown_timeout, drain)
        .await
        .is_err()
    {
        error!("Shutdown timed out, some tasks were aborted");
    }

    info!("Application stopped");
    Ok(())
}
