//! Batch processor: advances every outstanding order to a terminal state.
//!
//! Each order is cooked by its own background task, so the simulated
//! cook-time delays run concurrently. Every status write across all tasks
//! goes through one shared lock; writes from different orders are
//! serialized even though their delays overlap.

use crate::ServiceError;
use chrono::Utc;
use model::{Order, OrderStatus};
use std::sync::Arc;
use std::time::Duration;
use store::OrderStore;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The kitchen: cooks Pending/Processing orders through to Completed,
/// cancelling orders that have nothing to cook.
pub struct BatchProcessor<O> {
    orders: Arc<O>,
    write_lock: Arc<Mutex<()>>,
    cook_time_per_line: Duration,
}

impl<O: OrderStore + 'static> BatchProcessor<O> {
    pub fn new(orders: Arc<O>, cook_time_per_line: Duration) -> Self {
        Self {
            orders,
            write_lock: Arc::new(Mutex::new(())),
            cook_time_per_line,
        }
    }

    /// Spawn the advancement task for one order.
    ///
    /// The order's lines must already be populated. A failure inside the
    /// task is logged and stays inside the task; sibling orders keep
    /// cooking. There is no way to cancel an advancement once spawned.
    pub fn spawn_advance(&self, order: Order) -> JoinHandle<()> {
        let orders = Arc::clone(&self.orders);
        let write_lock = Arc::clone(&self.write_lock);
        let cook_time_per_line = self.cook_time_per_line;
        tokio::spawn(async move {
            let order_id = order.id;
            if let Err(e) = advance(orders, write_lock, cook_time_per_line, order).await {
                error!(order_id, error = %e, "order advancement failed");
            }
        })
    }
}

/// One order's trip to a terminal state: no lines ⇒ Cancelled outright,
/// otherwise Processing, a delay proportional to the line count, then
/// Completed.
async fn advance<O: OrderStore>(
    orders: Arc<O>,
    write_lock: Arc<Mutex<()>>,
    cook_time_per_line: Duration,
    mut order: Order,
) -> Result<(), ServiceError> {
    if order.lines.is_empty() {
        write_status(&*orders, &write_lock, &mut order, OrderStatus::Cancelled).await?;
        info!(order_id = order.id, "order has no lines, cancelled");
        return Ok(());
    }

    write_status(&*orders, &write_lock, &mut order, OrderStatus::Processing).await?;

    let cook_time = cook_time_per_line * order.lines.len() as u32 + Duration::from_millis(1);
    tokio::time::sleep(cook_time).await;

    write_status(&*orders, &write_lock, &mut order, OrderStatus::Completed).await?;
    info!(order_id = order.id, "order completed");
    Ok(())
}

/// A single serialized status write. The lock guards only the store call
/// and is released on failure as well.
async fn write_status<O: OrderStore>(
    orders: &O,
    write_lock: &Mutex<()>,
    order: &mut Order,
    status: OrderStatus,
) -> Result<(), ServiceError> {
    order.status = status;
    order.updated_at = Utc::now();
    let _guard = write_lock.lock().await;
    orders.update(order).await?;
    Ok(())
}
