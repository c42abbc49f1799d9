//! Stock reservation engine.
//!
//! Every dish quantity mutation triggered by order activity goes through
//! [`Inventory`]; management edits go straight to the dish store.

use crate::ServiceError;
use chrono::Utc;
use model::Dish;
use std::sync::Arc;
use store::{DishStore, StoreError};
use tracing::debug;

/// Reserves and releases dish stock on behalf of orders.
pub struct Inventory<D> {
    dishes: Arc<D>,
}

impl<D: DishStore> Inventory<D> {
    pub fn new(dishes: Arc<D>) -> Self {
        Self { dishes }
    }

    /// Take `quantity` portions of a dish off the shelf.
    ///
    /// Sufficiency is checked before the dish is touched, so a failed
    /// reservation leaves the dish unchanged and stock never goes
    /// negative. Returns the dish as it was before the decrement, which
    /// lets the caller snapshot the unit price.
    pub async fn reserve(&self, dish_id: i64, quantity: u32) -> Result<Dish, ServiceError> {
        let snapshot = match self.dishes.get_by_id(dish_id).await {
            Ok(dish) => dish,
            Err(StoreError::NotFound) => return Err(ServiceError::DishNotFound(dish_id)),
            Err(e) => return Err(e.into()),
        };
        if snapshot.quantity < quantity {
            return Err(ServiceError::InsufficientStock(dish_id));
        }

        let mut dish = snapshot.clone();
        dish.quantity -= quantity;
        dish.updated_at = Utc::now();
        self.dishes.update(&dish).await?;
        Ok(snapshot)
    }

    /// Put `quantity` portions back on the shelf.
    ///
    /// Best effort: a dish that no longer exists is skipped, since deleted
    /// dishes cannot be restocked.
    pub async fn release(&self, dish_id: i64, quantity: u32) -> Result<(), ServiceError> {
        let mut dish = match self.dishes.get_by_id(dish_id).await {
            Ok(dish) => dish,
            Err(StoreError::NotFound) => {
                debug!(dish_id, "releasing portions of a deleted dish, ignoring");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        dish.quantity += quantity;
        dish.updated_at = Utc::now();
        self.dishes.update(&dish).await?;
        Ok(())
    }
}
