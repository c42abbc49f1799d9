//! Business logic layer for restaurant order processing.
//!
//! This crate holds the order/inventory consistency core and the
//! [`OrderProcessingService`] facade that transports call into:
//! - [`Inventory`] — stock reservation and release for order lines;
//! - [`OrderStatus::stock_effect`](model::OrderStatus::stock_effect) —
//!   the lifecycle rules for which transitions move stock;
//! - [`BatchProcessor`] — background advancement of outstanding orders.
//!
//! # Features
//! - Stock sufficiency checked before any dish is mutated; stock counts
//!   never go negative.
//! - Dependency injection through the store traits for testability.
//! - Async-first API suitable for scalable web applications.
//! - Well-typed error handling via [`ServiceError`].

mod batch;
mod inventory;

pub use batch::BatchProcessor;
pub use inventory::Inventory;

use chrono::Utc;
use model::{
    CreateDishRequest, CreateOrderRequest, Dish, Order, OrderLine, OrderStatus, StockEffect,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use store::{DishStore, OrderLineStore, OrderStore, StoreError};
use thiserror::Error;
use tracing::{instrument, warn};

/// The main error type for all operations in [`OrderProcessingService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The requested status is not one of the four known values.
    #[error("Status '{0}' is not valid.")]
    InvalidStatus(String),
    /// The request is otherwise malformed.
    #[error("Invalid request: {0}")]
    Validation(String),
    /// A dish referenced by the request does not exist.
    #[error("Dish with id '{0}' does not exist.")]
    DishNotFound(i64),
    /// Reservation failed: the dish has fewer portions left than requested.
    #[error("Dish with id '{0}' does not have enough quantity in stock.")]
    InsufficientStock(i64),
    /// An order referenced by the request does not exist.
    #[error("Order with id '{0}' does not exist.")]
    OrderNotFound(i64),
    /// Empty-result error; a missing entity and an empty result set are
    /// surfaced the same way.
    #[error("{0}")]
    NotFound(String),
    /// A store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// Some unexpected or unhandled error.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Orchestrates the stores, the reservation engine and the batch processor
/// behind the operations a transport layer would call.
///
/// Store implementations are injected through the trait parameters, which
/// keeps the core testable against the in-memory stores.
pub struct OrderProcessingService<D, O, L> {
    dishes: Arc<D>,
    orders: Arc<O>,
    lines: Arc<L>,
    inventory: Inventory<D>,
    batch: BatchProcessor<O>,
}

impl<D, O, L> OrderProcessingService<D, O, L>
where
    D: DishStore + 'static,
    O: OrderStore + 'static,
    L: OrderLineStore + 'static,
{
    /// Constructs a new [`OrderProcessingService`] from the provided
    /// stores and the cook-time setting for batch processing.
    pub fn new(
        dishes: Arc<D>,
        orders: Arc<O>,
        lines: Arc<L>,
        cook_time_per_line: Duration,
    ) -> Self {
        Self {
            inventory: Inventory::new(Arc::clone(&dishes)),
            batch: BatchProcessor::new(Arc::clone(&orders), cook_time_per_line),
            dishes,
            orders,
            lines,
        }
    }

    /// Create an order and reserve stock for every line.
    ///
    /// The requested status must be a known value but is not honored: new
    /// orders always start out Pending. If any line's dish is missing or
    /// short on stock, the half-created order is deleted and the error
    /// names the offending dish; reservations already made for earlier
    /// lines are left standing.
    #[instrument(skip(self, request), fields(user_id = request.user_id))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, ServiceError> {
        request
            .status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::InvalidStatus(e.0))?;
        if request.lines.iter().any(|line| line.quantity == 0) {
            return Err(ServiceError::Validation(
                "line quantity must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let mut order = self
            .orders
            .create(Order {
                id: 0,
                user_id: request.user_id,
                status: OrderStatus::Pending,
                special_requests: request.special_requests,
                created_at: now,
                updated_at: now,
                lines: Vec::new(),
            })
            .await?;

        for line in &request.lines {
            let dish = match self.inventory.reserve(line.dish_id, line.quantity).await {
                Ok(dish) => dish,
                Err(e) => {
                    // Deletion is attempted; the reservation failure is
                    // what the caller sees either way.
                    if let Err(del) = self.orders.delete(order.id).await {
                        warn!(order_id = order.id, error = %del, "failed to delete half-created order");
                    }
                    return Err(e);
                }
            };
            let stored = self
                .lines
                .create(OrderLine {
                    id: 0,
                    order_id: order.id,
                    dish_id: dish.id,
                    quantity: line.quantity,
                    price: dish.price * Decimal::from(line.quantity),
                })
                .await?;
            order.lines.push(stored);
        }

        Ok(order)
    }

    /// Move an order to `status`, applying the stock effect of the
    /// transition first (see [`OrderStatus::stock_effect`]).
    ///
    /// If a re-reservation fails the whole update fails and the order
    /// keeps its current status; reservations already made for earlier
    /// lines are left standing. After the side effects, status and
    /// updated-at are written unconditionally.
    #[instrument(skip(self))]
    pub async fn update_order_status(&self, id: i64, status: &str) -> Result<Order, ServiceError> {
        let next = status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::InvalidStatus(e.0))?;

        let mut order = match self.orders.get_by_id(id).await {
            Ok(order) => order,
            Err(StoreError::NotFound) => return Err(ServiceError::OrderNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        order.lines = self.lines.list_by_order(id).await.unwrap_or_default();

        match order.status.stock_effect(next) {
            StockEffect::Release => {
                for line in &order.lines {
                    self.inventory.release(line.dish_id, line.quantity).await?;
                }
            }
            StockEffect::Reserve => {
                for line in &order.lines {
                    self.inventory.reserve(line.dish_id, line.quantity).await?;
                }
            }
            StockEffect::None => {}
        }

        order.status = next;
        order.updated_at = Utc::now();
        self.orders.update(&order).await?;
        Ok(order)
    }

    /// Retrieves an order with its lines.
    #[instrument(skip(self))]
    pub async fn get_order_by_id(&self, id: i64) -> Result<Order, ServiceError> {
        let mut order = match self.orders.get_by_id(id).await {
            Ok(order) => order,
            Err(StoreError::NotFound) => return Err(ServiceError::OrderNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        order.lines = self.lines.list_by_order(id).await.unwrap_or_default();
        Ok(order)
    }

    /// All orders with their lines; an empty store is an error, not an
    /// empty list.
    pub async fn get_all_orders(&self) -> Result<Vec<Order>, ServiceError> {
        let orders = self.orders.list_all().await?;
        if orders.is_empty() {
            return Err(ServiceError::NotFound("No orders exist.".to_string()));
        }
        self.populate_lines(orders).await
    }

    /// Orders placed by one user; a user with no orders is an error.
    #[instrument(skip(self))]
    pub async fn get_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, ServiceError> {
        let orders = self.orders.list_by_user(user_id).await?;
        if orders.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No orders exist for user with id '{user_id}'."
            )));
        }
        self.populate_lines(orders).await
    }

    /// Orders in one status; a status with no matches is an error.
    #[instrument(skip(self))]
    pub async fn get_orders_by_status(&self, status: &str) -> Result<Vec<Order>, ServiceError> {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ServiceError::InvalidStatus(e.0))?;
        let orders = self.orders.list_by_status(status).await?;
        if orders.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No orders exist with status '{status}'."
            )));
        }
        self.populate_lines(orders).await
    }

    /// Kick off batch processing for every Pending or Processing order.
    ///
    /// Returns as soon as one advancement task per order is spawned, with
    /// the number of orders dispatched; progress is observed through order
    /// status. Errors with a nothing-to-process message when no order is
    /// eligible.
    #[instrument(skip(self))]
    pub async fn process_orders(&self) -> Result<usize, ServiceError> {
        let mut orders = self.orders.list_by_status(OrderStatus::Pending).await?;
        orders.extend(self.orders.list_by_status(OrderStatus::Processing).await?);
        if orders.is_empty() {
            return Err(ServiceError::NotFound(
                "All orders are already processed.".to_string(),
            ));
        }

        let orders = self.populate_lines(orders).await?;
        let count = orders.len();
        for order in orders {
            self.batch.spawn_advance(order);
        }
        Ok(count)
    }

    /// Add a dish to the catalogue.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_dish(&self, request: CreateDishRequest) -> Result<Dish, ServiceError> {
        let now = Utc::now();
        let dish = self
            .dishes
            .create(Dish {
                id: 0,
                name: request.name,
                description: request.description,
                price: request.price,
                quantity: request.quantity,
                created_at: now,
                updated_at: now,
            })
            .await?;
        Ok(dish)
    }

    /// Overwrite a dish's fields, including a direct stock edit.
    #[instrument(skip(self, request))]
    pub async fn update_dish(
        &self,
        id: i64,
        request: CreateDishRequest,
    ) -> Result<Dish, ServiceError> {
        let mut dish = match self.dishes.get_by_id(id).await {
            Ok(dish) => dish,
            Err(StoreError::NotFound) => return Err(ServiceError::DishNotFound(id)),
            Err(e) => return Err(e.into()),
        };
        dish.name = request.name;
        dish.description = request.description;
        dish.price = request.price;
        dish.quantity = request.quantity;
        dish.updated_at = Utc::now();
        self.dishes.update(&dish).await?;
        Ok(dish)
    }

    /// Delete a dish, cascading over the order lines that reference it:
    /// the lines go first, then the dish itself.
    #[instrument(skip(self))]
    pub async fn delete_dish(&self, id: i64) -> Result<(), ServiceError> {
        match self.dishes.get_by_id(id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(ServiceError::DishNotFound(id)),
            Err(e) => return Err(e.into()),
        }

        let lines = self.lines.list_by_dish(id).await.unwrap_or_default();
        for line in lines {
            self.lines.delete(line.id).await?;
        }

        self.dishes.delete(id).await?;
        Ok(())
    }

    /// Retrieves a dish by its id.
    #[instrument(skip(self))]
    pub async fn get_dish_by_id(&self, id: i64) -> Result<Dish, ServiceError> {
        match self.dishes.get_by_id(id).await {
            Ok(dish) => Ok(dish),
            Err(StoreError::NotFound) => Err(ServiceError::DishNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// The whole catalogue; may be empty.
    pub async fn get_all_dishes(&self) -> Result<Vec<Dish>, ServiceError> {
        Ok(self.dishes.list_all().await?)
    }

    /// Dishes with exactly the given name; no matches is an error.
    #[instrument(skip(self))]
    pub async fn get_dishes_by_name(&self, name: &str) -> Result<Vec<Dish>, ServiceError> {
        let dishes = self.dishes.list_by_name(name).await?;
        if dishes.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No dishes with name '{name}' exist."
            )));
        }
        Ok(dishes)
    }

    /// The menu filtered by availability; no matches is an error.
    #[instrument(skip(self))]
    pub async fn get_dishes_by_availability(
        &self,
        available: bool,
    ) -> Result<Vec<Dish>, ServiceError> {
        let dishes = self.dishes.list_by_availability(available).await?;
        if dishes.is_empty() {
            return Err(ServiceError::NotFound(format!(
                "No dishes with availability '{available}' exist."
            )));
        }
        Ok(dishes)
    }

    /// Attach each order's lines for display. An order without lines is a
    /// legitimate state, so lookup failures degrade to an empty list.
    async fn populate_lines(&self, mut orders: Vec<Order>) -> Result<Vec<Order>, ServiceError> {
        for order in &mut orders {
            order.lines = self
                .lines
                .list_by_order(order.id)
                .await
                .unwrap_or_default();
        }
        Ok(orders)
    }
}
