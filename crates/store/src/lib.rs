//! # Data Store Layer
//!
//! This module provides store traits and in-memory implementations for all
//! entities: dishes, orders, order lines. The traits are the seam between
//! the order processing core and whatever durable backend sits behind it;
//! the in-memory implementations back the single-process deployment and
//! the test suites.

use async_trait::async_trait;
use model::{Dish, Order, OrderLine, OrderStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// # StoreError
///
/// Error types that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No result found.
    #[error("Not found")]
    NotFound,
    /// Backend-specific failure.
    #[error("Storage error: {0}")]
    Internal(String),
}

/// # DishStore
///
/// Store interface for the dish catalogue and its stock counts.
///
/// All operations are async-capable and assumed durable once they return
/// success.
#[async_trait]
pub trait DishStore: Send + Sync {
    /// Get a dish by its id.
    async fn get_by_id(&self, id: i64) -> Result<Dish, StoreError>;

    /// Persist a new dish; the store assigns the id.
    async fn create(&self, dish: Dish) -> Result<Dish, StoreError>;

    /// Overwrite an existing dish.
    async fn update(&self, dish: &Dish) -> Result<(), StoreError>;

    /// Remove a dish.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// All dishes, in id order.
    async fn list_all(&self) -> Result<Vec<Dish>, StoreError>;

    /// Dishes whose name matches `name` exactly.
    async fn list_by_name(&self, name: &str) -> Result<Vec<Dish>, StoreError>;

    /// Dishes filtered by whether any portions are left in stock.
    async fn list_by_availability(&self, in_stock: bool) -> Result<Vec<Dish>, StoreError>;
}

/// # OrderStore
///
/// Store interface for orders. Orders are persisted without their lines;
/// lines live in the [`OrderLineStore`] keyed by order id.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Get an order by its id. The returned order carries no lines.
    async fn get_by_id(&self, id: i64) -> Result<Order, StoreError>;

    /// Persist a new order; the store assigns the id.
    async fn create(&self, order: Order) -> Result<Order, StoreError>;

    /// Overwrite an existing order.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;

    /// Remove an order.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// All orders, in id order.
    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    /// Orders placed by the given user.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError>;

    /// Orders currently in the given status.
    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError>;
}

/// # OrderLineStore
///
/// Store interface for order lines (the order↔dish association rows).
#[async_trait]
pub trait OrderLineStore: Send + Sync {
    /// Persist a new line; the store assigns the id.
    async fn create(&self, line: OrderLine) -> Result<OrderLine, StoreError>;

    /// Remove a line.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// All lines belonging to the given order.
    async fn list_by_order(&self, order_id: i64) -> Result<Vec<OrderLine>, StoreError>;

    /// All lines referencing the given dish, across all orders.
    async fn list_by_dish(&self, dish_id: i64) -> Result<Vec<OrderLine>, StoreError>;
}

/// In-memory implementation of [`DishStore`].
///
/// Rows live in a `RwLock`-guarded map; ids are handed out from an atomic
/// counter starting at 1.
#[derive(Debug)]
pub struct MemDishStore {
    rows: RwLock<HashMap<i64, Dish>>,
    next_id: AtomicI64,
}

impl MemDishStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemDishStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DishStore for MemDishStore {
    async fn get_by_id(&self, id: i64) -> Result<Dish, StoreError> {
        let rows = self.rows.read().await;
        rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, mut dish: Dish) -> Result<Dish, StoreError> {
        dish.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows.write().await;
        rows.insert(dish.id, dish.clone());
        Ok(dish)
    }

    async fn update(&self, dish: &Dish) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&dish.id) {
            Some(row) => {
                *row = dish.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Dish>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(rows.values().cloned(), |d| d.id))
    }

    async fn list_by_name(&self, name: &str) -> Result<Vec<Dish>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values().filter(|d| d.name == name).cloned(),
            |d| d.id,
        ))
    }

    async fn list_by_availability(&self, in_stock: bool) -> Result<Vec<Dish>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values()
                .filter(|d| (d.quantity > 0) == in_stock)
                .cloned(),
            |d| d.id,
        ))
    }
}

/// In-memory implementation of [`OrderStore`].
#[derive(Debug)]
pub struct MemOrderStore {
    rows: RwLock<HashMap<i64, Order>>,
    next_id: AtomicI64,
}

impl MemOrderStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemOrderStore {
    async fn get_by_id(&self, id: i64) -> Result<Order, StoreError> {
        let rows = self.rows.read().await;
        rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, mut order: Order) -> Result<Order, StoreError> {
        order.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // Lines are rows of the line store, not part of the order record.
        let mut persisted = order.clone();
        persisted.lines = Vec::new();
        let mut rows = self.rows.write().await;
        rows.insert(persisted.id, persisted);
        Ok(order)
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&order.id) {
            Some(row) => {
                let mut persisted = order.clone();
                persisted.lines = Vec::new();
                *row = persisted;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(rows.values().cloned(), |o| o.id))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values().filter(|o| o.user_id == user_id).cloned(),
            |o| o.id,
        ))
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values().filter(|o| o.status == status).cloned(),
            |o| o.id,
        ))
    }
}

/// In-memory implementation of [`OrderLineStore`].
#[derive(Debug)]
pub struct MemOrderLineStore {
    rows: RwLock<HashMap<i64, OrderLine>>,
    next_id: AtomicI64,
}

impl MemOrderLineStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemOrderLineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderLineStore for MemOrderLineStore {
    async fn create(&self, mut line: OrderLine) -> Result<OrderLine, StoreError> {
        line.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.rows.write().await;
        rows.insert(line.id, line.clone());
        Ok(line)
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }

    async fn list_by_order(&self, order_id: i64) -> Result<Vec<OrderLine>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values().filter(|l| l.order_id == order_id).cloned(),
            |l| l.id,
        ))
    }

    async fn list_by_dish(&self, dish_id: i64) -> Result<Vec<OrderLine>, StoreError> {
        let rows = self.rows.read().await;
        Ok(sorted_by_id(
            rows.values().filter(|l| l.dish_id == dish_id).cloned(),
            |l| l.id,
        ))
    }
}

/// HashMap iteration order is arbitrary; listings sort by id so results
/// are deterministic.
fn sorted_by_id<T>(items: impl Iterator<Item = T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    let mut out: Vec<T> = items.collect();
    out.sort_by_key(|item| id(item));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model::OrderStatus;
    use rust_decimal::Decimal;

    fn sample_dish(name: &str, quantity: u32) -> Dish {
        Dish {
            id: 0,
            name: name.to_string(),
            description: "test dish".to_string(),
            price: Decimal::new(1250, 2),
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_order(user_id: i64) -> Order {
        Order {
            id: 0,
            user_id,
            status: OrderStatus::Pending,
            special_requests: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            lines: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_dish_ids_are_assigned_sequentially() {
        let store = MemDishStore::new();
        let first = store.create(sample_dish("Borscht", 5)).await.unwrap();
        let second = store.create(sample_dish("Pelmeni", 3)).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_get_missing_dish_is_not_found() {
        let store = MemDishStore::new();
        assert!(matches!(
            store.get_by_id(42).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_overwrites_dish() {
        let store = MemDishStore::new();
        let mut dish = store.create(sample_dish("Borscht", 5)).await.unwrap();
        dish.quantity = 2;
        store.update(&dish).await.unwrap();
        assert_eq!(store.get_by_id(dish.id).await.unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_update_missing_dish_is_not_found() {
        let store = MemDishStore::new();
        let dish = sample_dish("Ghost", 1);
        assert!(matches!(
            store.update(&dish).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_by_name_matches_exactly() {
        let store = MemDishStore::new();
        store.create(sample_dish("Borscht", 5)).await.unwrap();
        store.create(sample_dish("Borscht", 1)).await.unwrap();
        store.create(sample_dish("Pelmeni", 3)).await.unwrap();

        let found = store.list_by_name("Borscht").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.list_by_name("Borsch").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_availability_splits_on_stock() {
        let store = MemDishStore::new();
        store.create(sample_dish("Borscht", 5)).await.unwrap();
        store.create(sample_dish("Pelmeni", 0)).await.unwrap();

        let available = store.list_by_availability(true).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name, "Borscht");

        let sold_out = store.list_by_availability(false).await.unwrap();
        assert_eq!(sold_out.len(), 1);
        assert_eq!(sold_out[0].name, "Pelmeni");
    }

    #[tokio::test]
    async fn test_orders_are_persisted_without_lines() {
        let store = MemOrderStore::new();
        let mut order = sample_order(1);
        order.lines.push(OrderLine {
            id: 0,
            order_id: 0,
            dish_id: 9,
            quantity: 1,
            price: Decimal::new(100, 0),
        });
        let created = store.create(order).await.unwrap();
        // Caller keeps its lines, the stored row does not.
        assert_eq!(created.lines.len(), 1);
        assert!(store.get_by_id(created.id).await.unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_user_and_status() {
        let store = MemOrderStore::new();
        let mut cancelled = sample_order(1);
        cancelled.status = OrderStatus::Cancelled;
        store.create(cancelled).await.unwrap();
        store.create(sample_order(1)).await.unwrap();
        store.create(sample_order(2)).await.unwrap();

        assert_eq!(store.list_by_user(1).await.unwrap().len(), 2);
        assert_eq!(store.list_by_user(3).await.unwrap().len(), 0);
        assert_eq!(
            store
                .list_by_status(OrderStatus::Pending)
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store
                .list_by_status(OrderStatus::Completed)
                .await
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn test_order_lines_listed_by_order_and_dish() {
        let store = MemOrderLineStore::new();
        for (order_id, dish_id) in [(1, 10), (1, 11), (2, 10)] {
            store
                .create(OrderLine {
                    id: 0,
                    order_id,
                    dish_id,
                    quantity: 1,
                    price: Decimal::new(500, 2),
                })
                .await
                .unwrap();
        }

        assert_eq!(store.list_by_order(1).await.unwrap().len(), 2);
        assert_eq!(store.list_by_order(3).await.unwrap().len(), 0);
        assert_eq!(store.list_by_dish(10).await.unwrap().len(), 2);
        assert_eq!(store.list_by_dish(12).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_deleted_line_disappears_from_listings() {
        let store = MemOrderLineStore::new();
        let line = store
            .create(OrderLine {
                id: 0,
                order_id: 1,
                dish_id: 10,
                quantity: 1,
                price: Decimal::new(500, 2),
            })
            .await
            .unwrap();
        store.delete(line.id).await.unwrap();
        assert!(store.list_by_order(1).await.unwrap().is_empty());
        assert!(matches!(
            store.delete(line.id).await,
            Err(StoreError::NotFound)
        ));
    }
}
