//! Order store - records, id assignment and the status state machine
//!
//! Holds order records and validates every status change against the
//! transition table on [`OrderStatus`]. Like the catalog, the store is
//! unsynchronized; the coordinator owns it behind its mutex.

use chrono::Utc;
use shared::error::{StockError, StockResult};
use shared::models::{Order, OrderItem, OrderStatus};
use shared::util::snowflake_id;
use std::collections::HashMap;

/// Order store
#[derive(Debug, Default)]
pub struct OrderStore {
    orders: HashMap<i64, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the store from persisted records (startup / refresh).
    pub fn from_records(records: Vec<Order>) -> Self {
        Self {
            orders: records.into_iter().map(|o| (o.id, o)).collect(),
        }
    }

    fn validate_items(items: &[OrderItem]) -> StockResult<()> {
        if items.is_empty() {
            return Err(StockError::validation("an order needs at least one item"));
        }
        for item in items {
            if item.quantity <= 0 {
                return Err(StockError::validation(format!(
                    "item quantity must be positive (product {})",
                    item.product_id
                )));
            }
        }
        Ok(())
    }

    /// Create a new order: fresh id, `created_at = now`, status forced to
    /// `new`.
    pub fn create(&mut self, items: Vec<OrderItem>, notes: Option<String>) -> StockResult<&Order> {
        Self::validate_items(&items)?;

        let mut id = snowflake_id();
        while self.orders.contains_key(&id) {
            id = snowflake_id();
        }

        let order = Order {
            id,
            items,
            status: OrderStatus::New,
            created_at: Utc::now(),
            notes,
        };
        Ok(self.orders.entry(id).or_insert(order))
    }

    /// Overwrite items and notes of an existing order, preserving its id
    /// and `created_at`. Only legal while the order is still `new`.
    pub fn replace(
        &mut self,
        id: i64,
        items: Vec<OrderItem>,
        notes: Option<String>,
    ) -> StockResult<&Order> {
        Self::validate_items(&items)?;
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| StockError::order_not_found(id))?;
        if order.status != OrderStatus::New {
            return Err(StockError::invalid_transition(order.status, OrderStatus::New));
        }
        order.items = items;
        order.notes = notes;
        Ok(order)
    }

    /// Apply a status transition, validated against the state machine.
    pub fn set_status(&mut self, id: i64, next: OrderStatus) -> StockResult<&Order> {
        let order = self
            .orders
            .get_mut(&id)
            .ok_or_else(|| StockError::order_not_found(id))?;
        if !order.status.can_transition(next) {
            return Err(StockError::invalid_transition(order.status, next));
        }
        order.status = next;
        Ok(order)
    }

    pub fn get(&self, id: i64) -> StockResult<&Order> {
        self.orders.get(&id).ok_or_else(|| StockError::order_not_found(id))
    }

    /// All orders, newest first. Ties on `created_at` break by id so every
    /// listing surface sees the same fixed total order.
    pub fn list(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        orders
    }

    /// Total quantity held per product by open (`new` / `accepted`) orders.
    /// The reconcile pass compares catalog counters against this.
    pub fn open_holdings(&self) -> HashMap<i64, i64> {
        let mut holdings = HashMap::new();
        for order in self.orders.values().filter(|o| o.status.is_open()) {
            for item in &order.items {
                *holdings.entry(item.product_id).or_insert(0) += item.quantity;
            }
        }
        holdings
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
