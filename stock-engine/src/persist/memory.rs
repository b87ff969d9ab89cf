//! In-memory snapshot store
//!
//! Backs tests and ephemeral runs; nothing survives the process.

use super::{SnapshotStore, StoreResult};
use parking_lot::Mutex;
use shared::models::{Order, Product};

/// Snapshot store that keeps the last saved snapshots in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: Mutex<Option<Vec<Product>>>,
    orders: Mutex<Option<Vec<Order>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed with saved snapshots, as if a previous run had persisted
    /// them. Used by startup-path tests.
    pub fn seeded(products: Vec<Product>, orders: Vec<Order>) -> Self {
        Self {
            products: Mutex::new(Some(products)),
            orders: Mutex::new(Some(orders)),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn load_products(&self) -> StoreResult<Option<Vec<Product>>> {
        Ok(self.products.lock().clone())
    }

    fn save_products(&self, products: &[Product]) -> StoreResult<()> {
        *self.products.lock() = Some(products.to_vec());
        Ok(())
    }

    fn load_orders(&self) -> StoreResult<Option<Vec<Order>>> {
        Ok(self.orders.lock().clone())
    }

    fn save_orders(&self, orders: &[Order]) -> StoreResult<()> {
        *self.orders.lock() = Some(orders.to_vec());
        Ok(())
    }
}
