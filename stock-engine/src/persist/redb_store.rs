//! redb-backed snapshot store
//!
//! # Tables
//!
//! | Table | Key | Value |
//! |-------|-----|-------|
//! | `products` | product id | JSON-serialized Product |
//! | `orders` | order id | JSON-serialized Order |
//!
//! Values use the same JSON wire format the models serialize to, so a
//! snapshot can be inspected or migrated with ordinary tooling.
//!
//! # Durability
//!
//! redb commits with immediate durability (copy-on-write with an atomic
//! root swap), so a crash between saves leaves the last committed snapshot
//! intact and the database file in a consistent state.

use super::{SnapshotStore, StoreResult};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Order, Product};
use std::path::Path;
use std::sync::Arc;

/// Table for product snapshots: key = product id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("products");

/// Table for order snapshots: key = order id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("orders");

/// Snapshot store backed by redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StoreResult<Self> {
        // Create both tables up front so reads never race table creation
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(ORDERS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Replace a table's contents with the given records in one commit.
    fn save_all<T: Serialize>(
        &self,
        table_def: TableDefinition<i64, &[u8]>,
        records: impl Iterator<Item = (i64, T)>,
    ) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            txn.delete_table(table_def)?;
            let mut table = txn.open_table(table_def)?;
            for (id, record) in records {
                let bytes = serde_json::to_vec(&record)?;
                table.insert(id, bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Read a full table; an empty table reads as "nothing saved yet".
    fn load_all<T: DeserializeOwned>(
        &self,
        table_def: TableDefinition<i64, &[u8]>,
    ) -> StoreResult<Option<Vec<T>>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(table_def)?;
        if table.is_empty()? {
            return Ok(None);
        }
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(Some(records))
    }
}

impl SnapshotStore for RedbStore {
    fn load_products(&self) -> StoreResult<Option<Vec<Product>>> {
        self.load_all(PRODUCTS_TABLE)
    }

    fn save_products(&self, products: &[Product]) -> StoreResult<()> {
        self.save_all(PRODUCTS_TABLE, products.iter().map(|p| (p.id, p)))
    }

    fn load_orders(&self) -> StoreResult<Option<Vec<Order>>> {
        self.load_all(ORDERS_TABLE)
    }

    fn save_orders(&self, orders: &[Order]) -> StoreResult<()> {
        self.save_all(ORDERS_TABLE, orders.iter().map(|o| (o.id, o)))
    }
}
