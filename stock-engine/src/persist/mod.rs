//! Snapshot persistence collaborator
//!
//! The engine treats persistence as an external collaborator behind
//! [`SnapshotStore`]: both snapshots are loaded at startup (and on explicit
//! refresh) and saved after every mutating operation. Absent saved data
//! means "start from an empty catalog and order book", never an error.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use shared::StockError;
use shared::models::{Order, Product};
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for StockError {
    fn from(err: StoreError) -> Self {
        StockError::io(err.to_string())
    }
}

/// Load/save contract for product and order snapshots.
///
/// `Ok(None)` from a load means nothing has been saved yet; the engine
/// falls back to its current (or empty) state.
pub trait SnapshotStore: Send + Sync {
    fn load_products(&self) -> StoreResult<Option<Vec<Product>>>;
    fn save_products(&self, products: &[Product]) -> StoreResult<()>;
    fn load_orders(&self) -> StoreResult<Option<Vec<Order>>>;
    fn save_orders(&self, orders: &[Order]) -> StoreResult<()>;
}
