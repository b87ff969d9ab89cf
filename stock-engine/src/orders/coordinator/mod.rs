//! ReservationCoordinator - order lifecycle orchestration
//!
//! The only component permitted to call both the product catalog and the
//! order store. Every order-affecting action applies matched adjustments
//! to both so that an open order's items always correspond exactly to the
//! reservation held against its products, and stock never goes negative.
//!
//! # Operation Flow
//!
//! ```text
//! place_order(items)
//!     ├─ 1. Lock the engine state (catalog + orders as one resource)
//!     ├─ 2. Validate shape (at least one item, quantities > 0)
//!     ├─ 3. Check availability for every item (aggregated, no mutation)
//!     ├─ 4. Reserve stock (quantity -= n; reserved += n)
//!     ├─ 5. Create the order record (reservation rolled back on failure)
//!     ├─ 6. Save snapshots (bounded retry; memory stays authoritative)
//!     └─ 7. Broadcast event
//! ```
//!
//! The other operations follow the same shape: validate fully against both
//! stores first, mutate only after validation passes, and compensate when
//! a later step fails after an earlier one succeeded.

use crate::catalog::ProductCatalog;
use crate::config::EngineConfig;
use crate::events::StockEvent;
use crate::persist::{RedbStore, SnapshotStore, StoreError};
use parking_lot::Mutex;
use shared::error::{StockError, StockResult};
use shared::models::{
    ItemRequest, Order, OrderItem, OrderStatus, Product, ProductCreate, ProductUpdate,
};
use std::collections::HashMap;
use tokio::sync::broadcast;

use super::store::OrderStore;

/// Event broadcast channel capacity
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Reservation coordinator
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Embedding clients use it to detect engine restarts and reload fully.
pub struct ReservationCoordinator {
    state: Mutex<EngineState>,
    store: Box<dyn SnapshotStore>,
    event_tx: broadcast::Sender<StockEvent>,
    epoch: String,
    save_retries: u32,
}

/// Catalog and order book as one shared resource; only ever touched while
/// holding the coordinator's mutex.
struct EngineState {
    catalog: ProductCatalog,
    orders: OrderStore,
    /// Set when the last save failed; `flush` retries on demand
    dirty: bool,
}

impl std::fmt::Debug for ReservationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservationCoordinator")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl ReservationCoordinator {
    /// Open the engine with the redb snapshot store at the configured path.
    pub fn open(config: &EngineConfig) -> StockResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(StoreError::from)?;
        let store = RedbStore::open(config.db_path())?;
        Self::with_store(Box::new(store), config)
    }

    /// Build the engine on any snapshot store. Loads persisted state
    /// (absent data starts empty) and reconciles reservation counters
    /// against the open orders actually on file.
    pub fn with_store(store: Box<dyn SnapshotStore>, config: &EngineConfig) -> StockResult<Self> {
        let products = store.load_products()?.unwrap_or_default();
        let orders = store.load_orders()?.unwrap_or_default();

        let mut catalog = ProductCatalog::from_records(products);
        let order_store = OrderStore::from_records(orders);
        reconcile(&mut catalog, &order_store);

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            epoch = %epoch,
            products = catalog.len(),
            orders = order_store.len(),
            "reservation coordinator started"
        );

        Ok(Self {
            state: Mutex::new(EngineState {
                catalog,
                orders: order_store,
                dirty: false,
            }),
            store,
            event_tx,
            epoch,
            save_retries: config.save_retries,
        })
    }

    /// Unique instance id generated at startup.
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    /// Subscribe to engine event broadcasts.
    pub fn subscribe(&self) -> broadcast::Receiver<StockEvent> {
        self.event_tx.subscribe()
    }

    fn broadcast(&self, event: StockEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::debug!("event broadcast skipped: no active receivers");
        }
    }

    // ========== Order lifecycle ==========

    /// Place a new order: reserve stock for every item, then create the
    /// order record. All items are checked before anything is mutated; if
    /// record creation fails after the reservation succeeded, the
    /// reservation is released again before the error surfaces.
    pub fn place_order(
        &self,
        items: &[ItemRequest],
        notes: Option<String>,
    ) -> StockResult<Order> {
        let mut state = self.state.lock();

        validate_requests(items)?;
        state.catalog.check_available(items)?;

        // Snapshot display names while the products are known to exist
        let order_items = snapshot_items(&state.catalog, items)?;

        state.catalog.reserve(items)?;
        let order = match state.orders.create(order_items, notes) {
            Ok(order) => order.clone(),
            Err(err) => {
                // Compensate: the reservation must not outlive the failed order
                state.catalog.release(items);
                return Err(err);
            }
        };

        self.persist(&mut state);
        drop(state);
        tracing::info!(order_id = order.id, items = order.items.len(), "order placed");
        self.broadcast(StockEvent::OrderPlaced {
            order: order.clone(),
        });
        Ok(order)
    }

    /// Edit a still-`new` order in place: release the old reservation and
    /// apply the new one as a single pair under the lock, with the new
    /// items validated against net availability (stock on hand plus
    /// whatever this order already holds) before anything changes.
    pub fn edit_order(
        &self,
        order_id: i64,
        new_items: &[ItemRequest],
        notes: Option<String>,
    ) -> StockResult<Order> {
        let mut state = self.state.lock();

        validate_requests(new_items)?;

        let (old_requests, status) = {
            let order = state.orders.get(order_id)?;
            (order.requests(), order.status)
        };
        if status != OrderStatus::New {
            // Only freshly placed orders are editable in place
            return Err(StockError::invalid_transition(status, OrderStatus::New));
        }

        let credit = holdings_of(&old_requests);
        state.catalog.check_with_credit(new_items, &credit)?;

        let order_items = snapshot_items(&state.catalog, new_items)?;

        // Atomic swap: the check above guarantees the reserve cannot fall
        // short once the old hold is returned.
        state.catalog.release(&old_requests);
        if let Err(err) = state.catalog.reserve(new_items) {
            tracing::error!(order_id, error = %err, "re-reserve failed during edit, restoring previous hold");
            restore_hold(&mut state.catalog, &old_requests, order_id);
            return Err(err);
        }

        let order = match state.orders.replace(order_id, order_items, notes) {
            Ok(order) => order.clone(),
            Err(err) => {
                state.catalog.release(new_items);
                restore_hold(&mut state.catalog, &old_requests, order_id);
                return Err(err);
            }
        };

        self.persist(&mut state);
        drop(state);
        tracing::info!(order_id, items = order.items.len(), "order edited");
        self.broadcast(StockEvent::OrderEdited {
            order: order.clone(),
        });
        Ok(order)
    }

    /// Accept a `new` order. Status-only; the reservation is unchanged.
    pub fn accept_order(&self, order_id: i64) -> StockResult<Order> {
        let mut state = self.state.lock();
        let order = state.orders.set_status(order_id, OrderStatus::Accepted)?.clone();
        self.persist(&mut state);
        drop(state);
        tracing::info!(order_id, "order accepted");
        self.broadcast(StockEvent::OrderAccepted { order_id });
        Ok(order)
    }

    /// Cancel an open order: its reservation is released back to stock.
    pub fn cancel_order(&self, order_id: i64) -> StockResult<Order> {
        let mut state = self.state.lock();

        let (requests, status) = {
            let order = state.orders.get(order_id)?;
            (order.requests(), order.status)
        };
        if !status.can_transition(OrderStatus::Cancelled) {
            return Err(StockError::invalid_transition(status, OrderStatus::Cancelled));
        }

        // Transition validated above; release first, then flip the status
        state.catalog.release(&requests);
        let order = state.orders.set_status(order_id, OrderStatus::Cancelled)?.clone();

        self.persist(&mut state);
        drop(state);
        tracing::info!(order_id, "order cancelled");
        self.broadcast(StockEvent::OrderCancelled { order_id });
        Ok(order)
    }

    /// Complete an open order: the reservation is cleared without
    /// restoring stock, because the units left the warehouse.
    pub fn complete_order(&self, order_id: i64) -> StockResult<Order> {
        let mut state = self.state.lock();

        let (requests, status) = {
            let order = state.orders.get(order_id)?;
            (order.requests(), order.status)
        };
        if !status.can_transition(OrderStatus::Completed) {
            return Err(StockError::invalid_transition(status, OrderStatus::Completed));
        }

        state.catalog.clear_reservation(&requests);
        let order = state.orders.set_status(order_id, OrderStatus::Completed)?.clone();

        self.persist(&mut state);
        drop(state);
        tracing::info!(order_id, "order completed");
        self.broadcast(StockEvent::OrderCompleted { order_id });
        Ok(order)
    }

    // ========== Catalog administration ==========

    /// Add a product to the catalog.
    pub fn add_product(&self, create: ProductCreate) -> StockResult<Product> {
        let mut state = self.state.lock();
        let product = state.catalog.add(create)?.clone();
        self.persist(&mut state);
        drop(state);
        tracing::info!(product_id = product.id, name = %product.name, "product added");
        self.broadcast(StockEvent::ProductAdded {
            product: product.clone(),
        });
        Ok(product)
    }

    /// Edit a product's name, quantity or metadata. Direct quantity edits
    /// are administrative corrections and never touch `reserved`.
    pub fn edit_product(&self, product_id: i64, update: ProductUpdate) -> StockResult<Product> {
        let mut state = self.state.lock();
        let product = state.catalog.edit(product_id, update)?.clone();
        self.persist(&mut state);
        drop(state);
        tracing::info!(product_id, "product updated");
        self.broadcast(StockEvent::ProductUpdated {
            product: product.clone(),
        });
        Ok(product)
    }

    /// Remove a product. Rejected while open orders still hold a
    /// reservation against it.
    pub fn remove_product(&self, product_id: i64) -> StockResult<Product> {
        let mut state = self.state.lock();
        let product = state.catalog.remove(product_id)?;
        self.persist(&mut state);
        drop(state);
        tracing::info!(product_id, name = %product.name, "product removed");
        self.broadcast(StockEvent::ProductRemoved { product_id });
        Ok(product)
    }

    // ========== Queries ==========

    /// All products, sorted by id.
    pub fn products(&self) -> Vec<Product> {
        self.state.lock().catalog.list()
    }

    /// All orders, newest first.
    pub fn orders(&self) -> Vec<Order> {
        self.state.lock().orders.list()
    }

    pub fn get_product(&self, product_id: i64) -> StockResult<Product> {
        self.state
            .lock()
            .catalog
            .get(product_id)
            .cloned()
            .ok_or_else(|| StockError::product_not_found(product_id))
    }

    pub fn get_order(&self, order_id: i64) -> StockResult<Order> {
        self.state.lock().orders.get(order_id).cloned()
    }

    /// Units of a product currently eligible to be newly reserved.
    pub fn availability(&self, product_id: i64) -> StockResult<i64> {
        self.state.lock().catalog.availability(product_id)
    }

    // ========== Persistence ==========

    /// Save both snapshots, retrying up to the configured attempt count.
    /// A final failure is logged and flags the state dirty; the in-memory
    /// state stays authoritative until a later save or `flush` succeeds.
    fn persist(&self, state: &mut EngineState) {
        let products = state.catalog.list();
        let orders = state.orders.list();
        let attempts = self.save_retries.max(1);
        for attempt in 1..=attempts {
            match self.try_save(&products, &orders) {
                Ok(()) => {
                    state.dirty = false;
                    return;
                }
                Err(err) if attempt < attempts => {
                    tracing::warn!(attempt, error = %err, "snapshot save failed, retrying");
                }
                Err(err) => {
                    tracing::error!(error = %err, "snapshot save failed; serving from memory until a save succeeds");
                    state.dirty = true;
                }
            }
        }
    }

    fn try_save(&self, products: &[Product], orders: &[Order]) -> Result<(), StoreError> {
        self.store.save_products(products)?;
        self.store.save_orders(orders)?;
        Ok(())
    }

    /// Whether the last save failed and a flush is pending.
    pub fn needs_flush(&self) -> bool {
        self.state.lock().dirty
    }

    /// Retry a failed save on demand.
    pub fn flush(&self) -> StockResult<()> {
        let mut state = self.state.lock();
        if !state.dirty {
            return Ok(());
        }
        let products = state.catalog.list();
        let orders = state.orders.list();
        self.try_save(&products, &orders)?;
        state.dirty = false;
        Ok(())
    }

    /// Reload both snapshots from the store, replacing in-memory state.
    /// Absent saved data keeps the current state, mirroring startup.
    pub fn refresh(&self) -> StockResult<()> {
        let products = self.store.load_products()?;
        let orders = self.store.load_orders()?;

        let mut state = self.state.lock();
        if let Some(records) = products {
            state.catalog = ProductCatalog::from_records(records);
        }
        if let Some(records) = orders {
            state.orders = OrderStore::from_records(records);
        }
        let state = &mut *state;
        reconcile(&mut state.catalog, &state.orders);
        Ok(())
    }
}

/// Shape validation shared by place and edit: at least one item, every
/// quantity positive. Duplicate product lines are legal and aggregated by
/// the catalog.
fn validate_requests(items: &[ItemRequest]) -> StockResult<()> {
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

/// Turn requests into order items, snapshotting each product's current
/// display name. Line structure is preserved as submitted.
fn snapshot_items(catalog: &ProductCatalog, items: &[ItemRequest]) -> StockResult<Vec<OrderItem>> {
    items
        .iter()
        .map(|req| {
            catalog
                .get(req.product_id)
                .map(|product| OrderItem {
                    product_id: req.product_id,
                    product_name: product.name.clone(),
                    quantity: req.quantity,
                })
                .ok_or_else(|| StockError::product_not_found(req.product_id))
        })
        .collect()
}

/// Per-product totals of a request list.
fn holdings_of(requests: &[ItemRequest]) -> HashMap<i64, i64> {
    let mut totals = HashMap::new();
    for req in requests {
        *totals.entry(req.product_id).or_insert(0) += req.quantity;
    }
    totals
}

/// Re-apply a hold that was released during a failed edit. The units were
/// just returned to stock, so this cannot fall short; if it somehow does,
/// the drift is logged and the next reconcile repairs it.
fn restore_hold(catalog: &mut ProductCatalog, old_requests: &[ItemRequest], order_id: i64) {
    if let Err(err) = catalog.reserve(old_requests) {
        tracing::error!(order_id, error = %err, "failed to restore previous hold");
    }
}

/// Force catalog reservation counters to match the open orders on file.
/// Loaded snapshots may disagree (partial saves, hand-edited data); the
/// order book is the authority for what is held.
fn reconcile(catalog: &mut ProductCatalog, orders: &OrderStore) {
    let holdings = orders.open_holdings();
    let adjusted = catalog.reconcile(&holdings);
    if adjusted > 0 {
        tracing::warn!(adjusted, "reservation counters reconciled against open orders");
    }
}

#[cfg(test)]
mod tests;
