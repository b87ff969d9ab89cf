use super::*;
use crate::persist::MemoryStore;
use std::sync::atomic::{AtomicU32, Ordering};

fn create_test_engine() -> ReservationCoordinator {
    ReservationCoordinator::with_store(Box::new(MemoryStore::new()), &EngineConfig::default())
        .unwrap()
}

fn seed_product(engine: &ReservationCoordinator, name: &str, quantity: i64) -> i64 {
    engine
        .add_product(ProductCreate::new(name, quantity))
        .unwrap()
        .id
}

fn req(product_id: i64, quantity: i64) -> ItemRequest {
    ItemRequest::new(product_id, quantity)
}

fn assert_stock(engine: &ReservationCoordinator, product_id: i64, quantity: i64, reserved: i64) {
    let product = engine.get_product(product_id).unwrap();
    assert_eq!(
        (product.quantity, product.reserved),
        (quantity, reserved),
        "unexpected stock for {}",
        product.name
    );
}

/// Store whose next N saves fail, for exercising the retry/flush path.
struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
        }
    }

    fn fail_next(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl crate::persist::SnapshotStore for FlakyStore {
    fn load_products(&self) -> crate::persist::StoreResult<Option<Vec<Product>>> {
        self.inner.load_products()
    }

    fn save_products(&self, products: &[Product]) -> crate::persist::StoreResult<()> {
        if self.fail_next() {
            return Err(StoreError::Io(std::io::Error::other("disk offline")));
        }
        self.inner.save_products(products)
    }

    fn load_orders(&self) -> crate::persist::StoreResult<Option<Vec<Order>>> {
        self.inner.load_orders()
    }

    fn save_orders(&self, orders: &[Order]) -> crate::persist::StoreResult<()> {
        if self.fail_next() {
            return Err(StoreError::Io(std::io::Error::other("disk offline")));
        }
        self.inner.save_orders(orders)
    }
}
