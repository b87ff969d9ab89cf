//! Product catalog - stock and reservation accounting
//!
//! Holds the product records and exposes the only operations permitted to
//! change `quantity` and `reserved`. `quantity` is the live sellable
//! counter: [`ProductCatalog::reserve`] debits it immediately, so
//! "available to reserve" is always plain `quantity` on every code path.
//!
//! The catalog carries no lock of its own; the reservation coordinator
//! owns it behind a single mutex together with the order store.

use shared::error::{Shortage, StockError, StockResult};
use shared::models::{ItemRequest, Product, ProductCreate, ProductUpdate};
use shared::util::snowflake_id;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Product catalog
#[derive(Debug, Default)]
pub struct ProductCatalog {
    products: HashMap<i64, Product>,
}

impl ProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the catalog from persisted records (startup / refresh).
    pub fn from_records(records: Vec<Product>) -> Self {
        Self {
            products: records.into_iter().map(|p| (p.id, p)).collect(),
        }
    }

    // ========== Administration ==========

    /// Insert a new product with `reserved = 0` and a freshly assigned id.
    pub fn add(&mut self, create: ProductCreate) -> StockResult<&Product> {
        let name = create.name.trim();
        if name.is_empty() {
            return Err(StockError::validation("product name must not be empty"));
        }
        if create.quantity < 0 {
            return Err(StockError::validation(
                "product quantity must not be negative",
            ));
        }

        let mut id = snowflake_id();
        while self.products.contains_key(&id) {
            id = snowflake_id();
        }

        let product = Product {
            id,
            name: name.to_string(),
            quantity: create.quantity,
            reserved: 0,
            image: create.image,
            description: create.description,
        };
        Ok(self.products.entry(id).or_insert(product))
    }

    /// Update name, quantity or metadata of an existing product.
    ///
    /// Editing `quantity` is an administrative restock/correction and never
    /// touches `reserved`.
    pub fn edit(&mut self, id: i64, update: ProductUpdate) -> StockResult<&Product> {
        if let Some(name) = &update.name
            && name.trim().is_empty()
        {
            return Err(StockError::validation("product name must not be empty"));
        }
        if let Some(quantity) = update.quantity
            && quantity < 0
        {
            return Err(StockError::validation(
                "product quantity must not be negative",
            ));
        }

        let product = self
            .products
            .get_mut(&id)
            .ok_or_else(|| StockError::product_not_found(id))?;
        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(quantity) = update.quantity {
            product.quantity = quantity;
        }
        if let Some(image) = update.image {
            product.image = Some(image);
        }
        if let Some(description) = update.description {
            product.description = Some(description);
        }
        Ok(product)
    }

    /// Remove a product. Rejected while any open order still holds a
    /// reservation against it; those orders must be cancelled or completed
    /// first.
    pub fn remove(&mut self, id: i64) -> StockResult<Product> {
        match self.products.entry(id) {
            Entry::Occupied(entry) if entry.get().reserved > 0 => Err(StockError::conflict(format!(
                "product {} ({}) has {} reserved unit(s) held by open orders",
                id,
                entry.get().name,
                entry.get().reserved
            ))),
            Entry::Occupied(entry) => Ok(entry.remove()),
            Entry::Vacant(_) => Err(StockError::product_not_found(id)),
        }
    }

    // ========== Reservation accounting ==========

    /// Sum requested quantities per product, preserving first-seen order,
    /// so a batch naming the same product twice is checked and applied
    /// against the combined figure.
    pub fn aggregate(items: &[ItemRequest]) -> Vec<ItemRequest> {
        let mut totals: Vec<ItemRequest> = Vec::new();
        for item in items {
            match totals.iter_mut().find(|t| t.product_id == item.product_id) {
                Some(total) => total.quantity += item.quantity,
                None => totals.push(*item),
            }
        }
        totals
    }

    /// Availability check without mutation.
    pub fn check_available(&self, items: &[ItemRequest]) -> StockResult<()> {
        self.check_with_credit(items, &HashMap::new())
    }

    /// Availability check where `credit` lists per-product quantities about
    /// to be released. Order editing checks its new items as if the old
    /// reservation had already been returned to stock.
    pub fn check_with_credit(
        &self,
        items: &[ItemRequest],
        credit: &HashMap<i64, i64>,
    ) -> StockResult<()> {
        let mut shortages = Vec::new();
        for req in Self::aggregate(items) {
            let product = self
                .products
                .get(&req.product_id)
                .ok_or_else(|| StockError::product_not_found(req.product_id))?;
            let available = product.quantity + credit.get(&req.product_id).copied().unwrap_or(0);
            if req.quantity > available {
                shortages.push(Shortage {
                    product_id: req.product_id,
                    product_name: product.name.clone(),
                    requested: req.quantity,
                    available,
                });
            }
        }
        if shortages.is_empty() {
            Ok(())
        } else {
            Err(StockError::insufficient(shortages))
        }
    }

    /// All-or-nothing reservation: every item is checked before the first
    /// product is touched; on success `quantity -= qty; reserved += qty`
    /// for every item.
    pub fn reserve(&mut self, items: &[ItemRequest]) -> StockResult<()> {
        self.check_available(items)?;
        for req in Self::aggregate(items) {
            if let Some(product) = self.products.get_mut(&req.product_id) {
                product.quantity -= req.quantity;
                product.reserved += req.quantity;
            }
        }
        Ok(())
    }

    /// Return held stock: `quantity += qty; reserved = max(0, reserved - qty)`.
    ///
    /// Never fails: over-release clamps at zero and unknown products are
    /// skipped, so cancellation and compensation paths cannot error here.
    pub fn release(&mut self, items: &[ItemRequest]) {
        for req in Self::aggregate(items) {
            if let Some(product) = self.products.get_mut(&req.product_id) {
                product.quantity += req.quantity;
                product.reserved = (product.reserved - req.quantity).max(0);
            }
        }
    }

    /// Drop the reservation without restoring stock; the units were
    /// consumed by fulfillment.
    pub fn clear_reservation(&mut self, items: &[ItemRequest]) {
        for req in Self::aggregate(items) {
            if let Some(product) = self.products.get_mut(&req.product_id) {
                product.reserved = (product.reserved - req.quantity).max(0);
            }
        }
    }

    /// Units of a product currently eligible to be newly reserved.
    pub fn availability(&self, id: i64) -> StockResult<i64> {
        self.products
            .get(&id)
            .map(Product::available)
            .ok_or_else(|| StockError::product_not_found(id))
    }

    /// Force every product's `reserved` to the quantity open orders hold
    /// against it and clamp stock at zero. Returns how many products were
    /// adjusted. Used after loading snapshots that may disagree.
    pub fn reconcile(&mut self, open_holdings: &HashMap<i64, i64>) -> usize {
        let mut adjusted = 0;
        for product in self.products.values_mut() {
            let expected = open_holdings.get(&product.id).copied().unwrap_or(0);
            if product.reserved != expected {
                tracing::warn!(
                    product_id = product.id,
                    name = %product.name,
                    stored = product.reserved,
                    expected,
                    "reserved counter disagrees with open orders"
                );
                product.reserved = expected;
                adjusted += 1;
            }
            if product.quantity < 0 {
                tracing::warn!(
                    product_id = product.id,
                    name = %product.name,
                    quantity = product.quantity,
                    "negative stock clamped to zero"
                );
                product.quantity = 0;
                adjusted += 1;
            }
        }
        adjusted
    }

    // ========== Queries ==========

    pub fn get(&self, id: i64) -> Option<&Product> {
        self.products.get(&id)
    }

    /// All products sorted by id (snowflake ids sort by creation time).
    pub fn list(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self.products.values().cloned().collect();
        products.sort_by_key(|p| p.id);
        products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(name: &str, quantity: i64) -> (ProductCatalog, i64) {
        let mut catalog = ProductCatalog::new();
        let id = catalog
            .add(ProductCreate::new(name, quantity))
            .unwrap()
            .id;
        (catalog, id)
    }

    #[test]
    fn test_add_assigns_id_and_zero_reserved() {
        let (catalog, id) = catalog_with("Laptop", 10);
        let product = catalog.get(id).unwrap();
        assert_eq!(product.name, "Laptop");
        assert_eq!(product.quantity, 10);
        assert_eq!(product.reserved, 0);
    }

    #[test]
    fn test_add_rejects_empty_name_and_negative_quantity() {
        let mut catalog = ProductCatalog::new();
        assert!(matches!(
            catalog.add(ProductCreate::new("   ", 5)),
            Err(StockError::Validation(_))
        ));
        assert!(matches!(
            catalog.add(ProductCreate::new("Monitor", -1)),
            Err(StockError::Validation(_))
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_edit_quantity_does_not_touch_reserved() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 4)]).unwrap();

        let update = ProductUpdate {
            quantity: Some(20),
            ..Default::default()
        };
        let product = catalog.edit(id, update).unwrap();
        assert_eq!(product.quantity, 20);
        assert_eq!(product.reserved, 4);
    }

    #[test]
    fn test_edit_unknown_product() {
        let mut catalog = ProductCatalog::new();
        assert!(matches!(
            catalog.edit(99, ProductUpdate::default()),
            Err(StockError::NotFound { .. })
        ));
    }

    #[test]
    fn test_remove_blocked_while_reserved() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 1)]).unwrap();

        assert!(matches!(
            catalog.remove(id),
            Err(StockError::Conflict(_))
        ));
        assert!(catalog.get(id).is_some());

        catalog.release(&[ItemRequest::new(id, 1)]);
        assert!(catalog.remove(id).is_ok());
        assert!(catalog.get(id).is_none());
    }

    #[test]
    fn test_reserve_debits_quantity_immediately() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 3)]).unwrap();

        let product = catalog.get(id).unwrap();
        assert_eq!(product.quantity, 7);
        assert_eq!(product.reserved, 3);
        assert_eq!(catalog.availability(id).unwrap(), 7);
    }

    #[test]
    fn test_reserve_is_all_or_nothing() {
        let mut catalog = ProductCatalog::new();
        let a = catalog.add(ProductCreate::new("Laptop", 10)).unwrap().id;
        let b = catalog.add(ProductCreate::new("Monitor", 2)).unwrap().id;

        let err = catalog
            .reserve(&[ItemRequest::new(a, 5), ItemRequest::new(b, 3)])
            .unwrap_err();
        match err {
            StockError::InsufficientStock { shortages } => {
                assert_eq!(shortages.len(), 1);
                assert_eq!(shortages[0].product_id, b);
                assert_eq!(shortages[0].requested, 3);
                assert_eq!(shortages[0].available, 2);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }

        // neither product was touched
        assert_eq!(catalog.get(a).unwrap().quantity, 10);
        assert_eq!(catalog.get(b).unwrap().reserved, 0);
    }

    #[test]
    fn test_reserve_aggregates_duplicate_lines() {
        let (mut catalog, id) = catalog_with("Laptop", 5);

        // two lines of 3 add up to 6 > 5 and must fail together
        let err = catalog
            .reserve(&[ItemRequest::new(id, 3), ItemRequest::new(id, 3)])
            .unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
        assert_eq!(catalog.get(id).unwrap().quantity, 5);

        catalog
            .reserve(&[ItemRequest::new(id, 2), ItemRequest::new(id, 3)])
            .unwrap();
        let product = catalog.get(id).unwrap();
        assert_eq!(product.quantity, 0);
        assert_eq!(product.reserved, 5);
    }

    #[test]
    fn test_reserve_unknown_product() {
        let mut catalog = ProductCatalog::new();
        assert!(matches!(
            catalog.reserve(&[ItemRequest::new(1, 1)]),
            Err(StockError::NotFound { .. })
        ));
    }

    #[test]
    fn test_release_restores_stock_and_clamps() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 4)]).unwrap();

        catalog.release(&[ItemRequest::new(id, 4)]);
        let product = catalog.get(id).unwrap();
        assert_eq!(product.quantity, 10);
        assert_eq!(product.reserved, 0);

        // releasing again is safe: stock comes back but reserved stays at zero
        catalog.release(&[ItemRequest::new(id, 4)]);
        let product = catalog.get(id).unwrap();
        assert_eq!(product.quantity, 14);
        assert_eq!(product.reserved, 0);
    }

    #[test]
    fn test_release_skips_unknown_products() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.release(&[ItemRequest::new(9999, 2), ItemRequest::new(id, 1)]);
        assert_eq!(catalog.get(id).unwrap().quantity, 11);
    }

    #[test]
    fn test_clear_reservation_consumes_stock() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 3)]).unwrap();

        catalog.clear_reservation(&[ItemRequest::new(id, 3)]);
        let product = catalog.get(id).unwrap();
        assert_eq!(product.quantity, 7);
        assert_eq!(product.reserved, 0);
    }

    #[test]
    fn test_check_with_credit_nets_out_old_hold() {
        let (mut catalog, id) = catalog_with("Laptop", 10);
        catalog.reserve(&[ItemRequest::new(id, 3)]).unwrap();

        // 7 on hand + 3 held by the order being edited = 10 available
        let credit = HashMap::from([(id, 3)]);
        assert!(catalog
            .check_with_credit(&[ItemRequest::new(id, 10)], &credit)
            .is_ok());
        let err = catalog
            .check_with_credit(&[ItemRequest::new(id, 11)], &credit)
            .unwrap_err();
        match err {
            StockError::InsufficientStock { shortages } => {
                assert_eq!(shortages[0].available, 10);
                assert_eq!(shortages[0].requested, 11);
            }
            other => panic!("expected InsufficientStock, got {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_repairs_drifted_counters() {
        let mut catalog = ProductCatalog::from_records(vec![
            Product {
                id: 1,
                name: "Laptop".to_string(),
                quantity: 7,
                reserved: 5,
                image: None,
                description: None,
            },
            Product {
                id: 2,
                name: "Monitor".to_string(),
                quantity: -2,
                reserved: 0,
                image: None,
                description: None,
            },
        ]);

        let holdings = HashMap::from([(1, 3)]);
        let adjusted = catalog.reconcile(&holdings);
        assert_eq!(adjusted, 2);
        assert_eq!(catalog.get(1).unwrap().reserved, 3);
        assert_eq!(catalog.get(2).unwrap().quantity, 0);
    }

    #[test]
    fn test_list_sorted_by_id() {
        let mut catalog = ProductCatalog::new();
        for name in ["A", "B", "C"] {
            catalog.add(ProductCreate::new(name, 1)).unwrap();
        }
        let listed = catalog.list();
        assert_eq!(listed.len(), 3);
        assert!(listed.windows(2).all(|w| w[0].id < w[1].id));
    }
}
