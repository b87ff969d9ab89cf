//! Unified error taxonomy for the Stockroom engine
//!
//! Every rejection carries enough detail for a caller to tell the user
//! *which* product or status caused it, not a generic failure. All
//! variants except [`StockError::Io`] guarantee that no state was mutated.

use crate::models::OrderStatus;
use serde::Serialize;
use thiserror::Error;

/// One failing line of a reservation request: how much was asked for and
/// how much was actually available at check time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortage {
    pub product_id: i64,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

fn shortage_summary(shortages: &[Shortage]) -> String {
    shortages
        .iter()
        .map(|s| {
            format!(
                "{} (id {}): requested {}, available {}",
                s.product_name, s.product_id, s.requested, s.available
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Engine error type
#[derive(Debug, Error)]
pub enum StockError {
    /// Bad input shape or range; surfaced before any mutation is attempted
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown id
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: i64 },

    /// Business-rule rejection; lists every product that fell short
    #[error("insufficient stock: {}", shortage_summary(.shortages))]
    InsufficientStock { shortages: Vec<Shortage> },

    /// Illegal order status change
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Operation blocked by related state (e.g. removal of a product an
    /// open order still references)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence failure; in-memory state remains the source of truth
    #[error("persistence error: {0}")]
    Io(String),
}

impl StockError {
    // ========== Convenient constructors ==========

    /// Create a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a NotFound error for a product id
    pub fn product_not_found(id: i64) -> Self {
        Self::NotFound {
            resource: "product",
            id,
        }
    }

    /// Create a NotFound error for an order id
    pub fn order_not_found(id: i64) -> Self {
        Self::NotFound {
            resource: "order",
            id,
        }
    }

    /// Create an InsufficientStock error
    pub fn insufficient(shortages: Vec<Shortage>) -> Self {
        Self::InsufficientStock { shortages }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(from: OrderStatus, to: OrderStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Create a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an Io error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }
}

/// Result type for engine operations
pub type StockResult<T> = Result<T, StockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StockError::product_not_found(42);
        assert_eq!(format!("{}", err), "product not found: 42");

        let err = StockError::order_not_found(7);
        assert_eq!(format!("{}", err), "order not found: 7");
    }

    #[test]
    fn test_insufficient_stock_names_every_failing_product() {
        let err = StockError::insufficient(vec![
            Shortage {
                product_id: 1,
                product_name: "Laptop".to_string(),
                requested: 8,
                available: 7,
            },
            Shortage {
                product_id: 2,
                product_name: "Monitor".to_string(),
                requested: 3,
                available: 0,
            },
        ]);
        let msg = format!("{}", err);
        assert!(msg.contains("Laptop (id 1): requested 8, available 7"));
        assert!(msg.contains("Monitor (id 2): requested 3, available 0"));
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = StockError::invalid_transition(OrderStatus::Completed, OrderStatus::Accepted);
        assert_eq!(
            format!("{}", err),
            "invalid status transition: Completed -> Accepted"
        );
    }

    #[test]
    fn test_validation_and_conflict_display() {
        let err = StockError::validation("product name must not be empty");
        assert_eq!(
            format!("{}", err),
            "validation failed: product name must not be empty"
        );

        let err = StockError::conflict("product 3 has 2 reserved unit(s)");
        assert!(format!("{}", err).starts_with("conflict:"));
    }
}
