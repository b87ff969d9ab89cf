//! Engine event broadcast types
//!
//! Every successful mutation emits exactly one [`StockEvent`] after the
//! snapshots have been saved, so an embedding UI can re-render product and
//! order lists without polling.

use serde::Serialize;
use shared::models::{Order, Product};

/// Event emitted after a successful engine mutation
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockEvent {
    ProductAdded { product: Product },
    ProductUpdated { product: Product },
    ProductRemoved { product_id: i64 },
    OrderPlaced { order: Order },
    OrderEdited { order: Order },
    OrderAccepted { order_id: i64 },
    OrderCancelled { order_id: i64 },
    OrderCompleted { order_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = StockEvent::OrderCancelled { order_id: 12 };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"ORDER_CANCELLED","order_id":12}"#);
    }
}
