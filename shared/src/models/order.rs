//! Order Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// `new -> accepted -> completed`, with cancellation legal from both
/// non-terminal states and direct completion of a `new` order allowed.
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    New,
    Accepted,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (New, Accepted)
                | (New, Completed)
                | (New, Cancelled)
                | (Accepted, Completed)
                | (Accepted, Cancelled)
        )
    }

    /// Terminal orders accept no further transitions and hold no reservation.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// An order holds its reservation exactly while it is open.
    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

/// Order line item; `product_name` is a display snapshot taken when the
/// order was placed, so later renames don't rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

impl OrderItem {
    /// The (product, quantity) pair this line holds against the catalog.
    pub fn request(&self) -> ItemRequest {
        ItemRequest {
            product_id: self.product_id,
            quantity: self.quantity,
        }
    }
}

/// A (product, quantity) pair as submitted by a caller; the engine fills
/// in the name snapshot when it turns requests into [`OrderItem`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    pub product_id: i64,
    pub quantity: i64,
}

impl ItemRequest {
    pub fn new(product_id: i64, quantity: i64) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Order entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Order {
    /// The reservation requests this order's items represent, in item order.
    pub fn requests(&self) -> Vec<ItemRequest> {
        self.items.iter().map(OrderItem::request).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_legal_transitions() {
        use OrderStatus::*;
        assert!(New.can_transition(Accepted));
        assert!(New.can_transition(Completed));
        assert!(New.can_transition(Cancelled));
        assert!(Accepted.can_transition(Completed));
        assert!(Accepted.can_transition(Cancelled));
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        use OrderStatus::*;
        for from in [Completed, Cancelled] {
            for to in [New, Accepted, Completed, Cancelled] {
                assert!(!from.can_transition(to), "{:?} -> {:?} must be illegal", from, to);
            }
        }
    }

    #[test]
    fn test_no_self_or_backward_transitions() {
        use OrderStatus::*;
        assert!(!New.can_transition(New));
        assert!(!Accepted.can_transition(Accepted));
        assert!(!Accepted.can_transition(New));
        assert!(!Completed.can_transition(Accepted));
    }

    #[test]
    fn test_is_open_matches_reservation_holding_states() {
        use OrderStatus::*;
        assert!(New.is_open());
        assert!(Accepted.is_open());
        assert!(!Completed.is_open());
        assert!(!Cancelled.is_open());
    }

    #[test]
    fn test_order_wire_format() {
        let order = Order {
            id: 17,
            items: vec![OrderItem {
                product_id: 1,
                product_name: "Laptop".to_string(),
                quantity: 3,
            }],
            status: OrderStatus::New,
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 30, 0).unwrap(),
            notes: None,
        };
        let json = serde_json::to_string(&order).unwrap();
        assert_eq!(
            json,
            r#"{"id":17,"items":[{"productId":1,"productName":"Laptop","quantity":3}],"status":"new","createdAt":"2025-06-01T12:30:00Z"}"#
        );
    }

    #[test]
    fn test_order_round_trip_with_notes() {
        let json = r#"{"id":9,"items":[{"productId":2,"productName":"Monitor","quantity":1}],"status":"accepted","createdAt":"2025-01-15T08:00:00Z","notes":"deliver to dock 4"}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        assert_eq!(order.notes.as_deref(), Some("deliver to dock 4"));
        assert_eq!(serde_json::to_string(&order).unwrap(), json);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            r#""cancelled""#
        );
        let status: OrderStatus = serde_json::from_str(r#""completed""#).unwrap();
        assert_eq!(status, OrderStatus::Completed);
    }
}
