//! Product Model

use serde::{Deserialize, Serialize};

/// Product entity
///
/// `quantity` is the live sellable counter: reserving stock debits it
/// immediately, so "available to reserve" is always plain `quantity` and
/// never `quantity - reserved`. `reserved` tracks units held by open
/// orders and exists for display and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Units sellable and not held by any order; never negative
    pub quantity: i64,
    /// Units held against open orders; never negative
    pub reserved: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Product {
    /// Units currently eligible to be newly reserved.
    pub fn available(&self) -> i64 {
        self.quantity
    }
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub quantity: i64,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl ProductCreate {
    pub fn new(name: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            quantity,
            image: None,
            description: None,
        }
    }
}

/// Update product payload; fields left `None` are unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub image: Option<String>,
    pub description: Option<String>,
}
