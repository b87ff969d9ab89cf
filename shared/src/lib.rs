//! Shared models and error types for the Stockroom engine
//!
//! This crate holds everything both the engine and an embedding frontend
//! need to agree on: the [`models`] describing products and orders, the
//! unified [`error`] taxonomy, and small [`util`] helpers (id generation,
//! millisecond clock).

pub mod error;
pub mod models;
pub mod util;

pub use error::{Shortage, StockError, StockResult};
