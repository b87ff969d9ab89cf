//! Stockroom engine
//!
//! Inventory reservation accounting for a warehouse ordering system. The
//! engine maintains, per product, a sellable `quantity` and a `reserved`
//! counter held by open orders, and guarantees that placing, editing,
//! cancelling and completing orders apply matched, atomic adjustments to
//! both sides so stock never goes negative and reservations never leak.
//!
//! # Architecture
//!
//! - [`catalog::ProductCatalog`] owns product records and the only
//!   operations that touch stock counters.
//! - [`orders::OrderStore`] owns order records and the status state machine.
//! - [`orders::ReservationCoordinator`] is the single entry point for
//!   order-lifecycle actions; it runs each one as a critical section over
//!   both stores, persists snapshots through [`persist::SnapshotStore`],
//!   and broadcasts [`events::StockEvent`]s for an embedding UI.

pub mod catalog;
pub mod config;
pub mod events;
pub mod orders;
pub mod persist;
pub mod utils;

pub use catalog::ProductCatalog;
pub use config::EngineConfig;
pub use events::StockEvent;
pub use orders::{OrderStore, ReservationCoordinator};
