//! Spendbook Core - Domain entities, services, and traits.
//!
//! This crate contains the core logic of the expense tracker: expense models,
//! the reports aggregation, the change feed and the view-state holders.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod expenses;
pub mod reports;
pub mod utils;
pub mod view_state;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
