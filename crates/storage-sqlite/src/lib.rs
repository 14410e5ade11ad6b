//! SQLite storage for Spendbook.
//!
//! Implements the repository traits defined in `spendbook-core` with Diesel
//! over SQLite and contains:
//! - Connection pooling and the single-writer actor
//! - Embedded Diesel migrations
//! - The expense repository and its Diesel model types
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies
//! exist. `core` is database-agnostic and works with traits.
//!
//! ```text
//!        core (domain, reports, view state)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```

pub mod config;
pub mod db;
pub mod errors;
pub mod expenses;
pub mod schema;
pub mod store;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, run_migrations, spawn_writer, DbConnection,
    DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use config::StoreConfig;
pub use expenses::ExpenseRepository;
pub use store::ExpenseStore;

// Re-export from spendbook-core for convenience
pub use spendbook_core::errors::{DatabaseError, Error, Result};
