//! SQLite storage implementation for the bond dashboard.
//!
//! This crate is the only place Diesel dependencies exist. It implements
//! the store traits defined in `bondboard-core`:
//! - [`bonds::BondRepository`] for `BondStore` and `TransactionStore`
//! - [`sync::SyncRunRepository`] for `SyncRunStore`
//!
//! Writes funnel through a single-writer actor holding one dedicated
//! connection, which sidesteps SQLite's write-lock contention under the
//! orchestrator's concurrent NSE fan-out.

pub mod bonds;
pub mod db;
pub mod errors;
pub mod schema;
pub mod sync;

pub use bonds::BondRepository;
pub use db::{create_pool, get_connection, init, run_migrations, DbConnection, DbPool, WriteHandle};
pub use errors::{IntoCore, StorageError};
pub use sync::SyncRunRepository;

// Re-export from bondboard-core for convenience
pub use bondboard_core::errors::{DatabaseError, Error, Result};
