//! SQLite storage implementation for sync run bookkeeping.

mod model;
mod repository;

pub use model::SyncRunDB;
pub use repository::SyncRunRepository;
