//! SQLite storage implementation for bonds and their trade prints.

mod model;
mod repository;

pub use model::{BondDB, TransactionDB};
pub use repository::BondRepository;
