//! Bond domain: canonical record model and store boundaries.

pub mod model;
pub mod store;

pub use model::{Bond, BondCandidate, Exchange, ScrapedPair, TradeCandidate, Transaction};
pub use store::{BondStore, TransactionStore, UpsertOutcome};
