//! Store boundaries implemented by the storage crate.
//!
//! Mutations are async (they are serialized through the storage layer's
//! single writer); lookups are synchronous pool reads. Each mutation is its
//! own transactional unit: a failure rolls back only that record and the
//! caller decides whether to continue the batch.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::model::{Bond, BondCandidate, Exchange, TradeCandidate, Transaction};
use crate::errors::Result;

/// What an upsert actually did, for event emission and reporting.
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub bond: Bond,
    /// The bond row was created by this call (first sight of the ISIN).
    pub bond_created: bool,
    /// The inserted transaction; `None` means the identity key
    /// `(bond_id, timestamp)` already existed and the call was a no-op.
    pub transaction: Option<Transaction>,
}

impl UpsertOutcome {
    pub fn transaction_inserted(&self) -> bool {
        self.transaction.is_some()
    }
}

/// Bond persistence boundary.
#[async_trait]
pub trait BondStore: Send + Sync {
    fn find_by_isin(&self, isin: &str) -> Result<Option<Bond>>;

    fn list(&self) -> Result<Vec<Bond>>;

    fn count(&self) -> Result<i64>;

    /// Reconcile one scraped pair against persisted state.
    ///
    /// Creates the bond on first sight (committed before the transaction is
    /// inserted), merges descriptive fields without letting blanks overwrite
    /// non-blanks, and deduplicates the transaction by
    /// `(bond_id, timestamp)`. The whole call is one transactional unit.
    async fn upsert_bond_and_transaction(
        &self,
        bond: &BondCandidate,
        trade: &TradeCandidate,
    ) -> Result<UpsertOutcome>;

    /// Overwrite a bond's summary fields with a direct exchange snapshot
    /// (NSE is authoritative for current pricing when present).
    async fn apply_exchange_snapshot(
        &self,
        isin: &str,
        last_price: f64,
        volume: i64,
        exchange: Exchange,
    ) -> Result<()>;

    /// Set `last_price`/`volume` from the bond's most-recent-by-timestamp
    /// transaction. Final authority after a sync pass; a no-op when the bond
    /// has no transactions. Returns the updated bond when one exists.
    async fn recompute_summary(&self, isin: &str) -> Result<Option<Bond>>;
}

/// Transaction persistence boundary.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    fn find_transaction(&self, bond_id: &str, timestamp: NaiveDateTime)
        -> Result<Option<Transaction>>;

    fn most_recent_transaction(&self, bond_id: &str) -> Result<Option<Transaction>>;

    fn transactions_for_bond(&self, bond_id: &str) -> Result<Vec<Transaction>>;

    /// Recent transactions across all bonds, newest first.
    fn list_transactions(&self, limit: i64) -> Result<Vec<Transaction>>;
}
