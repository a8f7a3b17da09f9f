//! Repository for bonds and trade prints.
//!
//! Reads go straight to the pool; every mutation is a job on the
//! single-writer actor, so the find-then-insert upsert sequence is
//! race-free and commits as one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;

use bondboard_core::bonds::{
    Bond, BondCandidate, BondStore, Exchange, TradeCandidate, Transaction, TransactionStore,
    UpsertOutcome,
};
use bondboard_core::errors::{DatabaseError, Result};

use super::model::{BondDB, TransactionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::{bonds, transactions};

pub struct BondRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl BondRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

fn find_bond_by_isin(conn: &mut SqliteConnection, isin_value: &str) -> Result<Option<BondDB>> {
    bonds::table
        .filter(bonds::isin.eq(isin_value))
        .select(BondDB::as_select())
        .first::<BondDB>(conn)
        .optional()
        .into_core()
}

#[async_trait]
impl BondStore for BondRepository {
    fn find_by_isin(&self, isin: &str) -> Result<Option<Bond>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(find_bond_by_isin(&mut conn, isin)?.map(Bond::from))
    }

    fn list(&self) -> Result<Vec<Bond>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = bonds::table
            .select(BondDB::as_select())
            .order(bonds::isin.asc())
            .load::<BondDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Bond::from).collect())
    }

    fn count(&self) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        bonds::table.count().get_result(&mut conn).into_core()
    }

    async fn upsert_bond_and_transaction(
        &self,
        bond: &BondCandidate,
        trade: &TradeCandidate,
    ) -> Result<UpsertOutcome> {
        let candidate = bond.clone();
        let trade = trade.clone();

        self.writer
            .exec(move |conn| {
                let (mut row, bond_created) = match find_bond_by_isin(conn, &candidate.isin)? {
                    Some(existing) => (existing, false),
                    None => {
                        let fresh = BondDB::from_candidate(&candidate);
                        diesel::insert_into(bonds::table)
                            .values(&fresh)
                            .execute(conn)
                            .into_core()?;
                        (fresh, true)
                    }
                };

                // Backfill descriptive fields: a source that knows the
                // name may fill a blank, but a blank never clobbers a
                // value another source provided.
                if !bond_created {
                    let fill_name = row.name.trim().is_empty() && !candidate.name.trim().is_empty();
                    let fill_issuer =
                        row.issuer.trim().is_empty() && !candidate.issuer.trim().is_empty();
                    if fill_name || fill_issuer {
                        if fill_name {
                            row.name = candidate.name.clone();
                        }
                        if fill_issuer {
                            row.issuer = candidate.issuer.clone();
                        }
                        row.updated_at = chrono::Utc::now().naive_utc();
                        diesel::update(bonds::table.find(&row.id))
                            .set((
                                bonds::name.eq(&row.name),
                                bonds::issuer.eq(&row.issuer),
                                bonds::updated_at.eq(row.updated_at),
                            ))
                            .execute(conn)
                            .into_core()?;
                    }
                }

                let existing_txn = transactions::table
                    .filter(transactions::bond_id.eq(&row.id))
                    .filter(transactions::timestamp.eq(trade.timestamp))
                    .select(TransactionDB::as_select())
                    .first::<TransactionDB>(conn)
                    .optional()
                    .into_core()?;

                let transaction = match existing_txn {
                    Some(_) => None,
                    None => {
                        let txn = TransactionDB::from_trade(&row.id, &trade);
                        diesel::insert_into(transactions::table)
                            .values(&txn)
                            .execute(conn)
                            .into_core()?;
                        Some(Transaction::from(txn))
                    }
                };

                Ok(UpsertOutcome {
                    bond: Bond::from(row),
                    bond_created,
                    transaction,
                })
            })
            .await
    }

    async fn apply_exchange_snapshot(
        &self,
        isin: &str,
        last_price: f64,
        volume: i64,
        exchange: Exchange,
    ) -> Result<()> {
        let isin = isin.to_string();
        self.writer
            .exec(move |conn| {
                let updated = diesel::update(bonds::table.filter(bonds::isin.eq(&isin)))
                    .set((
                        bonds::last_price.eq(last_price),
                        bonds::volume.eq(volume),
                        bonds::exchange.eq(exchange.as_str()),
                        bonds::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;
                if updated == 0 {
                    return Err(DatabaseError::NotFound(isin.clone()).into());
                }
                Ok(())
            })
            .await
    }

    async fn recompute_summary(&self, isin: &str) -> Result<Option<Bond>> {
        let isin = isin.to_string();
        self.writer
            .exec(move |conn| {
                let Some(row) = find_bond_by_isin(conn, &isin)? else {
                    return Ok(None);
                };

                let latest = transactions::table
                    .filter(transactions::bond_id.eq(&row.id))
                    .order(transactions::timestamp.desc())
                    .select(TransactionDB::as_select())
                    .first::<TransactionDB>(conn)
                    .optional()
                    .into_core()?;

                let Some(latest) = latest else {
                    return Ok(None);
                };

                diesel::update(bonds::table.find(&row.id))
                    .set((
                        bonds::last_price.eq(latest.price),
                        bonds::volume.eq(latest.quantity),
                        bonds::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .into_core()?;

                find_bond_by_isin(conn, &isin).map(|found| found.map(Bond::from))
            })
            .await
    }
}

#[async_trait]
impl TransactionStore for BondRepository {
    fn find_transaction(
        &self,
        bond_id: &str,
        timestamp: NaiveDateTime,
    ) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .filter(transactions::bond_id.eq(bond_id))
            .filter(transactions::timestamp.eq(timestamp))
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(Transaction::from))
    }

    fn most_recent_transaction(&self, bond_id: &str) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .filter(transactions::bond_id.eq(bond_id))
            .order(transactions::timestamp.desc())
            .select(TransactionDB::as_select())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(Transaction::from))
    }

    fn transactions_for_bond(&self, bond_id: &str) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .filter(transactions::bond_id.eq(bond_id))
            .order(transactions::timestamp.desc())
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    fn list_transactions(&self, limit: i64) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = transactions::table
            .order(transactions::timestamp.desc())
            .limit(limit)
            .select(TransactionDB::as_select())
            .load::<TransactionDB>(&mut conn)
            .into_core()?;
        Ok(rows.into_iter().map(Transaction::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use bondboard_core::bonds::{BondCandidate, TradeCandidate};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn candidate(isin: &str, name: &str, price: f64) -> BondCandidate {
        BondCandidate::with_defaults(isin, name, "Some Issuer", Exchange::Bse, price, 100)
    }

    fn trade(day: u32, price: f64, quantity: i64) -> TradeCandidate {
        TradeCandidate {
            timestamp: ts(day),
            price,
            quantity,
        }
    }

    async fn repository(dir: &TempDir) -> BondRepository {
        let db_path = dir.path().join("test.db");
        let db_path = db_path.to_str().unwrap();
        crate::db::init(db_path).unwrap();
        let pool = create_pool(db_path).unwrap();
        run_migrations(&pool).unwrap();
        let writer = spawn_writer((*pool).clone());
        BondRepository::new(pool, writer)
    }

    #[tokio::test]
    async fn test_upsert_creates_bond_then_reuses_it() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        let first = repo
            .upsert_bond_and_transaction(&candidate("INE001A07001", "NTPC 2031", 101.0), &trade(25, 101.0, 50))
            .await
            .unwrap();
        assert!(first.bond_created);
        assert!(first.transaction.is_some());

        let second = repo
            .upsert_bond_and_transaction(&candidate("INE001A07001", "NTPC 2031", 102.0), &trade(26, 102.0, 60))
            .await
            .unwrap();
        assert!(!second.bond_created);
        assert!(second.transaction.is_some());
        assert_eq!(first.bond.id, second.bond.id);
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_identity_key_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        let bond = candidate("INE001A07001", "NTPC 2031", 101.0);

        repo.upsert_bond_and_transaction(&bond, &trade(25, 101.0, 50))
            .await
            .unwrap();
        let replay = repo
            .upsert_bond_and_transaction(&bond, &trade(25, 999.0, 999))
            .await
            .unwrap();

        assert!(replay.transaction.is_none());
        let prints = repo.transactions_for_bond(&replay.bond.id).unwrap();
        assert_eq!(prints.len(), 1);
        assert_eq!(prints[0].price, 101.0);
    }

    #[tokio::test]
    async fn test_blank_name_never_overwrites_and_backfill_works() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        // First sight comes from a source with no descriptive fields.
        repo.upsert_bond_and_transaction(
            &BondCandidate::with_defaults("INE001A07001", "", "", Exchange::Nse, 100.0, 10),
            &trade(25, 100.0, 10),
        )
        .await
        .unwrap();

        // A later source knows the name: backfill.
        let filled = repo
            .upsert_bond_and_transaction(&candidate("INE001A07001", "NTPC 2031", 101.0), &trade(26, 101.0, 20))
            .await
            .unwrap();
        assert_eq!(filled.bond.name, "NTPC 2031");

        // A still-later blank must not clobber it.
        let after_blank = repo
            .upsert_bond_and_transaction(
                &BondCandidate::with_defaults("INE001A07001", "", "", Exchange::Nse, 102.0, 30),
                &trade(27, 102.0, 30),
            )
            .await
            .unwrap();
        assert_eq!(after_blank.bond.name, "NTPC 2031");
        assert_eq!(after_blank.bond.issuer, "Some Issuer");
    }

    #[tokio::test]
    async fn test_snapshot_override_and_recompute() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;

        repo.upsert_bond_and_transaction(&candidate("INE001A07001", "NTPC 2031", 101.0), &trade(25, 101.0, 50))
            .await
            .unwrap();
        repo.upsert_bond_and_transaction(&candidate("INE001A07001", "NTPC 2031", 103.0), &trade(27, 103.0, 70))
            .await
            .unwrap();

        repo.apply_exchange_snapshot("INE001A07001", 250.0, 999, Exchange::Nse)
            .await
            .unwrap();
        let overridden = repo.find_by_isin("INE001A07001").unwrap().unwrap();
        assert_eq!(overridden.last_price, 250.0);
        assert_eq!(overridden.exchange, Exchange::Nse);

        // Recompute restores the freshest stored print.
        let recomputed = repo.recompute_summary("INE001A07001").await.unwrap().unwrap();
        assert_eq!(recomputed.last_price, 103.0);
        assert_eq!(recomputed.volume, 70);
        // Exchange is untouched by recompute.
        assert_eq!(recomputed.exchange, Exchange::Nse);
    }

    #[tokio::test]
    async fn test_snapshot_for_unknown_isin_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        let err = repo
            .apply_exchange_snapshot("INE999X99999", 1.0, 1, Exchange::Nse)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("INE999X99999"));
    }

    #[tokio::test]
    async fn test_recompute_without_transactions_is_none() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        assert!(repo.recompute_summary("INE001A07001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transaction_queries_order_newest_first() {
        let dir = TempDir::new().unwrap();
        let repo = repository(&dir).await;
        let bond = candidate("INE001A07001", "NTPC 2031", 101.0);
        for (day, price) in [(25, 101.0), (27, 103.0), (26, 102.0)] {
            repo.upsert_bond_and_transaction(&bond, &trade(day, price, 10))
                .await
                .unwrap();
        }
        let bond_id = repo.find_by_isin("INE001A07001").unwrap().unwrap().id;

        let newest = repo.most_recent_transaction(&bond_id).unwrap().unwrap();
        assert_eq!(newest.timestamp, ts(27));

        let all = repo.list_transactions(2).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].timestamp > all[1].timestamp);

        let found = repo.find_transaction(&bond_id, ts(26)).unwrap();
        assert_eq!(found.unwrap().price, 102.0);
    }
}
