//! Database models for bonds and transactions.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use bondboard_core::bonds::{Bond, BondCandidate, Exchange, TradeCandidate, Transaction};

/// Database model for bonds. The exchange is stored as its wire string
/// (`NSE`/`BSE`/`NSDL`); unknown values decode to NSDL rather than
/// failing the whole row.
#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::bonds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BondDB {
    pub id: String,
    pub isin: String,
    pub name: String,
    pub issuer: String,
    pub exchange: String,
    pub face_value: f64,
    pub coupon_rate: f64,
    pub maturity_date: NaiveDateTime,
    pub yield_to_maturity: f64,
    pub last_price: f64,
    pub volume: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<BondDB> for Bond {
    fn from(db: BondDB) -> Self {
        Self {
            id: db.id,
            isin: db.isin,
            name: db.name,
            issuer: db.issuer,
            exchange: Exchange::from_str_loose(&db.exchange).unwrap_or(Exchange::Nsdl),
            face_value: db.face_value,
            coupon_rate: db.coupon_rate,
            maturity_date: db.maturity_date,
            yield_to_maturity: db.yield_to_maturity,
            last_price: db.last_price,
            volume: db.volume,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl BondDB {
    /// Fresh row from a candidate; the id is assigned here.
    pub fn from_candidate(candidate: &BondCandidate) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            isin: candidate.isin.clone(),
            name: candidate.name.clone(),
            issuer: candidate.issuer.clone(),
            exchange: candidate.exchange.as_str().to_string(),
            face_value: candidate.face_value,
            coupon_rate: candidate.coupon_rate,
            maturity_date: candidate.maturity_date,
            yield_to_maturity: candidate.yield_to_maturity,
            last_price: candidate.last_price,
            volume: candidate.volume,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Database model for trade prints. Insert-only; rows are never updated.
#[derive(
    Queryable, Identifiable, Insertable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub bond_id: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub quantity: i64,
    pub created_at: NaiveDateTime,
}

impl From<TransactionDB> for Transaction {
    fn from(db: TransactionDB) -> Self {
        Self {
            id: db.id,
            bond_id: db.bond_id,
            timestamp: db.timestamp,
            price: db.price,
            quantity: db.quantity,
        }
    }
}

impl TransactionDB {
    pub fn from_trade(bond_id: &str, trade: &TradeCandidate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bond_id: bond_id.to_string(),
            timestamp: trade.timestamp,
            price: trade.price,
            quantity: trade.quantity,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
