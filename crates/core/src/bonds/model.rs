//! Canonical record shapes shared by every pipeline stage.
//!
//! Both sources converge on [`ScrapedPair`] (a [`BondCandidate`] plus a
//! [`TradeCandidate`]) before anything touches storage, so field names can
//! never drift between the fetch, parse, and store stages.

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default face value when the source does not expose one.
pub const DEFAULT_FACE_VALUE: f64 = 100.0;

/// Placeholder maturity horizon when the source does not expose one.
/// Callers must not treat a bond carrying this default as authoritative.
pub const DEFAULT_MATURITY_YEARS: i64 = 5;

/// The exchange that most recently updated a bond's summary fields.
///
/// Not a permanent attribute: a bond first seen on BSE flips to NSE once
/// NSE data overrides its pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    Bse,
    Nsdl,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
            Exchange::Nsdl => "NSDL",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Some(Exchange::Nse),
            "BSE" => Some(Exchange::Bse),
            "NSDL" => Some(Exchange::Nsdl),
            _ => None,
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instrument, keyed by ISIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bond {
    pub id: String,
    pub isin: String,
    pub name: String,
    pub issuer: String,
    pub exchange: Exchange,
    pub face_value: f64,
    pub coupon_rate: f64,
    pub maturity_date: NaiveDateTime,
    pub yield_to_maturity: f64,
    pub last_price: f64,
    pub volume: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// One observed trade print.
///
/// Identity key for deduplication is `(bond_id, timestamp)`; a transaction
/// is created once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub bond_id: String,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub quantity: i64,
}

/// A bond as one source described it, before reconciliation with storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BondCandidate {
    pub isin: String,
    pub name: String,
    pub issuer: String,
    pub exchange: Exchange,
    pub face_value: f64,
    pub coupon_rate: f64,
    pub maturity_date: NaiveDateTime,
    pub yield_to_maturity: f64,
    pub last_price: f64,
    pub volume: i64,
}

impl BondCandidate {
    /// Candidate with source defaults filled in for fields the exchange
    /// pages never expose (face value, coupon, maturity, yield).
    pub fn with_defaults(
        isin: impl Into<String>,
        name: impl Into<String>,
        issuer: impl Into<String>,
        exchange: Exchange,
        last_price: f64,
        volume: i64,
    ) -> Self {
        Self {
            isin: isin.into(),
            name: name.into(),
            issuer: issuer.into(),
            exchange,
            face_value: DEFAULT_FACE_VALUE,
            coupon_rate: 0.0,
            maturity_date: default_maturity(),
            yield_to_maturity: 0.0,
            last_price,
            volume,
        }
    }
}

/// A trade print as one source described it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCandidate {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub quantity: i64,
}

/// The canonical output of every fetcher: a bond candidate coupled with one
/// trade print from the same row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPair {
    pub bond: BondCandidate,
    pub trade: TradeCandidate,
}

/// Placeholder maturity: now + 5 years.
pub fn default_maturity() -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::days(365 * DEFAULT_MATURITY_YEARS)
}
