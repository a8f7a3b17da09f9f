//! Bondboard core crate.
//!
//! Domain model, error taxonomy, and the acquisition-and-synchronization
//! pipeline for the bond dashboard. This crate is database-agnostic and
//! network-agnostic: storage and scraping live behind traits
//! ([`bonds::store`], [`ingest::fetcher`]) implemented by sibling crates.
//!
//! # Architecture
//!
//! ```text
//! scheduler (server)
//!       │
//!       ▼
//! SyncOrchestrator ──► DebtTradeFetcher / IsinHistoryFetcher  (scrape crate)
//!       │
//!       ├──► BondStore / TransactionStore                     (storage crate)
//!       ├──► SyncRunStore                                     (watermark)
//!       └──► DomainEventSink                                  (fan-out)
//! ```

pub mod bonds;
pub mod errors;
pub mod events;
pub mod ingest;

pub use bonds::{Bond, BondCandidate, Exchange, ScrapedPair, TradeCandidate, Transaction};
pub use errors::{
    DatabaseError, Error, FetchError, OrchestrationError, Result, SyncStage, ValidationError,
};
pub use events::{DomainEvent, DomainEventSink, NoOpDomainEventSink};
pub use ingest::{FetchWindow, SyncMode, SyncOrchestrator, SyncReport};
