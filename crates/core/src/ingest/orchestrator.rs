//! Sync orchestration.
//!
//! A sync run walks a fixed sequence of stages: decide full vs
//! incremental, pull the BSE window, persist it, enrich every touched
//! ISIN from NSE, then recompute summary fields from the freshest
//! transaction on record. Failures are contained at the narrowest
//! sensible scope: a malformed or unstorable record never aborts the
//! batch, a dead ISIN never aborts the run, but a failed exchange fetch
//! fails the whole run and marks its `SyncRun` row accordingly.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Local};
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::fetcher::{DebtTradeFetcher, FetchWindow, IsinHistoryFetcher};
use super::watermark::SyncRunStore;
use crate::bonds::{BondStore, Exchange, ScrapedPair};
use crate::errors::{Error, OrchestrationError, SyncStage};
use crate::events::{DomainEvent, DomainEventSink};

/// Days covered by a full sync, matching the exchanges' lookback limit.
pub const FULL_WINDOW_DAYS: i64 = 180;
/// Concurrent per-ISIN NSE lookups. NSE throttles aggressively, so this
/// stays low.
const NSE_CONCURRENCY: usize = 2;
/// Fallback lookback when an incremental sync finds no usable watermark.
const INCREMENTAL_FALLBACK_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Full => "FULL",
            SyncMode::Incremental => "INCREMENTAL",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated outcome of one sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub mode: SyncMode,
    pub window_from: chrono::NaiveDate,
    pub window_to: chrono::NaiveDate,
    pub bonds_created: usize,
    pub transactions_inserted: usize,
    pub duplicates_skipped: usize,
    /// Records the store rejected; the rest of the batch still landed.
    pub storage_failures: usize,
    pub isins_touched: usize,
    /// ISINs whose NSE enrichment failed, with the failure message.
    pub nse_failures: Vec<(String, String)>,
}

impl SyncReport {
    fn new(mode: SyncMode, window: &FetchWindow) -> Self {
        Self {
            mode,
            window_from: window.from,
            window_to: window.to,
            bonds_created: 0,
            transactions_inserted: 0,
            duplicates_skipped: 0,
            storage_failures: 0,
            isins_touched: 0,
            nse_failures: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} sync over {}..{}: {} bonds created, {} transactions inserted, \
             {} duplicates skipped, {} storage failures, {} NSE failures",
            self.mode,
            self.window_from,
            self.window_to,
            self.bonds_created,
            self.transactions_inserted,
            self.duplicates_skipped,
            self.storage_failures,
            self.nse_failures.len()
        )
    }
}

/// Outcome of enriching a single ISIN from NSE.
struct IsinOutcome {
    isin: String,
    transactions_inserted: usize,
    duplicates_skipped: usize,
    storage_failures: usize,
    inserted_events: Vec<DomainEvent>,
    error: Option<String>,
}

impl IsinOutcome {
    fn empty(isin: String) -> Self {
        Self {
            isin,
            transactions_inserted: 0,
            duplicates_skipped: 0,
            storage_failures: 0,
            inserted_events: Vec::new(),
            error: None,
        }
    }

    fn failed(isin: String, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::empty(isin)
        }
    }
}

pub struct SyncOrchestrator {
    bse: Arc<dyn DebtTradeFetcher>,
    nse: Arc<dyn IsinHistoryFetcher>,
    store: Arc<dyn BondStore>,
    runs: Arc<dyn SyncRunStore>,
    events: Arc<dyn DomainEventSink>,
    nse_concurrency: usize,
    full_window_days: i64,
}

impl SyncOrchestrator {
    pub fn new(
        bse: Arc<dyn DebtTradeFetcher>,
        nse: Arc<dyn IsinHistoryFetcher>,
        store: Arc<dyn BondStore>,
        runs: Arc<dyn SyncRunStore>,
        events: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            bse,
            nse,
            store,
            runs,
            events,
            nse_concurrency: NSE_CONCURRENCY,
            full_window_days: FULL_WINDOW_DAYS,
        }
    }

    pub fn with_nse_concurrency(mut self, concurrency: usize) -> Self {
        self.nse_concurrency = concurrency.max(1);
        self
    }

    pub fn with_full_window_days(mut self, days: i64) -> Self {
        self.full_window_days = days.max(1);
        self
    }

    /// Run one sync end to end. `forced` pins the mode; otherwise an
    /// empty store selects a full sync and anything else an incremental
    /// one. Returns the aggregated report, or the stage that failed.
    pub async fn run_sync(
        &self,
        forced: Option<SyncMode>,
    ) -> std::result::Result<SyncReport, OrchestrationError> {
        let mode = match forced {
            Some(mode) => mode,
            None => self.determine_mode().await?,
        };
        let window = self.window_for(mode).await?;
        info!("starting {} sync over {}", mode, window);

        let run = self
            .runs
            .begin_run(mode)
            .await
            .map_err(|e| OrchestrationError::new(SyncStage::DeterminingMode, e))?;

        match self.execute(mode, &window).await {
            Ok(report) => {
                self.runs
                    .complete_run(&run.id)
                    .await
                    .map_err(|e| OrchestrationError::new(SyncStage::RecomputingSummaries, e))?;
                self.events.emit(DomainEvent::SyncCompleted {
                    bonds_touched: report.isins_touched,
                    transactions_inserted: report.transactions_inserted,
                });
                info!("{}", report.summary());
                Ok(report)
            }
            Err(err) => {
                error!("sync failed in stage {}: {}", err.stage, err.source);
                if let Err(mark_err) = self.runs.fail_run(&run.id, &err.to_string()).await {
                    error!("failed to mark run {} as failed: {}", run.id, mark_err);
                }
                Err(err)
            }
        }
    }

    async fn determine_mode(&self) -> std::result::Result<SyncMode, OrchestrationError> {
        let count = self
            .store
            .count()
            .map_err(|e| OrchestrationError::new(SyncStage::DeterminingMode, e))?;
        Ok(if count == 0 {
            SyncMode::Full
        } else {
            SyncMode::Incremental
        })
    }

    async fn window_for(
        &self,
        mode: SyncMode,
    ) -> std::result::Result<FetchWindow, OrchestrationError> {
        match mode {
            SyncMode::Full => Ok(FetchWindow::last_days(self.full_window_days)),
            SyncMode::Incremental => {
                let watermark = self
                    .runs
                    .last_successful_completion()
                    .await
                    .map_err(|e| OrchestrationError::new(SyncStage::DeterminingMode, e))?;
                match watermark {
                    Some(mark) => Ok(FetchWindow::since(mark)),
                    None => {
                        let fallback =
                            Local::now().naive_local() - Duration::hours(INCREMENTAL_FALLBACK_HOURS);
                        warn!(
                            "no completed run on record; incremental sync falling back to {}",
                            fallback
                        );
                        Ok(FetchWindow::since(fallback))
                    }
                }
            }
        }
    }

    async fn execute(
        &self,
        mode: SyncMode,
        window: &FetchWindow,
    ) -> std::result::Result<SyncReport, OrchestrationError> {
        let mut report = SyncReport::new(mode, window);

        // Fetching-BSE: the window fetch is all-or-nothing.
        let pairs = self
            .bse
            .fetch_window(window)
            .await
            .map_err(|e| OrchestrationError::new(SyncStage::FetchingBse, Error::Fetch(e)))?;
        info!(
            "{} returned {} trade rows for {}",
            self.bse.source_name(),
            pairs.len(),
            window
        );

        // Storing-BSE: one bad record never sinks the batch.
        let mut touched: BTreeSet<String> = BTreeSet::new();
        for pair in &pairs {
            match self.store.upsert_bond_and_transaction(&pair.bond, &pair.trade).await {
                Ok(outcome) => {
                    touched.insert(pair.bond.isin.clone());
                    if outcome.bond_created {
                        report.bonds_created += 1;
                    }
                    match outcome.transaction {
                        Some(txn) => {
                            report.transactions_inserted += 1;
                            self.events.emit(DomainEvent::NewTransaction(txn));
                        }
                        None => report.duplicates_skipped += 1,
                    }
                }
                Err(e) => {
                    report.storage_failures += 1;
                    warn!("skipping unstorable record for {}: {}", pair.bond.isin, e);
                }
            }
        }

        // Fetching/Storing-NSE: bounded fan-out, one ISIN at a time.
        let outcomes: Vec<IsinOutcome> = stream::iter(touched.iter().cloned())
            .map(|isin| self.sync_isin(isin, window))
            .buffer_unordered(self.nse_concurrency)
            .collect()
            .await;
        for outcome in outcomes {
            report.transactions_inserted += outcome.transactions_inserted;
            report.duplicates_skipped += outcome.duplicates_skipped;
            report.storage_failures += outcome.storage_failures;
            for event in outcome.inserted_events {
                self.events.emit(event);
            }
            if let Some(message) = outcome.error {
                report.nse_failures.push((outcome.isin, message));
            }
        }

        // Recomputing-Summaries: the latest transaction on record wins.
        for isin in &touched {
            match self.store.recompute_summary(isin).await {
                Ok(Some(bond)) => self.events.emit(DomainEvent::BondUpdate(bond)),
                Ok(None) => debug!("no transactions for {}, summary left alone", isin),
                Err(e) => {
                    report.storage_failures += 1;
                    warn!("summary recompute failed for {}: {}", isin, e);
                }
            }
        }

        report.isins_touched = touched.len();
        Ok(report)
    }

    /// Enrich one ISIN from NSE. Every failure stays inside the returned
    /// outcome so one dead symbol cannot take the run down.
    async fn sync_isin(&self, isin: String, window: &FetchWindow) -> IsinOutcome {
        let pairs = match self.nse.fetch_isin(&isin, window).await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("{} lookup failed for {}: {}", self.nse.source_name(), isin, e);
                return IsinOutcome::failed(isin, e.to_string());
            }
        };
        let Some(first) = pairs.first() else {
            debug!("{} has no prints for {} in {}", self.nse.source_name(), isin, window);
            return IsinOutcome::empty(isin);
        };

        // NSE is authoritative for the quoted snapshot when it covers
        // the security at all; recompute may still supersede it below.
        if let Err(e) = self
            .store
            .apply_exchange_snapshot(&isin, first.bond.last_price, first.bond.volume, Exchange::Nse)
            .await
        {
            warn!("snapshot override failed for {}: {}", isin, e);
            return IsinOutcome::failed(isin, e.to_string());
        }

        let mut outcome = IsinOutcome::empty(isin);
        for ScrapedPair { bond, trade } in &pairs {
            match self.store.upsert_bond_and_transaction(bond, trade).await {
                Ok(upsert) => match upsert.transaction {
                    Some(txn) => {
                        outcome.transactions_inserted += 1;
                        outcome
                            .inserted_events
                            .push(DomainEvent::NewTransaction(txn));
                    }
                    None => outcome.duplicates_skipped += 1,
                },
                Err(e) => {
                    outcome.storage_failures += 1;
                    warn!("skipping unstorable record for {}: {}", outcome.isin, e);
                }
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonds::{Bond, BondCandidate, TradeCandidate, Transaction, UpsertOutcome};
    use crate::errors::{DatabaseError, FetchError, Result};
    use crate::events::MockDomainEventSink;
    use crate::ingest::watermark::{RunStatus, SyncRun};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn pair(isin: &str, exchange: Exchange, when: NaiveDateTime, price: f64, qty: i64) -> ScrapedPair {
        ScrapedPair {
            bond: BondCandidate::with_defaults(
                isin,
                &format!("{} 7.5% 2031", isin),
                "Test Issuer",
                exchange,
                price,
                qty,
            ),
            trade: TradeCandidate {
                timestamp: when,
                price,
                quantity: qty,
            },
        }
    }

    /// In-memory store modelling the real upsert semantics: bonds keyed
    /// by ISIN, transactions deduplicated on `(bond_id, timestamp)`.
    #[derive(Default)]
    struct MemoryStore {
        inner: Mutex<MemoryStoreInner>,
        fail_isin: Option<String>,
    }

    #[derive(Default)]
    struct MemoryStoreInner {
        bonds: HashMap<String, Bond>,
        transactions: Vec<Transaction>,
    }

    impl MemoryStore {
        fn failing_for(isin: &str) -> Self {
            Self {
                fail_isin: Some(isin.to_string()),
                ..Self::default()
            }
        }

        fn bond(&self, isin: &str) -> Option<Bond> {
            self.inner.lock().unwrap().bonds.get(isin).cloned()
        }

        fn transaction_count(&self) -> usize {
            self.inner.lock().unwrap().transactions.len()
        }
    }

    #[async_trait]
    impl BondStore for MemoryStore {
        fn find_by_isin(&self, isin: &str) -> Result<Option<Bond>> {
            Ok(self.bond(isin))
        }

        fn list(&self) -> Result<Vec<Bond>> {
            Ok(self.inner.lock().unwrap().bonds.values().cloned().collect())
        }

        fn count(&self) -> Result<i64> {
            Ok(self.inner.lock().unwrap().bonds.len() as i64)
        }

        async fn upsert_bond_and_transaction(
            &self,
            bond: &BondCandidate,
            trade: &TradeCandidate,
        ) -> Result<UpsertOutcome> {
            if self.fail_isin.as_deref() == Some(bond.isin.as_str()) {
                return Err(DatabaseError::QueryFailed("disk full".to_string()).into());
            }
            let mut inner = self.inner.lock().unwrap();
            let now = ts(30, 12);
            let (row, created) = match inner.bonds.get(&bond.isin) {
                Some(existing) => (existing.clone(), false),
                None => {
                    let row = Bond {
                        id: format!("bond-{}", bond.isin),
                        isin: bond.isin.clone(),
                        name: bond.name.clone(),
                        issuer: bond.issuer.clone(),
                        exchange: bond.exchange,
                        face_value: bond.face_value,
                        coupon_rate: bond.coupon_rate,
                        maturity_date: bond.maturity_date,
                        yield_to_maturity: bond.yield_to_maturity,
                        last_price: bond.last_price,
                        volume: bond.volume,
                        created_at: now,
                        updated_at: now,
                    };
                    inner.bonds.insert(bond.isin.clone(), row.clone());
                    (row, true)
                }
            };
            let duplicate = inner
                .transactions
                .iter()
                .any(|t| t.bond_id == row.id && t.timestamp == trade.timestamp);
            let transaction = if duplicate {
                None
            } else {
                let txn = Transaction {
                    id: format!("txn-{}-{}", row.id, inner.transactions.len()),
                    bond_id: row.id.clone(),
                    timestamp: trade.timestamp,
                    price: trade.price,
                    quantity: trade.quantity,
                };
                inner.transactions.push(txn.clone());
                Some(txn)
            };
            Ok(UpsertOutcome {
                bond: row,
                bond_created: created,
                transaction,
            })
        }

        async fn apply_exchange_snapshot(
            &self,
            isin: &str,
            last_price: f64,
            volume: i64,
            exchange: Exchange,
        ) -> Result<()> {
            let mut inner = self.inner.lock().unwrap();
            let bond = inner
                .bonds
                .get_mut(isin)
                .ok_or_else(|| DatabaseError::NotFound(isin.to_string()))?;
            bond.last_price = last_price;
            bond.volume = volume;
            bond.exchange = exchange;
            Ok(())
        }

        async fn recompute_summary(&self, isin: &str) -> Result<Option<Bond>> {
            let mut inner = self.inner.lock().unwrap();
            let Some(bond) = inner.bonds.get(isin).cloned() else {
                return Ok(None);
            };
            let latest = inner
                .transactions
                .iter()
                .filter(|t| t.bond_id == bond.id)
                .max_by_key(|t| t.timestamp)
                .cloned();
            match latest {
                Some(txn) => {
                    let bond = inner.bonds.get_mut(isin).unwrap();
                    bond.last_price = txn.price;
                    bond.volume = txn.quantity;
                    Ok(Some(bond.clone()))
                }
                None => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct MemoryRunStore {
        runs: Mutex<Vec<SyncRun>>,
        watermark: Option<NaiveDateTime>,
    }

    impl MemoryRunStore {
        fn with_watermark(mark: NaiveDateTime) -> Self {
            Self {
                watermark: Some(mark),
                ..Self::default()
            }
        }

        fn last(&self) -> SyncRun {
            self.runs.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl SyncRunStore for MemoryRunStore {
        async fn begin_run(&self, mode: SyncMode) -> Result<SyncRun> {
            let mut runs = self.runs.lock().unwrap();
            let run = SyncRun {
                id: format!("run-{}", runs.len()),
                mode,
                status: RunStatus::Running,
                started_at: ts(30, 9),
                completed_at: None,
                error: None,
            };
            runs.push(run.clone());
            Ok(run)
        }

        async fn complete_run(&self, run_id: &str) -> Result<()> {
            let mut runs = self.runs.lock().unwrap();
            let run = runs.iter_mut().find(|r| r.id == run_id).unwrap();
            run.status = RunStatus::Completed;
            run.completed_at = Some(ts(30, 10));
            Ok(())
        }

        async fn fail_run(&self, run_id: &str, error: &str) -> Result<()> {
            let mut runs = self.runs.lock().unwrap();
            let run = runs.iter_mut().find(|r| r.id == run_id).unwrap();
            run.status = RunStatus::Failed;
            run.error = Some(error.to_string());
            Ok(())
        }

        async fn last_successful_completion(&self) -> Result<Option<NaiveDateTime>> {
            Ok(self.watermark)
        }
    }

    struct StubBse {
        pairs: Vec<ScrapedPair>,
        fail: bool,
    }

    #[async_trait]
    impl DebtTradeFetcher for StubBse {
        async fn fetch_window(
            &self,
            _window: &FetchWindow,
        ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
            if self.fail {
                return Err(FetchError::RetriesExhausted {
                    source_name: "bse".to_string(),
                    attempts: 3,
                    last: Box::new(FetchError::transport("bse", "connection reset")),
                });
            }
            Ok(self.pairs.clone())
        }

        fn source_name(&self) -> &'static str {
            "bse"
        }
    }

    struct StubNse {
        by_isin: HashMap<String, Vec<ScrapedPair>>,
        fail_isin: Option<String>,
    }

    impl StubNse {
        fn empty() -> Self {
            Self {
                by_isin: HashMap::new(),
                fail_isin: None,
            }
        }
    }

    #[async_trait]
    impl IsinHistoryFetcher for StubNse {
        async fn fetch_isin(
            &self,
            isin: &str,
            _window: &FetchWindow,
        ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
            if self.fail_isin.as_deref() == Some(isin) {
                return Err(FetchError::transport("nse", "403 from edge"));
            }
            Ok(self.by_isin.get(isin).cloned().unwrap_or_default())
        }

        fn source_name(&self) -> &'static str {
            "nse"
        }
    }

    fn orchestrator(
        bse: StubBse,
        nse: StubNse,
        store: Arc<MemoryStore>,
        runs: Arc<MemoryRunStore>,
        events: Arc<MockDomainEventSink>,
    ) -> SyncOrchestrator {
        SyncOrchestrator::new(Arc::new(bse), Arc::new(nse), store, runs, events)
    }

    fn two_bond_window() -> Vec<ScrapedPair> {
        vec![
            pair("INE001A07001", Exchange::Bse, ts(25, 10), 101.0, 50),
            pair("INE001A07001", Exchange::Bse, ts(26, 11), 102.0, 60),
            pair("INE001A07001", Exchange::Bse, ts(27, 12), 103.0, 70),
            pair("INE002B08002", Exchange::Bse, ts(25, 14), 99.5, 10),
            pair("INE002B08002", Exchange::Bse, ts(26, 15), 98.0, 20),
            pair("INE002B08002", Exchange::Bse, ts(27, 16), 97.5, 30),
        ]
    }

    #[tokio::test]
    async fn test_full_sync_creates_bonds_and_transactions() {
        let store = Arc::new(MemoryStore::default());
        let runs = Arc::new(MemoryRunStore::default());
        let events = Arc::new(MockDomainEventSink::new());
        let orch = orchestrator(
            StubBse { pairs: two_bond_window(), fail: false },
            StubNse::empty(),
            store.clone(),
            runs.clone(),
            events.clone(),
        );

        let report = orch.run_sync(None).await.unwrap();

        // Empty store selects full mode on its own.
        assert_eq!(report.mode, SyncMode::Full);
        assert_eq!(report.bonds_created, 2);
        assert_eq!(report.transactions_inserted, 6);
        assert_eq!(report.duplicates_skipped, 0);
        assert_eq!(report.isins_touched, 2);
        assert_eq!(store.transaction_count(), 6);
        assert_eq!(runs.last().status, RunStatus::Completed);

        // Summaries come from the newest print per bond.
        let bond = store.bond("INE001A07001").unwrap();
        assert_eq!(bond.last_price, 103.0);
        assert_eq!(bond.volume, 70);
    }

    #[tokio::test]
    async fn test_rerun_over_same_window_is_idempotent() {
        let store = Arc::new(MemoryStore::default());
        let make = |store: Arc<MemoryStore>| {
            orchestrator(
                StubBse { pairs: two_bond_window(), fail: false },
                StubNse::empty(),
                store,
                Arc::new(MemoryRunStore::default()),
                Arc::new(MockDomainEventSink::new()),
            )
        };

        make(store.clone()).run_sync(Some(SyncMode::Full)).await.unwrap();
        let second = make(store.clone()).run_sync(Some(SyncMode::Full)).await.unwrap();

        assert_eq!(second.bonds_created, 0);
        assert_eq!(second.transactions_inserted, 0);
        assert_eq!(second.duplicates_skipped, 6);
        assert_eq!(store.transaction_count(), 6);
    }

    #[tokio::test]
    async fn test_nse_overrides_snapshot_and_new_prints_land() {
        let store = Arc::new(MemoryStore::default());
        let mut by_isin = HashMap::new();
        // One print newer than anything BSE reported.
        by_isin.insert(
            "INE001A07001".to_string(),
            vec![pair("INE001A07001", Exchange::Nse, ts(28, 10), 104.25, 85)],
        );
        let orch = orchestrator(
            StubBse { pairs: two_bond_window(), fail: false },
            StubNse { by_isin, fail_isin: None },
            store.clone(),
            Arc::new(MemoryRunStore::default()),
            Arc::new(MockDomainEventSink::new()),
        );

        let report = orch.run_sync(Some(SyncMode::Full)).await.unwrap();

        assert_eq!(report.transactions_inserted, 7);
        let bond = store.bond("INE001A07001").unwrap();
        assert_eq!(bond.exchange, Exchange::Nse);
        assert_eq!(bond.last_price, 104.25);
        assert_eq!(bond.volume, 85);
        // The other bond never saw NSE data and keeps its BSE summary.
        assert_eq!(store.bond("INE002B08002").unwrap().last_price, 97.5);
    }

    #[tokio::test]
    async fn test_duplicate_nse_print_is_skipped_and_recompute_wins() {
        let store = Arc::new(MemoryStore::default());
        let mut by_isin = HashMap::new();
        // Same identity key as an existing BSE print: dedup must hold,
        // and recompute restores the stored print's price afterwards.
        by_isin.insert(
            "INE001A07001".to_string(),
            vec![pair("INE001A07001", Exchange::Nse, ts(27, 12), 250.0, 999)],
        );
        let orch = orchestrator(
            StubBse { pairs: two_bond_window(), fail: false },
            StubNse { by_isin, fail_isin: None },
            store.clone(),
            Arc::new(MemoryRunStore::default()),
            Arc::new(MockDomainEventSink::new()),
        );

        let report = orch.run_sync(Some(SyncMode::Full)).await.unwrap();

        assert_eq!(report.transactions_inserted, 6);
        assert_eq!(report.duplicates_skipped, 1);
        let bond = store.bond("INE001A07001").unwrap();
        assert_eq!(bond.last_price, 103.0);
        assert_eq!(bond.exchange, Exchange::Nse);
    }

    #[tokio::test]
    async fn test_bse_fetch_failure_fails_run_and_stores_nothing() {
        let store = Arc::new(MemoryStore::default());
        let runs = Arc::new(MemoryRunStore::default());
        let orch = orchestrator(
            StubBse { pairs: vec![], fail: true },
            StubNse::empty(),
            store.clone(),
            runs.clone(),
            Arc::new(MockDomainEventSink::new()),
        );

        let err = orch.run_sync(Some(SyncMode::Full)).await.unwrap_err();

        assert_eq!(err.stage, SyncStage::FetchingBse);
        assert_eq!(store.transaction_count(), 0);
        let run = runs.last();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error.unwrap().contains("fetching-bse"));
    }

    #[tokio::test]
    async fn test_unstorable_record_does_not_abort_batch() {
        let store = Arc::new(MemoryStore::failing_for("INE002B08002"));
        let orch = orchestrator(
            StubBse { pairs: two_bond_window(), fail: false },
            StubNse::empty(),
            store.clone(),
            Arc::new(MemoryRunStore::default()),
            Arc::new(MockDomainEventSink::new()),
        );

        let report = orch.run_sync(Some(SyncMode::Full)).await.unwrap();

        assert_eq!(report.storage_failures, 3);
        assert_eq!(report.transactions_inserted, 3);
        assert_eq!(report.isins_touched, 1);
        assert!(store.bond("INE002B08002").is_none());
    }

    #[tokio::test]
    async fn test_dead_isin_on_nse_does_not_fail_run() {
        let store = Arc::new(MemoryStore::default());
        let orch = orchestrator(
            StubBse { pairs: two_bond_window(), fail: false },
            StubNse {
                by_isin: HashMap::new(),
                fail_isin: Some("INE001A07001".to_string()),
            },
            store.clone(),
            Arc::new(MemoryRunStore::default()),
            Arc::new(MockDomainEventSink::new()),
        );

        let report = orch.run_sync(Some(SyncMode::Full)).await.unwrap();

        assert_eq!(report.nse_failures.len(), 1);
        assert_eq!(report.nse_failures[0].0, "INE001A07001");
        assert_eq!(report.transactions_inserted, 6);
    }

    #[tokio::test]
    async fn test_incremental_window_starts_at_watermark() {
        let store = Arc::new(MemoryStore::default());
        // Seed one bond so auto-detection picks incremental.
        store
            .upsert_bond_and_transaction(
                &pair("INE001A07001", Exchange::Bse, ts(20, 10), 100.0, 1).bond,
                &pair("INE001A07001", Exchange::Bse, ts(20, 10), 100.0, 1).trade,
            )
            .await
            .unwrap();
        let runs = Arc::new(MemoryRunStore::with_watermark(ts(28, 9)));
        let orch = orchestrator(
            StubBse { pairs: vec![], fail: false },
            StubNse::empty(),
            store,
            runs.clone(),
            Arc::new(MockDomainEventSink::new()),
        );

        let report = orch.run_sync(None).await.unwrap();

        assert_eq!(report.mode, SyncMode::Incremental);
        assert_eq!(report.window_from, NaiveDate::from_ymd_opt(2026, 8, 28).unwrap());
        assert_eq!(runs.last().mode, SyncMode::Incremental);
    }

    #[tokio::test]
    async fn test_events_emitted_for_inserts_and_completion() {
        let events = Arc::new(MockDomainEventSink::new());
        let orch = orchestrator(
            StubBse {
                pairs: vec![pair("INE001A07001", Exchange::Bse, ts(25, 10), 101.0, 50)],
                fail: false,
            },
            StubNse::empty(),
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryRunStore::default()),
            events.clone(),
        );

        orch.run_sync(Some(SyncMode::Full)).await.unwrap();

        let emitted = events.events();
        assert!(matches!(emitted[0], DomainEvent::NewTransaction(_)));
        assert!(emitted
            .iter()
            .any(|e| matches!(e, DomainEvent::BondUpdate(_))));
        assert!(matches!(
            emitted.last().unwrap(),
            DomainEvent::SyncCompleted {
                transactions_inserted: 1,
                ..
            }
        ));
    }
}
