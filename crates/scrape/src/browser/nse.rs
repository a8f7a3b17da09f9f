//! NSE security-wise trades fetcher driving the historical-data page.

use async_trait::async_trait;
use bondboard_core::ingest::{FetchWindow, IsinHistoryFetcher};
use bondboard_core::{FetchError, ScrapedPair};
use log::{debug, info};

use super::{BrowserConfig, BrowserSession, ELEMENT_WAIT};
use crate::parse::{collect_rows, nse_history_row, table_rows};
use crate::retry::RetryPolicy;

const SOURCE: &str = "nse";
const HISTORY_URL: &str = "https://www.nseindia.com/historical/security-wise-trades-data";
const ISIN_INPUT: &str = "#hpReportISINSearchInput";
const SEARCH_BUTTON: &str = "#CFanncEquity-download";
const RESULTS_TABLE: &str = "table";

pub struct NseBrowserFetcher {
    config: BrowserConfig,
    retry: RetryPolicy,
}

impl NseBrowserFetcher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::browser(SOURCE),
        }
    }

    async fn fetch_once(&self, isin: &str) -> Result<Vec<ScrapedPair>, FetchError> {
        let session = BrowserSession::connect(&self.config, SOURCE).await?;
        let result = self.drive(&session, isin).await;
        session.close().await;
        result
    }

    async fn drive(
        &self,
        session: &BrowserSession,
        isin: &str,
    ) -> Result<Vec<ScrapedPair>, FetchError> {
        session.goto(HISTORY_URL).await?;
        session.fill(&[ISIN_INPUT], isin).await?;
        session.click(SEARCH_BUTTON, ELEMENT_WAIT).await?;

        let table = session.wait_for(RESULTS_TABLE, ELEMENT_WAIT).await?;
        let html = session.outer_html(table).await?;

        let rows = table_rows(&html).map_err(|e| FetchError::page_parse(SOURCE, e.to_string()))?;
        Ok(collect_rows(SOURCE, &rows, |cells| {
            nse_history_row(isin, cells)
        }))
    }
}

#[async_trait]
impl IsinHistoryFetcher for NseBrowserFetcher {
    async fn fetch_isin(
        &self,
        isin: &str,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
        // The page always shows the security's recent history; the
        // window only scopes which prints the caller keeps.
        debug!("fetching NSE history via browser for {isin} over {window}");
        let pairs = self.retry.run(|_| self.fetch_once(isin)).await?;
        let kept: Vec<ScrapedPair> = pairs
            .into_iter()
            .filter(|pair| {
                let date = pair.trade.timestamp.date();
                date >= window.from && date <= window.to
            })
            .collect();
        info!("NSE returned {} prints for {}", kept.len(), isin);
        Ok(kept)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
