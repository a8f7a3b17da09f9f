//! BSE debt-search fetcher driving the interactive page.

use async_trait::async_trait;
use bondboard_core::ingest::{DebtTradeFetcher, FetchWindow};
use bondboard_core::{FetchError, ScrapedPair};
use log::info;

use super::{BrowserConfig, BrowserSession, ELEMENT_WAIT, RESULTS_WAIT};
use crate::parse::{bse_grid_row, collect_rows, table_rows, BSE_PAGE_DATE};
use crate::retry::RetryPolicy;

const SOURCE: &str = "bse";
const SEARCH_URL: &str = "https://www.bseindia.com/markets/debt/debt_search.aspx";
const RETAIL_TRADES_RADIO: &str = "#ContentPlaceHolder1_rdbtrp";
const SUBMIT_BUTTON: &str = "#ContentPlaceHolder1_btnSubmit";
const RESULTS_TABLE: &str = "#ContentPlaceHolder1_gvDebt";

/// The from/to inputs have moved between id, name, and markup variants
/// across BSE deploys; all known forms are tried in order.
const FROM_DATE_SELECTORS: &[&str] = &[
    "#ContentPlaceHolder1_txtFromDate",
    "input[name='ctl00$ContentPlaceHolder1$txtFromDate']",
    "input[type='text'][name*='txtFromDate']",
];
const TO_DATE_SELECTORS: &[&str] = &[
    "#ContentPlaceHolder1_txtTodate",
    "input[name='ctl00$ContentPlaceHolder1$txtTodate']",
    "input[type='text'][name*='txtTodate']",
];

pub struct BseBrowserFetcher {
    config: BrowserConfig,
    retry: RetryPolicy,
}

impl BseBrowserFetcher {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            retry: RetryPolicy::browser(SOURCE),
        }
    }

    /// One full attempt: fresh session, drive the form, scrape the
    /// grid, always tear the session down.
    async fn fetch_once(&self, window: &FetchWindow) -> Result<Vec<ScrapedPair>, FetchError> {
        let session = BrowserSession::connect(&self.config, SOURCE).await?;
        let result = self.drive(&session, window).await;
        session.close().await;
        result
    }

    async fn drive(
        &self,
        session: &BrowserSession,
        window: &FetchWindow,
    ) -> Result<Vec<ScrapedPair>, FetchError> {
        session.goto(SEARCH_URL).await?;
        session.click(RETAIL_TRADES_RADIO, ELEMENT_WAIT).await?;

        let from = window.from.format(BSE_PAGE_DATE).to_string();
        let to = window.to.format(BSE_PAGE_DATE).to_string();
        session.fill(FROM_DATE_SELECTORS, &from).await?;
        session.fill(TO_DATE_SELECTORS, &to).await?;

        session.click(SUBMIT_BUTTON, ELEMENT_WAIT).await?;

        // The grid is rendered server side after submit and can take
        // minutes on wide windows.
        let table = session.wait_for(RESULTS_TABLE, RESULTS_WAIT).await?;
        let html = session.outer_html(table).await?;

        let rows = table_rows(&html).map_err(|e| FetchError::page_parse(SOURCE, e.to_string()))?;
        Ok(collect_rows(SOURCE, &rows, |cells| bse_grid_row(cells)))
    }
}

#[async_trait]
impl DebtTradeFetcher for BseBrowserFetcher {
    async fn fetch_window(
        &self,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
        info!("fetching BSE debt trades via browser for {window}");
        let pairs = self.retry.run(|_| self.fetch_once(window)).await?;
        info!("BSE returned {} trade rows for {}", pairs.len(), window);
        Ok(pairs)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}
