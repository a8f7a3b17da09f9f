//! BSE debt-search fetcher over plain HTTP.
//!
//! The debt search page is classic WebForms: a POST with the form's
//! field names returns the same page with the results grid rendered
//! server side. Grid layout here is OHLC, not the name/issuer layout
//! the interactive page renders.

use async_trait::async_trait;
use bondboard_core::ingest::{DebtTradeFetcher, FetchWindow};
use bondboard_core::{
    BondCandidate, Exchange, FetchError, ScrapedPair, TradeCandidate, ValidationError,
};
use log::{info, warn};
use scraper::{Html, Selector};

use super::{browser_like_client, transport_error};
use crate::parse::{clean_numeric, clean_volume, collect_rows, parse_trade_date, BSE_FORM_DATE};
use crate::retry::RetryPolicy;

const SOURCE: &str = "bse";
const SEARCH_PAGE_URL: &str = "https://www.bseindia.com/markets/debt/debt_search.aspx";
const SEARCH_RESULT_URL: &str = "https://www.bseindia.com/markets/debt/debt_search_result.aspx";
const RESULTS_TABLE_SELECTOR: &str = "#ctl00_ContentPlaceHolder1_gvDebt";

pub struct BseHttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl BseHttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = browser_like_client(
            SOURCE,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            SEARCH_PAGE_URL,
        )?;
        Ok(Self {
            client,
            retry: RetryPolicy::http(SOURCE),
        })
    }

    async fn request_results_page(&self, window: &FetchWindow) -> Result<String, FetchError> {
        // Cookie warm-up; the result endpoint 403s cold sessions.
        self.client
            .get(SEARCH_PAGE_URL)
            .send()
            .await
            .map_err(|e| transport_error(SOURCE, e))?;

        let form = [
            (
                "ctl00$ContentPlaceHolder1$txtFromDate",
                window.from.format(BSE_FORM_DATE).to_string(),
            ),
            (
                "ctl00$ContentPlaceHolder1$txtToDate",
                window.to.format(BSE_FORM_DATE).to_string(),
            ),
            ("ctl00$ContentPlaceHolder1$btnSubmit", "Submit".to_string()),
        ];
        let response = self
            .client
            .post(SEARCH_RESULT_URL)
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error(SOURCE, e))?
            .error_for_status()
            .map_err(|e| transport_error(SOURCE, e))?;
        response
            .text()
            .await
            .map_err(|e| transport_error(SOURCE, e))
    }
}

#[async_trait]
impl DebtTradeFetcher for BseHttpFetcher {
    async fn fetch_window(
        &self,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
        info!("fetching BSE debt trades over HTTP for {window}");
        let html = self.retry.run(|_| self.request_results_page(window)).await?;
        let pairs = parse_results_page(&html);
        info!("BSE returned {} trade rows for {}", pairs.len(), window);
        Ok(pairs)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}

/// Pull the results grid out of the page. A page without the grid means
/// the window had no trades, which BSE renders as no table at all.
fn parse_results_page(html: &str) -> Vec<ScrapedPair> {
    let document = Html::parse_document(html);
    let Ok(table_selector) = Selector::parse(RESULTS_TABLE_SELECTOR) else {
        return Vec::new();
    };
    let Ok(row_selector) = Selector::parse("tr") else {
        return Vec::new();
    };
    let Ok(cell_selector) = Selector::parse("td") else {
        return Vec::new();
    };
    let Some(table) = document.select(&table_selector).next() else {
        warn!("no results grid in BSE response, treating window as empty");
        return Vec::new();
    };

    let rows: Vec<Vec<String>> = table
        .select(&row_selector)
        .skip(1)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();
    collect_rows(SOURCE, &rows, |cells| decode_ohlc_row(cells))
}

/// OHLC grid layout: `[0]` ISIN, `[1]` date, `[2..=5]` open/high/low/
/// close, `[6]` volume. Close is the trade price.
fn decode_ohlc_row(cells: &[String]) -> Result<ScrapedPair, ValidationError> {
    if cells.len() < 8 {
        return Err(ValidationError::InvalidInput(format!(
            "expected at least 8 columns, got {}",
            cells.len()
        )));
    }
    let isin = cells[0].trim();
    if isin.is_empty() {
        return Err(ValidationError::MissingField("isin".to_string()));
    }
    let timestamp = parse_trade_date(&cells[1], BSE_FORM_DATE)?;
    let close = clean_numeric(&cells[5])?;
    let volume = clean_volume(&cells[6])?;

    Ok(ScrapedPair {
        bond: BondCandidate::with_defaults(
            isin,
            format!("Bond {isin}"),
            "Unknown",
            Exchange::Bse,
            close,
            volume,
        ),
        trade: TradeCandidate {
            timestamp,
            price: close,
            quantity: volume,
        },
    })
}
