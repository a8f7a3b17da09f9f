//! NSE security-wise trades fetcher over the JSON API.

use async_trait::async_trait;
use bondboard_core::ingest::{FetchWindow, IsinHistoryFetcher};
use bondboard_core::{
    BondCandidate, Exchange, FetchError, ScrapedPair, TradeCandidate, ValidationError,
};
use log::{debug, info};
use serde::Deserialize;

use super::{browser_like_client, transport_error};
use crate::parse::{collect_rows, parse_trade_date, NSE_DATE};
use crate::retry::RetryPolicy;

const SOURCE: &str = "nse";
const LANDING_URL: &str = "https://www.nseindia.com/";
const HISTORY_URL: &str = "https://www.nseindia.com/api/historical/security-wise-trades";
/// Query segment id for the debt market.
const DEBT_SEGMENT: &str = "13";
/// Date format the query parameters use, distinct from the dates in
/// the response payload.
const QUERY_DATE: &str = "%d-%m-%Y";

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    data: Vec<HistoryRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryRow {
    #[serde(default)]
    date: String,
    #[serde(default)]
    close: f64,
    #[serde(default)]
    volume: i64,
}

pub struct NseHttpFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl NseHttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = browser_like_client(
            SOURCE,
            "application/json, text/plain, */*",
            LANDING_URL,
        )?;
        Ok(Self {
            client,
            retry: RetryPolicy::http(SOURCE),
        })
    }

    async fn request_history(
        &self,
        isin: &str,
        window: &FetchWindow,
    ) -> Result<HistoryResponse, FetchError> {
        // The API rejects sessions without the landing-page cookies.
        self.client
            .get(LANDING_URL)
            .send()
            .await
            .map_err(|e| transport_error(SOURCE, e))?;

        let from_date = window.from.format(QUERY_DATE).to_string();
        let to_date = window.to.format(QUERY_DATE).to_string();
        let response = self
            .client
            .get(HISTORY_URL)
            .query(&[
                ("symbol", isin),
                ("segmentLink", DEBT_SEGMENT),
                ("symbolCount", "1"),
                ("series", "ALL"),
                ("fromDate", from_date.as_str()),
                ("toDate", to_date.as_str()),
                ("dataType", "PRICE"),
            ])
            .send()
            .await
            .map_err(|e| transport_error(SOURCE, e))?
            .error_for_status()
            .map_err(|e| transport_error(SOURCE, e))?;

        response
            .json::<HistoryResponse>()
            .await
            .map_err(|e| FetchError::page_parse(SOURCE, e.to_string()))
    }
}

#[async_trait]
impl IsinHistoryFetcher for NseHttpFetcher {
    async fn fetch_isin(
        &self,
        isin: &str,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError> {
        debug!("fetching NSE history for {isin} over {window}");
        let payload = self.retry.run(|_| self.request_history(isin, window)).await?;
        let rows: Vec<Vec<String>> = payload
            .data
            .iter()
            .map(|row| {
                vec![
                    row.date.clone(),
                    row.close.to_string(),
                    row.volume.to_string(),
                ]
            })
            .collect();
        let pairs = collect_rows(SOURCE, &rows, |cells| decode_history_cells(isin, cells));
        info!("NSE returned {} prints for {}", pairs.len(), isin);
        Ok(pairs)
    }

    fn source_name(&self) -> &'static str {
        SOURCE
    }
}

fn decode_history_cells(isin: &str, cells: &[String]) -> Result<ScrapedPair, ValidationError> {
    let [date, close, volume] = cells else {
        return Err(ValidationError::InvalidInput(format!(
            "expected 3 normalized cells, got {}",
            cells.len()
        )));
    };
    let timestamp = parse_trade_date(date, NSE_DATE)?;
    let price: f64 = close
        .parse()
        .map_err(ValidationError::NumberParse)?;
    let quantity: i64 = volume
        .parse()
        .map_err(ValidationError::IntegerParse)?;

    // Name and issuer stay blank; NSE's payload has neither and blanks
    // never overwrite what BSE already provided.
    Ok(ScrapedPair {
        bond: BondCandidate::with_defaults(isin, "", "", Exchange::Nse, price, quantity),
        trade: TradeCandidate {
            timestamp,
            price,
            quantity,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_payload_rows() {
        let payload: HistoryResponse = serde_json::from_str(
            r#"{"data":[
                {"date":"28-Aug-2026","close":104.25,"volume":85},
                {"date":"27-Aug-2026","close":103.10,"volume":40}
            ]}"#,
        )
        .unwrap();
        assert_eq!(payload.data.len(), 2);
        let cells = vec![
            payload.data[0].date.clone(),
            payload.data[0].close.to_string(),
            payload.data[0].volume.to_string(),
        ];
        let pair = decode_history_cells("INE001A07001", &cells).unwrap();
        assert_eq!(pair.trade.price, 104.25);
        assert_eq!(pair.trade.quantity, 85);
        assert_eq!(pair.bond.exchange, Exchange::Nse);
        assert_eq!(pair.bond.name, "");
    }

    #[test]
    fn test_missing_fields_default_instead_of_failing_deserialize() {
        let payload: HistoryResponse =
            serde_json::from_str(r#"{"data":[{"date":"28-Aug-2026"}]}"#).unwrap();
        assert_eq!(payload.data[0].close, 0.0);
        assert_eq!(payload.data[0].volume, 0);
    }

    #[test]
    fn test_empty_or_absent_data_is_no_prints() {
        let payload: HistoryResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.data.is_empty());
    }

    #[test]
    fn test_unparseable_date_rejects_row() {
        let cells = vec!["tomorrow".to_string(), "1.0".to_string(), "1".to_string()];
        assert!(matches!(
            decode_history_cells("INE001A07001", &cells),
            Err(ValidationError::DateTimeParse(_))
        ));
    }
}
