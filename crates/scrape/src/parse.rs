//! Row-level parsing shared by the HTTP and browser fetchers.
//!
//! The exchanges publish messy tables: thousands separators, blank
//! cells, and a different date format per page. Blank numeric cells
//! decode to zero, matching how the exchanges render "no value".
//! One malformed row is logged and skipped; only a missing table or
//! undecodable payload fails the fetch.

use bondboard_core::{
    BondCandidate, Exchange, ScrapedPair, TradeCandidate, ValidationError,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use scraper::{Html, Selector};

/// Date format in the BSE results grid rendered by the browser flow.
pub const BSE_PAGE_DATE: &str = "%d/%m/%Y";
/// Date format BSE's form endpoint accepts and echoes back.
pub const BSE_FORM_DATE: &str = "%d-%m-%Y";
/// Date format used by both NSE paths, e.g. `28-Aug-2026`.
pub const NSE_DATE: &str = "%d-%b-%Y";

/// Parse a price-like cell. Blank means "no value" on both exchanges
/// and decodes to `0.0`; thousands separators are stripped.
pub fn clean_numeric(raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    Ok(trimmed.replace(',', "").parse::<f64>()?)
}

/// Parse a volume-like cell; blank decodes to `0`.
pub fn clean_volume(raw: &str) -> Result<i64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    Ok(trimmed.replace(',', "").parse::<i64>()?)
}

/// Parse a trade date in the given format to a midnight timestamp.
/// The exchanges report dates only, so midnight is the identity
/// timestamp every source agrees on for deduplication.
pub fn parse_trade_date(raw: &str, format: &str) -> Result<NaiveDateTime, ValidationError> {
    let date = NaiveDate::parse_from_str(raw.trim(), format)?;
    Ok(date.and_time(NaiveTime::MIN))
}

fn selector(css: &str) -> Result<Selector, ValidationError> {
    Selector::parse(css)
        .map_err(|e| ValidationError::InvalidInput(format!("bad selector {css}: {e}")))
}

/// Extract the cell texts of every data row in an HTML table, skipping
/// the header row.
pub fn table_rows(table_html: &str) -> Result<Vec<Vec<String>>, ValidationError> {
    let fragment = Html::parse_fragment(table_html);
    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    let rows = fragment
        .select(&row_selector)
        .skip(1)
        .map(|row| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();
    Ok(rows)
}

/// Decode one row of the BSE results grid. Layout:
/// `[0]` ISIN, `[1]` trade date, `[2]` security name, `[3]` issuer,
/// `[5]` price, `[6]` quantity.
pub fn bse_grid_row(cells: &[String]) -> Result<ScrapedPair, ValidationError> {
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
    let timestamp = parse_trade_date(&cells[1], BSE_PAGE_DATE)?;
    let price = clean_numeric(&cells[5])?;
    let quantity = clean_volume(&cells[6])?;

    let name = if cells[2].trim().is_empty() {
        format!("Bond {isin}")
    } else {
        cells[2].trim().to_string()
    };
    let issuer = if cells[3].trim().is_empty() {
        "Unknown".to_string()
    } else {
        cells[3].trim().to_string()
    };

    Ok(ScrapedPair {
        bond: BondCandidate::with_defaults(isin, name, issuer, Exchange::Bse, price, quantity),
        trade: TradeCandidate {
            timestamp,
            price,
            quantity,
        },
    })
}

/// Decode one row of the NSE security-wise trades table. Layout:
/// `[0]` trade date, `[1]` price, `[3]` quantity. NSE rows carry no
/// name or issuer; those stay blank so they never clobber BSE's.
pub fn nse_history_row(isin: &str, cells: &[String]) -> Result<ScrapedPair, ValidationError> {
    if cells.len() < 7 {
        return Err(ValidationError::InvalidInput(format!(
            "expected at least 7 columns, got {}",
            cells.len()
        )));
    }
    let timestamp = parse_trade_date(&cells[0], NSE_DATE)?;
    let price = clean_numeric(&cells[1])?;
    let quantity = clean_volume(&cells[3])?;

    Ok(ScrapedPair {
        bond: BondCandidate::with_defaults(isin, "", "", Exchange::Nse, price, quantity),
        trade: TradeCandidate {
            timestamp,
            price,
            quantity,
        },
    })
}

/// Run a row decoder over every row, keeping the good ones and logging
/// the rest. This is the single malformed-row policy for all sources.
pub fn collect_rows<F>(source_name: &str, rows: &[Vec<String>], decode: F) -> Vec<ScrapedPair>
where
    F: Fn(&[String]) -> Result<ScrapedPair, ValidationError>,
{
    let mut pairs = Vec::with_capacity(rows.len());
    for (index, cells) in rows.iter().enumerate() {
        match decode(cells) {
            Ok(pair) => pairs.push(pair),
            Err(e) => warn!("{source_name}: skipping row {index}: {e}"),
        }
    }
    pairs
}
