//! Exchange fetcher contracts.
//!
//! The orchestrator only sees these traits; the concrete HTTP and
//! browser-driven implementations live in the scrape crate so the core
//! stays free of network and WebDriver dependencies.

use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};

use crate::bonds::ScrapedPair;
use crate::errors::FetchError;

/// Inclusive date range handed to a fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl FetchWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// Window ending today and reaching `days` back.
    pub fn last_days(days: i64) -> Self {
        let to = Local::now().date_naive();
        Self {
            from: to - Duration::days(days),
            to,
        }
    }

    /// Window from a watermark timestamp up to today. The watermark's
    /// calendar date is included so trades printed earlier on the same
    /// day are never missed; the upsert layer deduplicates the overlap.
    pub fn since(watermark: NaiveDateTime) -> Self {
        Self {
            from: watermark.date(),
            to: Local::now().date_naive(),
        }
    }

    pub fn span_days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

impl std::fmt::Display for FetchWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// Fetches every debt-segment trade an exchange reported inside a window.
///
/// Implementations return one `ScrapedPair` per trade row and surface
/// transport, session and parse problems as [`FetchError`]; malformed
/// individual rows are skipped and logged inside the fetcher instead of
/// failing the whole window.
#[async_trait]
pub trait DebtTradeFetcher: Send + Sync {
    async fn fetch_window(
        &self,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError>;

    /// Stable name used in logs and error payloads, e.g. `"bse"`.
    fn source_name(&self) -> &'static str;
}

/// Fetches the trade history of a single security, addressed by ISIN.
#[async_trait]
pub trait IsinHistoryFetcher: Send + Sync {
    async fn fetch_isin(
        &self,
        isin: &str,
        window: &FetchWindow,
    ) -> std::result::Result<Vec<ScrapedPair>, FetchError>;

    fn source_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_last_days_spans_requested_range() {
        let window = FetchWindow::last_days(180);
        assert_eq!(window.span_days(), 180);
        assert!(window.from < window.to);
    }

    #[test]
    fn test_since_includes_watermark_date() {
        let watermark = NaiveDate::from_ymd_opt(2026, 8, 20)
            .unwrap()
            .and_hms_opt(15, 45, 0)
            .unwrap();
        let window = FetchWindow::since(watermark);
        assert_eq!(window.from, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        assert!(window.to >= window.from);
    }

    #[test]
    fn test_display_is_ordered_range() {
        let window = FetchWindow::new(
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        );
        assert_eq!(window.to_string(), "2026-01-01..2026-01-31");
    }
}
