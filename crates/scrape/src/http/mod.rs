//! Direct HTTP fetchers.
//!
//! Both exchanges gate their data endpoints behind cookies issued on a
//! landing page, so every attempt warms the session up with a GET
//! before the real request. Clients are built once and reused; the
//! cookie jar lives with the client.

use std::time::Duration;

use bondboard_core::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};

pub mod bse;
pub mod nse;

pub use bse::BseHttpFetcher;
pub use nse::NseHttpFetcher;

/// Both exchanges fingerprint clients; a browser user agent is required.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn browser_like_client(
    source_name: &str,
    accept: &'static str,
    referer: &'static str,
) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(accept));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(REFERER, HeaderValue::from_static(referer));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .cookie_store(true)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| FetchError::session(source_name, e.to_string()))
}

pub(crate) fn transport_error(source_name: &str, err: reqwest::Error) -> FetchError {
    FetchError::transport(source_name, err.to_string())
}
