//! Exchange scrapers for the bond dashboard.
//!
//! Two acquisition paths per exchange:
//!
//! - [`http`]: plain `reqwest` clients for endpoints that answer direct
//!   requests (BSE form POST, NSE JSON API). Cheap, preferred when the
//!   endpoint cooperates.
//! - [`browser`]: WebDriver-driven scrapers via `fantoccini` for pages
//!   that only render their data after in-page interaction.
//!
//! Both paths implement the fetcher traits from `bondboard_core` and
//! share the [`retry`] policy and the row [`parse`] helpers.

pub mod browser;
pub mod http;
pub mod parse;
pub mod retry;

pub use browser::{BseBrowserFetcher, BrowserConfig, NseBrowserFetcher};
pub use http::{BseHttpFetcher, NseHttpFetcher};
pub use retry::{Backoff, RetryPolicy};
