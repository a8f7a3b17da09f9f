//! WebDriver-driven fetchers.
//!
//! BSE's interactive debt search and NSE's historical-trades page only
//! render their tables after in-page interaction, so these fetchers
//! drive a headless Chrome through a WebDriver endpoint. Sessions are
//! scoped to a single fetch attempt and torn down on every exit path;
//! the exchanges throttle lingering sessions hard.

use std::time::Duration;

use bondboard_core::FetchError;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use log::{debug, warn};

pub mod bse;
pub mod nse;

pub use bse::BseBrowserFetcher;
pub use nse::NseBrowserFetcher;

/// Default bounded wait for interactive elements.
pub(crate) const ELEMENT_WAIT: Duration = Duration::from_secs(30);
/// Shorter wait used per selector when trying layered fallbacks.
pub(crate) const INPUT_WAIT: Duration = Duration::from_secs(20);
/// BSE renders the results grid server side and can take minutes.
pub(crate) const RESULTS_WAIT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// WebDriver endpoint, e.g. a chromedriver listening locally.
    pub webdriver_url: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
        }
    }
}

/// One WebDriver session, owned by a single fetch attempt.
pub(crate) struct BrowserSession {
    client: Client,
    source_name: &'static str,
}

impl BrowserSession {
    pub(crate) async fn connect(
        config: &BrowserConfig,
        source_name: &'static str,
    ) -> Result<Self, FetchError> {
        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-gpu",
                    "--disable-dev-shm-usage",
                    "--disable-blink-features=AutomationControlled",
                    "--window-size=1920,1080",
                ]
            }),
        );
        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| FetchError::session(source_name, e.to_string()))?;
        Ok(Self {
            client,
            source_name,
        })
    }

    fn session_error(&self, err: CmdError) -> FetchError {
        FetchError::session(self.source_name, err.to_string())
    }

    pub(crate) async fn goto(&self, url: &str) -> Result<(), FetchError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| self.session_error(e))
    }

    /// Bounded wait for an element; a timeout is its own error variant
    /// so callers can tell a slow page from a broken session.
    pub(crate) async fn wait_for(
        &self,
        css: &str,
        timeout: Duration,
    ) -> Result<Element, FetchError> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
            .map_err(|e| match e {
                CmdError::WaitTimeout => FetchError::ElementWaitTimeout {
                    source_name: self.source_name.to_string(),
                    selector: css.to_string(),
                    waited_secs: timeout.as_secs(),
                },
                other => self.session_error(other),
            })
    }

    /// Try each selector in order with a bounded wait; the page markup
    /// shifts between deploys, so inputs are located by layered
    /// fallbacks rather than a single id.
    pub(crate) async fn wait_for_any(
        &self,
        selectors: &[&str],
        each: Duration,
    ) -> Result<Element, FetchError> {
        for css in selectors {
            match self.wait_for(css, each).await {
                Ok(element) => return Ok(element),
                Err(e) => debug!("{}: selector {} not usable: {}", self.source_name, css, e),
            }
        }
        Err(FetchError::session(
            self.source_name,
            format!("none of the selectors matched: {}", selectors.join(", ")),
        ))
    }

    /// Clear a text input found via fallback selectors and type into it.
    pub(crate) async fn fill(&self, selectors: &[&str], value: &str) -> Result<(), FetchError> {
        let mut element = self.wait_for_any(selectors, INPUT_WAIT).await?;
        element.clear().await.map_err(|e| self.session_error(e))?;
        element
            .send_keys(value)
            .await
            .map_err(|e| self.session_error(e))
    }

    /// Click an element, falling back to a scripted click when the
    /// direct one is rejected (overlays intercept clicks on both
    /// exchanges).
    pub(crate) async fn click(&self, css: &str, timeout: Duration) -> Result<(), FetchError> {
        let element = self.wait_for(css, timeout).await?;
        match element.click().await {
            Ok(_) => Ok(()),
            Err(click_err) => {
                warn!(
                    "{}: direct click on {} failed ({}), trying scripted click",
                    self.source_name, css, click_err
                );
                self.client
                    .execute(
                        "document.querySelector(arguments[0]).click();",
                        vec![serde_json::Value::String(css.to_string())],
                    )
                    .await
                    .map(|_| ())
                    .map_err(|e| self.session_error(e))
            }
        }
    }

    pub(crate) async fn outer_html(&self, mut element: Element) -> Result<String, FetchError> {
        element
            .html(false)
            .await
            .map_err(|e| self.session_error(e))
    }

    /// Tear the session down; called on success and failure paths alike.
    pub(crate) async fn close(self) {
        if let Err(e) = self.client.close().await {
            warn!("{}: failed to close browser session: {}", self.source_name, e);
        }
    }
}
