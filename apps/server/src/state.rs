//! Application state wiring and tracing setup.

use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use bondboard_core::ingest::{DebtTradeFetcher, IsinHistoryFetcher, SyncOrchestrator};
use bondboard_scrape::browser::{BrowserConfig, BseBrowserFetcher, NseBrowserFetcher};
use bondboard_scrape::http::{BseHttpFetcher, NseHttpFetcher};
use bondboard_storage_sqlite::db::{self, spawn_writer};
use bondboard_storage_sqlite::{BondRepository, SyncRunRepository};

use crate::broadcast::Broadcaster;
use crate::config::{Config, FetchMode};

pub struct AppState {
    pub bonds: Arc<BondRepository>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub broadcaster: Arc<Broadcaster>,
    /// Held for the duration of a sync run; `try_lock` failing is how
    /// overlapping runs are refused.
    pub sync_lock: Arc<tokio::sync::Mutex<()>>,
}

pub fn init_tracing() {
    let log_format = std::env::var("BONDBOARD_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    db::init(&config.db_path)?;
    let pool = db::create_pool(&config.db_path)?;
    db::run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());

    let bonds = Arc::new(BondRepository::new(pool.clone(), writer.clone()));
    let runs = Arc::new(SyncRunRepository::new(pool, writer));
    let broadcaster = Arc::new(Broadcaster::new());

    let (bse, nse): (Arc<dyn DebtTradeFetcher>, Arc<dyn IsinHistoryFetcher>) =
        match config.fetch_mode {
            FetchMode::Browser => {
                let browser = BrowserConfig {
                    webdriver_url: config.webdriver_url.clone(),
                };
                (
                    Arc::new(BseBrowserFetcher::new(browser.clone())),
                    Arc::new(NseBrowserFetcher::new(browser)),
                )
            }
            FetchMode::Http => (
                Arc::new(BseHttpFetcher::new()?),
                Arc::new(NseHttpFetcher::new()?),
            ),
        };

    let orchestrator = Arc::new(SyncOrchestrator::new(
        bse,
        nse,
        bonds.clone(),
        runs,
        broadcaster.clone(),
    ));

    Ok(Arc::new(AppState {
        bonds,
        orchestrator,
        broadcaster,
        sync_lock: Arc::new(tokio::sync::Mutex::new(())),
    }))
}
