pub mod fetcher;
pub mod orchestrator;
pub mod watermark;

pub use fetcher::{DebtTradeFetcher, FetchWindow, IsinHistoryFetcher};
pub use orchestrator::{SyncMode, SyncOrchestrator, SyncReport};
pub use watermark::{RunStatus, SyncRun, SyncRunStore};
