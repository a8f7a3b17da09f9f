mod api;
mod broadcast;
mod config;
mod error;
mod scheduler;
mod state;

use config::Config;
use state::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_tracing();
    let state = build_state(&config).await?;

    // Background hourly sync against the exchanges.
    scheduler::start_sync_scheduler(state.clone());

    let router = api::app_router(state, &config);
    tracing::info!("Listening on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
