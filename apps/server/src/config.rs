//! Server configuration from environment variables.

/// Which acquisition path the fetchers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Drive a headless browser through WebDriver. Default; survives the
    /// exchanges' bot defenses better than plain requests.
    Browser,
    /// Plain HTTP clients against the form/JSON endpoints.
    Http,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub db_path: String,
    pub webdriver_url: String,
    pub fetch_mode: FetchMode,
    /// Origin allowed by CORS, i.e. where the dashboard frontend runs.
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        let fetch_mode = match std::env::var("BONDBOARD_FETCH_MODE").as_deref() {
            Ok("http") => FetchMode::Http,
            _ => FetchMode::Browser,
        };
        Self {
            listen_addr: env_or("BONDBOARD_LISTEN_ADDR", "0.0.0.0:8000"),
            db_path: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| env_or("BONDBOARD_DB_PATH", "data/bondboard.db")),
            webdriver_url: env_or("BONDBOARD_WEBDRIVER_URL", "http://localhost:4444"),
            fetch_mode,
            cors_origin: env_or("BONDBOARD_CORS_ORIGIN", "http://localhost:3000"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
