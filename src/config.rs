use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_NETWORK_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

pub const DEFAULT_LOGIN_ROUTE: &str = "/login";
pub const DEFAULT_FALLBACK_ROUTE: &str = "/dashboard";

/// Where the client is running. Gates request/response wire logging only;
/// behavior is identical in both environments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base API URL including the version prefix, e.g.
    /// `https://api.drivehub.example/api/v1`
    pub base_url: String,

    /// Deployment environment name
    pub environment: Environment,

    // HTTP client
    pub request_timeout_secs: u64,
    pub network_retries: u32,
    pub retry_delay_ms: u64,

    /// SQLite file holding the persisted session
    pub session_file: PathBuf,

    // Routes the session layer redirects to
    pub login_route: String,
    pub fallback_route: String,
}

impl ClientConfig {
    /// Load configuration from the environment (reading `.env` if present).
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = ClientConfig {
            base_url: std::env::var("DRIVEHUB_API_URL")
                .context("DRIVEHUB_API_URL is required (set it in the environment or a .env file)")?,

            environment: parse_environment(&std::env::var("DRIVEHUB_ENV").unwrap_or_default()),

            request_timeout_secs: std::env::var("HTTP_REQUEST_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),

            network_retries: std::env::var("HTTP_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NETWORK_RETRIES),

            retry_delay_ms: std::env::var("HTTP_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_DELAY_MS),

            session_file: match std::env::var("DRIVEHUB_SESSION_FILE") {
                Ok(path) => expand_tilde(&path),
                Err(_) => default_session_file()?,
            },

            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            fallback_route: DEFAULT_FALLBACK_ROUTE.to_string(),
        };

        Ok(config)
    }

    /// Configuration for a given API base URL with defaults for everything
    /// else. Handy for tests and for embedders that wire their own storage.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            environment: Environment::Production,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            network_retries: DEFAULT_NETWORK_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            session_file: default_session_file()
                .unwrap_or_else(|_| std::env::temp_dir().join("drivehub").join("session.sqlite3")),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            fallback_route: DEFAULT_FALLBACK_ROUTE.to_string(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("DRIVEHUB_API_URL is not a valid URL: {}", self.base_url))?;
        match url.scheme() {
            "http" | "https" => {}
            other => anyhow::bail!("DRIVEHUB_API_URL must use http or https, got: {}", other),
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("HTTP_REQUEST_TIMEOUT must be at least 1 second");
        }

        Ok(())
    }
}

/// Expand tilde (~) in file paths to user's home directory
fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Default location of the persisted session database
fn default_session_file() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Could not determine the user data directory")?;
    Ok(data_dir.join("drivehub").join("session.sqlite3"))
}

/// Parse environment name from string
fn parse_environment(s: &str) -> Environment {
    match s.trim().to_lowercase().as_str() {
        "development" | "dev" => Environment::Development,
        _ => Environment::Production,
    }
}
