//! Application configuration loaded from environment variables.
//!
//! Secrets are injected as environment variables by the deployment (Cloud Run
//! secret bindings) and read once at startup.

use chrono::FixedOffset;
use std::env;

/// Lookback window used by manual and scheduled syncs.
pub const RECENT_SYNC_DAYS: u32 = 30;
/// Smallest accepted custom sync window.
pub const MIN_SYNC_DAYS: u32 = 1;
/// Largest accepted custom sync window.
pub const MAX_SYNC_DAYS: u32 = 540;
/// Commits per push whose line stats are looked up.
pub const DEFAULT_COMMIT_DETAIL_LIMIT: usize = 5;
/// Cloud Tasks queue that carries per-user sync jobs.
pub const SYNC_QUEUE_NAME: &str = "user-sync";

const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 120;

/// Which storage implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// GitHub REST API base URL
    pub github_api_url: String,
    /// GitHub web base URL (OAuth authorize/token endpoints)
    pub github_oauth_url: String,
    /// GitHub OAuth app client ID
    pub github_client_id: String,
    /// Frontend URL (allowed CORS origin)
    pub frontend_url: String,
    /// Public URL of this API (Cloud Tasks target)
    pub api_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// GCP region hosting the task queue
    pub gcp_region: String,
    /// Server port
    pub port: u16,
    /// Storage backend
    pub store_backend: StoreBackend,
    /// Offset that defines where one activity day ends and the next begins
    pub day_boundary: FixedOffset,
    /// Commits per push resolved to line stats
    pub commit_detail_limit: usize,
    /// Upper bound on one sync invoked over HTTP
    pub sync_timeout_secs: u64,

    // --- Secrets ---
    /// GitHub OAuth app client secret
    pub github_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter (raw bytes)
    pub oauth_state_key: Vec<u8>,
    /// Bearer secret presented by Cloud Scheduler on `/tasks/*`
    pub scheduler_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("firestore") | Err(_) => StoreBackend::Firestore,
            Ok(_) => return Err(ConfigError::Invalid("STORE_BACKEND")),
        };

        let offset_minutes: i32 = match env::var("DAY_BOUNDARY_UTC_OFFSET_MINUTES") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("DAY_BOUNDARY_UTC_OFFSET_MINUTES"))?,
            Err(_) => 0,
        };
        let day_boundary = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or(ConfigError::Invalid("DAY_BOUNDARY_UTC_OFFSET_MINUTES"))?;

        let commit_detail_limit = match env::var("COMMIT_DETAIL_LIMIT") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("COMMIT_DETAIL_LIMIT"))?,
            Err(_) => DEFAULT_COMMIT_DETAIL_LIMIT,
        };

        Ok(Self {
            github_api_url: env::var("GITHUB_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_oauth_url: env::var("GITHUB_OAUTH_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://github.com".to_string()),
            github_client_id: env::var("GITHUB_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            gcp_region: env::var("GCP_REGION").unwrap_or_else(|_| "us-west1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            day_boundary,
            commit_detail_limit,
            sync_timeout_secs: env::var("SYNC_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS),

            github_client_secret: env::var("GITHUB_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GITHUB_CLIENT_SECRET"))?,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
            scheduler_secret: env::var("SCHEDULER_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SCHEDULER_SECRET"))?,
        })
    }

    /// Deterministic configuration for tests.
    pub fn test_default() -> Self {
        Self {
            github_api_url: "http://127.0.0.1:9".to_string(),
            github_oauth_url: "http://127.0.0.1:9".to_string(),
            github_client_id: "test_client_id".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            gcp_project_id: "test-project".to_string(),
            gcp_region: "us-west1".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            day_boundary: FixedOffset::east_opt(0).expect("zero offset is valid"),
            commit_detail_limit: DEFAULT_COMMIT_DETAIL_LIMIT,
            sync_timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
            github_client_secret: "test_client_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_oauth_state_key_32_bytes!!!".to_vec(),
            scheduler_secret: "test_scheduler_secret".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; keep everything that touches them in one test.
    #[test]
    fn test_config_from_env() {
        env::set_var("GITHUB_CLIENT_ID", "client");
        env::set_var("GITHUB_CLIENT_SECRET", "secret");
        env::set_var("OAUTH_STATE_KEY", "state_key");
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("SCHEDULER_SECRET", " sched ");
        env::set_var("DAY_BOUNDARY_UTC_OFFSET_MINUTES", "330");
        env::set_var("COMMIT_DETAIL_LIMIT", "3");
        env::set_var("STORE_BACKEND", "memory");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.scheduler_secret, "sched");
        assert_eq!(config.day_boundary.local_minus_utc(), 330 * 60);
        assert_eq!(config.commit_detail_limit, 3);
        assert_eq!(config.store_backend, StoreBackend::Memory);

        env::set_var("DAY_BOUNDARY_UTC_OFFSET_MINUTES", "not-a-number");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid("DAY_BOUNDARY_UTC_OFFSET_MINUTES"))
        ));

        env::remove_var("DAY_BOUNDARY_UTC_OFFSET_MINUTES");
        env::remove_var("COMMIT_DETAIL_LIMIT");
        env::remove_var("STORE_BACKEND");
        let config = Config::from_env().expect("Config should load");
        assert_eq!(config.day_boundary.local_minus_utc(), 0);
        assert_eq!(config.commit_detail_limit, DEFAULT_COMMIT_DETAIL_LIMIT);
        assert_eq!(config.store_backend, StoreBackend::Firestore);
    }
}
