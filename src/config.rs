//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. There are no secrets beyond the
//! optional shared API token; Cloud Run injects that as an env var.

use std::env;

/// Default root collection for all gamification documents.
pub const DEFAULT_ROOT_COLLECTION: &str = "gamification";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// GCP project ID (Firestore lives here)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Root collection under which all per-user documents are stored.
    /// Callers may override per request via `rootCollectionName`.
    pub root_collection: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Shared token required on callable requests. None disables the check
    /// (local development against the emulator).
    pub api_token: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            root_collection: DEFAULT_ROOT_COLLECTION.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            api_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            root_collection: env::var("ROOT_COLLECTION")
                .unwrap_or_else(|_| DEFAULT_ROOT_COLLECTION.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_token: env::var("API_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("GCP_PROJECT_ID", "test-id");
        env::set_var("ROOT_COLLECTION", "gamification_test");
        env::remove_var("API_TOKEN");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.gcp_project_id, "test-id");
        assert_eq!(config.root_collection, "gamification_test");
        assert_eq!(config.port, 8080);
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_blank_api_token_disables_check() {
        env::set_var("API_TOKEN", "  ");
        let config = Config::from_env().expect("Config should load");
        assert!(config.api_token.is_none());
        env::remove_var("API_TOKEN");
    }
}
