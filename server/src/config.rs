//! Configuration module

use std::env;
use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "nids-dev-session-secret-change-in-production";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Pool size
    pub database_max_connections: u32,

    /// Server port
    pub port: u16,

    /// Session token signing key
    pub jwt_secret: String,

    /// Session lifetime in hours
    pub session_hours: u64,

    /// Directory holding the model artifacts
    pub model_dir: PathBuf,

    /// Reserved administrator account name
    pub admin_username: String,

    /// Creates the administrator at startup when set and the account is missing
    pub admin_password: Option<String>,

    pub admin_email: String,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://nids.db?mode=rwc".to_string()),

            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),

            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),

            session_hours: env::var("SESSION_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(24),

            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("model")),

            admin_username: env::var("ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".to_string()),

            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty()),

            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@localhost".to_string()),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// True while the built-in development signing key is in use
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Case-insensitive match against the reserved admin name
    pub fn is_admin_name(&self, username: &str) -> bool {
        username.eq_ignore_ascii_case(&self.admin_username)
    }
}

#[cfg(test)]
impl Config {
    /// In-memory configuration for handler tests
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            port: 0,
            jwt_secret: "test-secret".to_string(),
            session_hours: 1,
            model_dir: PathBuf::from("../model"),
            admin_username: "admin".to_string(),
            admin_password: None,
            admin_email: "admin@localhost".to_string(),
            environment: "test".to_string(),
        }
    }
}
