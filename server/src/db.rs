//! Database module - SQLite connection, schema and admin bootstrap

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::config::Config;
use crate::credentials;
use crate::models::{CreateUser, User, UserRole};

/// Create database connection pool
pub async fn create_pool(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    // An in-memory database lives and dies with its connection
    SqlitePoolOptions::new()
        .max_connections(config.database_max_connections.max(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(&config.database_url)
        .await
}

/// Apply the schema
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Create the administrator account from `ADMIN_PASSWORD` if it is missing.
/// Returns true when an account was created.
pub async fn ensure_admin(pool: &SqlitePool, config: &Config) -> anyhow::Result<bool> {
    let Some(password) = config.admin_password.as_deref() else {
        return Ok(false);
    };

    if User::find_by_username(pool, &config.admin_username).await?.is_some() {
        return Ok(false);
    }

    let password_hash =
        credentials::hash_secret(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    // Nobody answers the security question for the admin; a random
    // value keeps the recovery flow closed for this account.
    let security_answer = credentials::hash_secret(&uuid::Uuid::new_v4().to_string())
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    User::create(
        pool,
        CreateUser {
            username: config.admin_username.clone(),
            email: config.admin_email.clone(),
            password_hash,
            security_answer,
            role: UserRole::Admin,
        },
    )
    .await?;

    tracing::info!("Administrator account '{}' created", config.admin_username);
    Ok(true)
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Accounts
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    security_answer TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    created_at TEXT NOT NULL,
    last_login TEXT
);

-- Classification history (no foreign key: records outlive accounts)
CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL COLLATE NOCASE,
    prediction TEXT NOT NULL,
    confidence REAL NOT NULL,
    timestamp TEXT NOT NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_predictions_user ON predictions(username, timestamp);
"#;
