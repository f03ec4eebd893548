//! Prediction model
//!
//! Append-only. Rows are written after a successful classification and
//! never updated or deleted by the application.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prediction {
    pub id: i64,
    pub username: String,
    pub prediction: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-label count for one user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LabelCount {
    pub prediction: String,
    pub count: i64,
}

impl Prediction {
    pub async fn create(
        pool: &SqlitePool,
        username: &str,
        label: &str,
        confidence: f64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Prediction>(
            r#"
            INSERT INTO predictions (username, prediction, confidence, timestamp)
            VALUES (?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(username)
        .bind(label)
        .bind(confidence)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn counts_for_user(pool: &SqlitePool, username: &str) -> Result<Vec<LabelCount>, sqlx::Error> {
        sqlx::query_as::<_, LabelCount>(
            r#"
            SELECT prediction, COUNT(*) AS count
            FROM predictions
            WHERE username = ?
            GROUP BY prediction
            ORDER BY count DESC, prediction
            "#,
        )
        .bind(username)
        .fetch_all(pool)
        .await
    }

    pub async fn recent_for_user(
        pool: &SqlitePool,
        username: &str,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Prediction>(
            "SELECT * FROM predictions WHERE username = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(username)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_user(pool: &SqlitePool, username: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM predictions WHERE username = ?")
            .bind(username)
            .fetch_one(pool)
            .await
    }
}
