//! Profile handler

use axum::{extract::State, response::Html};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::UserContext;
use crate::models::{Prediction, User};
use crate::AppState;

const RECENT_LIMIT: i64 = 10;

pub async fn show(State(state): State<AppState>, user: UserContext) -> AppResult<Html<String>> {
    // Account may have been deleted while the session was still live
    let account = User::find_by_username(&state.pool, &user.username)
        .await?
        .ok_or(AppError::SessionInvalid)?;

    let counts = Prediction::counts_for_user(&state.pool, &account.username).await?;
    let recent = Prediction::recent_for_user(&state.pool, &account.username, RECENT_LIMIT).await?;
    let total: i64 = counts.iter().map(|c| c.count).sum();

    let recent: Vec<_> = recent
        .iter()
        .map(|p| {
            json!({
                "timestamp": p.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                "prediction": p.prediction,
                "confidence": format!("{:.1}%", p.confidence),
            })
        })
        .collect();

    state.views.render(
        "profile",
        Some(&user),
        json!({
            "user": account.to_info(),
            "prediction_history": counts,
            "recent_predictions": recent,
            "total_predictions": total,
        }),
    )
}
