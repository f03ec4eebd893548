//! Activity statistics

use axum::{extract::State, Json};

use crate::activity::StatsSnapshot;
use crate::AppState;

/// In-process counters; nothing here reads the store
pub async fn summary(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.activity.snapshot(state.sessions.active_count()))
}
