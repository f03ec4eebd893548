//! Static pages

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::middleware::auth::MaybeUser;
use crate::views::Notice;
use crate::AppState;

/// `?notice=` banner code carried across a redirect
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
}

impl NoticeQuery {
    pub fn banner(&self) -> Option<serde_json::Value> {
        self.notice
            .as_deref()
            .and_then(Notice::from_code)
            .map(|n| n.to_json())
    }
}

pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    state
        .views
        .render("home", user.as_ref(), json!({ "notice": query.banner() }))
}

pub async fn about(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> AppResult<Html<String>> {
    state.views.render("about", user.as_ref(), json!({}))
}

pub async fn not_found(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> AppResult<Response> {
    let page = state.views.render("not_found", user.as_ref(), json!({}))?;
    Ok((StatusCode::NOT_FOUND, page).into_response())
}
