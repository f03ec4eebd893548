//! Admin console handlers

use axum::{
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use serde_json::json;

use crate::error::AppResult;
use crate::handlers::pages::NoticeQuery;
use crate::middleware::auth::UserContext;
use crate::models::User;
use crate::AppState;

/// List all accounts, newest first
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Html<String>> {
    let users: Vec<_> = User::list(&state.pool)
        .await?
        .iter()
        .map(User::to_info)
        .collect();

    state.views.render(
        "admin",
        Some(&user),
        json!({
            "users": users,
            "notice": query.banner(),
        }),
    )
}

/// Delete an account. The administrator account is protected.
pub async fn delete(
    State(state): State<AppState>,
    admin: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let Some(target) = User::find_by_id(&state.pool, id).await? else {
        return Ok(Redirect::to("/admin?notice=user_not_found"));
    };

    if target.is_admin() || state.config.is_admin_name(&target.username) {
        tracing::warn!("{} tried to delete the admin account", admin.username);
        return Ok(Redirect::to("/admin?notice=admin_protected"));
    }

    if User::delete(&state.pool, id).await? {
        state.activity.user_deleted();
        let revoked = state.sessions.revoke_user(&target.username);
        tracing::info!(
            "User '{}' deleted by {} ({} sessions revoked)",
            target.username,
            admin.username,
            revoked
        );
    }

    Ok(Redirect::to("/admin?notice=user_deleted"))
}
