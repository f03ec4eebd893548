//! Password recovery handlers
//!
//! Email plus security answer issues a signed reset token that expires
//! after fifteen minutes and stops working once the password changes.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;

use crate::credentials;
use crate::error::{AppError, AppResult};
use crate::handlers::pages::NoticeQuery;
use crate::models::User;
use crate::sessions;
use crate::views::message;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub fav_car: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub async fn forgot_page(State(state): State<AppState>, Query(query): Query<NoticeQuery>) -> AppResult<Response> {
    Ok(state
        .views
        .render("forgot_password", None, json!({ "notice": query.banner() }))?
        .into_response())
}

pub async fn forgot(State(state): State<AppState>, Form(form): Form<ForgotForm>) -> AppResult<Response> {
    let email = form.email.trim();

    let failure = match User::find_by_email(&state.pool, email).await? {
        None => "Email not found!",
        Some(user) => {
            let answer = credentials::normalize_answer(&form.fav_car);
            if credentials::check(&answer, &user.security_answer).is_some() {
                let token = sessions::issue_reset_token(user.id, &user.password_hash, &state.config.jwt_secret)?;
                tracing::info!("Password reset issued for {}", user.username);
                return Ok(Redirect::to(&format!("/reset_password?token={}", token)).into_response());
            }
            tracing::info!("Wrong security answer for {}", user.username);
            "Security answer incorrect!"
        }
    };

    let page = state.views.render(
        "forgot_password",
        None,
        json!({ "notice": message("error", failure), "email": email }),
    )?;
    Ok(page.into_response())
}

/// Account the token names, if the token is still good
async fn resolve_token(state: &AppState, token: &str) -> AppResult<User> {
    let (user_id, fp) = sessions::decode_reset_token(token, &state.config.jwt_secret)?;
    match User::find_by_id(&state.pool, user_id).await? {
        Some(user) if sessions::reset_token_matches(&fp, &user.password_hash) => Ok(user),
        _ => Err(AppError::Validation("Reset link is invalid or has expired.".to_string())),
    }
}

pub async fn reset_page(State(state): State<AppState>, Query(query): Query<ResetQuery>) -> AppResult<Response> {
    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        return Ok(Redirect::to("/forgot_password?notice=reset_invalid").into_response());
    };

    if resolve_token(&state, &token).await.is_err() {
        return Ok(Redirect::to("/forgot_password?notice=reset_invalid").into_response());
    }

    Ok(state
        .views
        .render("reset_password", None, json!({ "token": token }))?
        .into_response())
}

pub async fn reset(State(state): State<AppState>, Form(form): Form<ResetForm>) -> AppResult<Response> {
    let user = match resolve_token(&state, &form.token).await {
        Ok(user) => user,
        Err(AppError::Validation(_)) => {
            return Ok(Redirect::to("/forgot_password?notice=reset_invalid").into_response())
        }
        Err(e) => return Err(e),
    };

    if let Err(e) = check_fields(&form) {
        let page = state.views.render(
            "reset_password",
            None,
            json!({ "notice": message("error", e.to_string()), "token": form.token }),
        )?;
        return Ok((e.status(), page).into_response());
    }

    let hash = credentials::hash_secret(&form.new_password)?;
    User::update_password(&state.pool, user.id, &hash).await?;
    let revoked = state.sessions.revoke_user(&user.username);
    tracing::info!("Password reset for {} ({} sessions revoked)", user.username, revoked);

    Ok(Redirect::to("/login?notice=password_reset").into_response())
}

fn check_fields(form: &ResetForm) -> AppResult<()> {
    if form.new_password.is_empty() || form.confirm_password.is_empty() {
        return Err(AppError::Validation("All fields are required!".to_string()));
    }
    credentials::check_new_password(&form.new_password, &form.confirm_password)
}
