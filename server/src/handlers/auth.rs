//! Authentication handlers

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::{Validate, ValidationErrors};

use crate::credentials;
use crate::error::{ApiResult, AppError, AppResult};
use crate::handlers::pages::NoticeQuery;
use crate::middleware::auth::{MaybeUser, UserContext};
use crate::models::{CreateUser, User, UserInfo, UserRole};
use crate::sessions::{self, IssuedSession};
use crate::views::message;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterForm {
    #[serde(default)]
    #[validate(length(min = 3, max = 32, message = "Username must be 3 to 32 characters long!"))]
    pub username: String,
    #[serde(default)]
    #[validate(email(message = "Please enter a valid email address!"))]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    /// Answer to the security question
    #[serde(default)]
    pub fav_car: String,
}

impl RegisterForm {
    fn check(&self) -> AppResult<()> {
        let required = [&self.username, &self.email, &self.password, &self.fav_car];
        if required.iter().any(|v| v.trim().is_empty()) {
            return Err(AppError::Validation("All fields are required!".to_string()));
        }
        self.validate()
            .map_err(|e| AppError::Validation(first_message(&e)))?;
        credentials::check_new_password(&self.password, &self.confirm_password)
    }
}

/// First message in field-name order, so the same input always reports
/// the same problem
fn first_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .into_iter()
        .flat_map(|(_, errs)| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input!".to_string())
}

/// Look up `username` and check `password`. Legacy hashes are upgraded to
/// Argon2 on success; `last_login` is updated.
pub async fn authenticate_credentials(state: &AppState, username: &str, password: &str) -> AppResult<User> {
    let user = User::find_by_username(&state.pool, username.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let needs_upgrade =
        credentials::check(password, &user.password_hash).ok_or(AppError::InvalidCredentials)?;

    if needs_upgrade {
        match credentials::hash_secret(password) {
            Ok(hash) => {
                if let Err(e) = User::update_password(&state.pool, user.id, &hash).await {
                    tracing::warn!("Could not upgrade password hash for {}: {}", user.username, e);
                } else {
                    tracing::info!("Upgraded legacy password hash for {}", user.username);
                }
            }
            Err(e) => tracing::warn!("Could not rehash password for {}: {}", user.username, e),
        }
    }

    User::update_last_login(&state.pool, user.id).await?;
    Ok(user)
}

fn role_of(state: &AppState, user: &User) -> &'static str {
    if user.is_admin() || state.config.is_admin_name(&user.username) {
        UserRole::Admin.as_str()
    } else {
        UserRole::User.as_str()
    }
}

fn start_session(state: &AppState, user: &User) -> AppResult<IssuedSession> {
    state.sessions.issue(
        &user.username,
        role_of(state, user),
        &state.config.jwt_secret,
        state.config.session_hours,
    )
}

pub async fn login_page(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(query): Query<NoticeQuery>,
) -> AppResult<Response> {
    if let Some(user) = user {
        return Ok(Redirect::to(landing_page(&user)).into_response());
    }
    let page = state
        .views
        .render("login", None, json!({ "notice": query.banner() }))?;
    Ok(page.into_response())
}

fn landing_page(user: &UserContext) -> &'static str {
    if user.is_admin() {
        "/admin"
    } else {
        "/dashboard"
    }
}

/// Login form
pub async fn login(State(state): State<AppState>, Form(req): Form<LoginRequest>) -> AppResult<Response> {
    let user = match authenticate_credentials(&state, &req.username, &req.password).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            tracing::info!("Failed login for '{}'", req.username);
            let page = state.views.render(
                "login",
                None,
                json!({
                    "notice": message("error", "Invalid username or password!"),
                    "username": req.username,
                }),
            )?;
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(e) => return Err(e),
    };

    let session = start_session(&state, &user)?;
    let destination = if role_of(&state, &user) == UserRole::Admin.as_str() {
        "/admin"
    } else {
        "/dashboard"
    };

    tracing::info!("User {} logged in", user.username);

    Ok((
        [(SET_COOKIE, sessions::session_cookie(&session, state.config.is_production()))],
        Redirect::to(destination),
    )
        .into_response())
}

/// JSON login, returns a bearer token
pub async fn api_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = authenticate_credentials(&state, &req.username, &req.password).await?;
    let session = start_session(&state, &user)?;

    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.to_info(),
    }))
}

pub async fn register_page(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> AppResult<Response> {
    Ok(state.views.render("register", user.as_ref(), json!({}))?.into_response())
}

/// Registration form
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> AppResult<Response> {
    match create_account(&state, &form).await {
        Ok(user) => {
            tracing::info!("New user registered: {}", user.username);
            Ok(Redirect::to("/login?notice=registered").into_response())
        }
        Err(e @ (AppError::Validation(_) | AppError::AlreadyExists(_))) => {
            let status = e.status();
            let page = state.views.render(
                "register",
                None,
                json!({
                    "notice": message("error", e.to_string()),
                    "form": { "username": form.username, "email": form.email },
                }),
            )?;
            Ok((status, page).into_response())
        }
        Err(e) => Err(e),
    }
}

async fn create_account(state: &AppState, form: &RegisterForm) -> AppResult<User> {
    form.check()?;

    let username = form.username.trim();
    let email = form.email.trim();

    if state.config.is_admin_name(username) {
        return Err(AppError::AlreadyExists("Username is reserved!".to_string()));
    }
    if User::find_by_username(&state.pool, username).await?.is_some() {
        return Err(AppError::AlreadyExists("Username already exists!".to_string()));
    }
    if User::find_by_email(&state.pool, email).await?.is_some() {
        return Err(AppError::AlreadyExists("Email already registered!".to_string()));
    }

    let user = User::create(
        &state.pool,
        CreateUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: credentials::hash_secret(&form.password)?,
            security_answer: credentials::hash_secret(&credentials::normalize_answer(&form.fav_car))?,
            role: UserRole::User,
        },
    )
    .await
    .map_err(|e| match e {
        // Lost a race with a concurrent registration
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::AlreadyExists("Username or email already registered!".to_string())
        }
        other => AppError::Database(other),
    })?;

    state.activity.user_created();
    Ok(user)
}

pub async fn logout(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Response {
    if let Some(user) = user {
        state.sessions.revoke(user.session_id);
        tracing::info!("User {} logged out", user.username);
    }

    (
        [(SET_COOKIE, sessions::clear_cookie())],
        Redirect::to("/?notice=logged_out"),
    )
        .into_response()
}
