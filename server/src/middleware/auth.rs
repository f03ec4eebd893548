//! Authentication middleware

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ApiError, AppError, AppResult};
use crate::sessions;
use crate::AppState;

/// Identity of the signed-in user, taken from a live session
#[derive(Debug, Clone)]
pub struct UserContext {
    pub username: String,
    pub session_id: Uuid,
    pub role: String,
    pub login_time: DateTime<Utc>,
}

impl UserContext {
    /// Check if user has admin role
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// RBAC: Require admin role
pub fn require_admin(user: &UserContext) -> Result<(), AppError> {
    if !user.is_admin() {
        tracing::warn!("Admin required but user {} has role '{}'", user.username, user.role);
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Resolve the session carried by `headers`
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> AppResult<UserContext> {
    let token = sessions::token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    let claims = state.sessions.verify(&token, &state.config.jwt_secret)?;

    Ok(UserContext {
        session_id: Uuid::parse_str(&claims.sid).map_err(|_| AppError::SessionInvalid)?,
        login_time: claims.login_time(),
        username: claims.sub,
        role: claims.role,
    })
}

/// Middleware: browser routes, unauthenticated requests go to the login page
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_ctx = authenticate(&state, req.headers())?;
    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Middleware: admin console
pub async fn require_admin_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_ctx = authenticate(&state, req.headers())?;
    require_admin(&user_ctx)?;
    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

/// Middleware: JSON API, unauthenticated requests get 401
pub async fn require_api_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_ctx = authenticate(&state, req.headers()).map_err(|e| match e {
        AppError::SessionInvalid => ApiError(AppError::Unauthorized),
        other => ApiError(other),
    })?;
    req.extensions_mut().insert(user_ctx);

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Signed-in user if any, for pages that render either way
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserContext>);

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(authenticate(state, &parts.headers).ok()))
    }
}
