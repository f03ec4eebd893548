//! Error handling
//!
//! `AppError` renders as an HTML page or redirect for the browser routes.
//! `ApiError` wraps the same variants and renders them as JSON.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Json,
};
use nids_engine::{ConfigurationError, ValidationError};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Auth errors
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Session expired or revoked")]
    SessionInvalid,
    #[error("Authentication required")]
    Unauthorized,
    #[error("Admin access only")]
    Forbidden,

    // Resource errors
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),

    // Validation errors
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Features(#[from] ValidationError),

    // Model errors
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    // Database errors
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("template error: {0}")]
    Render(#[from] handlebars::RenderError),

    // Generic errors
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::SessionInvalid | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::Validation(_) | Self::Features(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) | Self::Database(_) | Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the client. Server-side faults are logged
    /// here and replaced with a generic line.
    pub fn public_message(&self) -> String {
        match self {
            Self::Configuration(e) => {
                tracing::error!(stage = %e.stage(), "Model configuration error: {}", e);
                "The classifier could not process this request".to_string()
            }
            Self::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error occurred".to_string()
            }
            Self::Render(e) => {
                tracing::error!("Template error: {}", e);
                "Internal server error".to_string()
            }
            Self::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Failure details attached to an HTML error response so the page layer
/// can re-render it with the site templates
#[derive(Debug, Clone)]
pub struct ErrorPage {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorPage {
    pub fn reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Error")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized | Self::SessionInvalid => {
                Redirect::to("/login?notice=login_required").into_response()
            }
            Self::Forbidden => Redirect::to("/login?notice=admin_only").into_response(),
            other => {
                let details = ErrorPage {
                    status: other.status(),
                    message: other.public_message(),
                };
                let mut response = (details.status, error_page(&details)).into_response();
                response.extensions_mut().insert(details);
                response
            }
        }
    }
}

impl From<handlebars::TemplateError> for AppError {
    fn from(err: handlebars::TemplateError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(_: jsonwebtoken::errors::Error) -> Self {
        AppError::SessionInvalid
    }
}

/// Static page used when the templates cannot render
fn error_page(details: &ErrorPage) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{code} {title} - NIDS AI</title></head>
<body style="font-family: sans-serif; text-align: center; padding: 4rem;">
<h1>{code}</h1>
<p>{message}</p>
<p><a href="/">Back to home</a></p>
</body>
</html>"#,
        code = details.status.as_u16(),
        title = details.reason(),
        message = escape_html(&details.message),
    ))
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// JSON rendering of [`AppError`] for the `/api` routes
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        let body = Json(json!({
            "error": self.0.public_message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError(err.into())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(err.into())
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(err: ConfigurationError) -> Self {
        ApiError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_redirects_to_login() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/login?notice=login_required"
        );
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_validation_message_is_shown() {
        let err = AppError::from(ValidationError::MissingField {
            field: "SYN Flag Count",
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("SYN Flag Count"));
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError(AppError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_page_escapes_message() {
        let Html(page) = error_page(&ErrorPage {
            status: StatusCode::BAD_REQUEST,
            message: "<script>".to_string(),
        });
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn test_error_response_carries_page_details() {
        let response = AppError::NotFound("User not found!".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let details = response.extensions().get::<ErrorPage>().unwrap();
        assert_eq!(details.status, StatusCode::NOT_FOUND);
        assert_eq!(details.message, "User not found!");
        assert_eq!(details.reason(), "Not Found");
    }

    #[test]
    fn test_redirects_carry_no_page_details() {
        let response = AppError::Forbidden.into_response();
        assert!(response.extensions().get::<ErrorPage>().is_none());
    }
}
