//! Error page rendering

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::ErrorPage;
use crate::middleware::auth;
use crate::AppState;

/// Middleware: swap the static body of an [`AppError`](crate::error::AppError)
/// response for the `error` template. The static page stays when rendering
/// fails.
pub async fn render_error_pages(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let user = auth::authenticate(&state, req.headers()).ok();
    let response = next.run(req).await;

    let Some(details) = response.extensions().get::<ErrorPage>().cloned() else {
        return response;
    };

    let data = json!({
        "status": details.status.as_u16(),
        "reason": details.reason(),
        "message": details.message,
    });

    match state.views.render("error", user.as_ref(), data) {
        Ok(page) => {
            let mut rendered = (details.status, page).into_response();
            rendered.extensions_mut().insert(details);
            rendered
        }
        Err(e) => {
            tracing::warn!("Error page template failed: {}", e);
            response
        }
    }
}
