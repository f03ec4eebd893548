//! Dashboard and inference handlers

use std::collections::HashMap;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use nids_engine::{ModelStatus, FEATURE_LAYOUT};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::detection::{self, DetectionOutcome};
use crate::error::{ApiResult, AppError, AppResult};
use crate::middleware::auth::UserContext;
use crate::views::message;
use crate::AppState;

const LOGIN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Dashboard template context
fn page_data(
    state: &AppState,
    user: &UserContext,
    submitted: Option<&HashMap<String, String>>,
) -> serde_json::Map<String, Value> {
    let features: Vec<Value> = FEATURE_LAYOUT
        .iter()
        .map(|name| {
            let value = submitted
                .and_then(|raw| raw.get(*name))
                .map(String::as_str)
                .unwrap_or("");
            json!({ "name": name, "value": value })
        })
        .collect();

    let mut data = serde_json::Map::new();
    data.insert("features".to_string(), Value::Array(features));
    data.insert("history".to_string(), json!(state.activity.tally()));
    data.insert("username".to_string(), json!(user.username));
    data.insert(
        "login_time".to_string(),
        json!(user.login_time.format(LOGIN_TIME_FORMAT).to_string()),
    );
    data
}

pub async fn show(State(state): State<AppState>, user: UserContext) -> AppResult<Response> {
    let data = page_data(&state, &user, None);
    Ok(state
        .views
        .render("dashboard", Some(&user), Value::Object(data))?
        .into_response())
}

/// Form submission: classify and render the result inline
pub async fn submit(
    State(state): State<AppState>,
    user: UserContext,
    Form(raw): Form<HashMap<String, String>>,
) -> AppResult<Response> {
    let mut data = page_data(&state, &user, Some(&raw));

    match detection::run(&state, &user, &raw).await {
        Ok(outcome) => {
            let confidence = outcome.classification.confidence_display();
            data.insert(
                "notice".to_string(),
                message(
                    "info",
                    format!(
                        "Prediction completed: {} (Confidence: {})",
                        outcome.classification.label, confidence
                    ),
                ),
            );
            data.insert(
                "prediction".to_string(),
                json!({
                    "label": outcome.classification.label,
                    "confidence": confidence,
                    "recorded": outcome.recorded,
                }),
            );
            // Tally was read before this request counted
            data.insert("history".to_string(), json!(state.activity.tally()));

            let page = state.views.render("dashboard", Some(&user), Value::Object(data))?;
            Ok(page.into_response())
        }
        Err(AppError::Features(e)) => {
            data.insert("notice".to_string(), message("error", e.to_string()));
            let page = state.views.render("dashboard", Some(&user), Value::Object(data))?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub features: HashMap<String, Value>,
}

/// JSON values as the validator's raw text. Numbers and strings pass
/// through; null counts as missing; anything else fails to parse.
fn raw_features(features: HashMap<String, Value>) -> HashMap<String, String> {
    features
        .into_iter()
        .filter_map(|(name, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => other.to_string(),
            };
            Some((name, text))
        })
        .collect()
}

pub async fn api_predict(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<PredictRequest>,
) -> ApiResult<Json<DetectionOutcome>> {
    let raw = raw_features(req.features);
    let outcome = detection::run(&state, &user, &raw).await?;
    Ok(Json(outcome))
}

pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.detector.status())
}
