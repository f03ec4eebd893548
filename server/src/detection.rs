//! Inference request path
//!
//! Validating → Scaling → Classifying → Decoding → Recording → Done.
//! Any stage before Recording fails the request and nothing is written.
//! Recording is best effort: a store failure is logged and the
//! classification is still returned.

use std::collections::HashMap;

use nids_engine::{Classification, FeatureVector, Stage};
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::UserContext;
use crate::models::Prediction;
use crate::AppState;

/// Classification plus whether it reached the store
#[derive(Debug, Clone, Serialize)]
pub struct DetectionOutcome {
    #[serde(flatten)]
    pub classification: Classification,
    pub recorded: bool,
}

/// Run one authenticated inference request
pub async fn run<S: AsRef<str>>(
    state: &AppState,
    user: &UserContext,
    raw: &HashMap<String, S>,
) -> AppResult<DetectionOutcome> {
    tracing::debug!(user = %user.username, stage = %Stage::Validating, "Inference request");
    let vector = FeatureVector::from_raw(raw).map_err(|e| {
        tracing::info!(user = %user.username, field = e.field(), "Rejected feature input: {}", e);
        e
    })?;

    let classification = state.detector.classify(&vector)?;

    tracing::debug!(stage = %Stage::Recording, label = %classification.label, "Recording prediction");
    let recorded = match Prediction::create(
        &state.pool,
        &user.username,
        &classification.label,
        classification.confidence,
    )
    .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(
                user = %user.username,
                label = %classification.label,
                "Prediction not recorded: {}",
                e
            );
            false
        }
    };

    state.activity.record_prediction(&classification.label);

    tracing::info!(
        user = %user.username,
        label = %classification.label,
        confidence = classification.confidence,
        recorded,
        elapsed_us = classification.inference_time_us,
        stage = %Stage::Done,
        "Classified flow"
    );

    Ok(DetectionOutcome {
        classification,
        recorded,
    })
}
