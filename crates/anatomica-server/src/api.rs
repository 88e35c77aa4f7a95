//! REST API handlers

use anatomica_core::{catalog, generate_organ_labels, Classifier, OrganKey};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// Classification result
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub organ: OrganKey,
}

/// List the organ catalog
pub async fn list_organs() -> impl IntoResponse {
    Json(catalog())
}

/// Classify an uploaded image (raw request body)
pub async fn classify(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> impl IntoResponse {
    let organ = state.classifier.classify(&body);
    info!(bytes = body.len(), %organ, "Classified upload");
    Json(ClassifyResponse { organ })
}

/// Labels for an organ, generated when possible and otherwise from the static table
pub async fn get_labels(
    State(state): State<Arc<AppState>>,
    Path(organ): Path<String>,
) -> impl IntoResponse {
    let organ: OrganKey = match organ.parse() {
        Ok(o) => o,
        Err(e) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ApiError::new(e.to_string())),
            )
                .into_response()
        }
    };

    let timeout = tokio::time::sleep(state.generation_timeout());
    let set = generate_organ_labels(state.generator.as_ref(), organ, timeout).await;
    debug!(%organ, source = ?set.source, count = set.labels.len(), "Serving labels");
    Json(set).into_response()
}
