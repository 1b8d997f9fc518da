//! Intent inspection endpoint
//!
//! Resolves text the same way `/process` does and reports what would be
//! said, without performing the action's side effect.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::ApiState;
use super::voice::VoiceError;
use crate::actions;
use crate::intent::{Intent, IntentSource};

/// Build intent router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/intent", post(resolve))
        .with_state(state)
}

/// Intent request
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub text: String,
}

/// Intent response
#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub intent: Intent,
    pub source: IntentSource,
    pub response: String,
}

async fn resolve(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, VoiceError> {
    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("Empty text"));
    }

    let (intent, source) = state.orchestrator.resolve_intent(&request.text).await;
    let response = actions::plan(&intent, Local::now().naive_local()).response;

    Ok(Json(ResolveResponse {
        intent,
        source,
        response,
    }))
}
