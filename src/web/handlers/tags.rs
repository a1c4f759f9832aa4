// POST /tags/generate: tags for one card's content.
//
// Returns 503 when no refinement model is configured. Refinement failures
// degrade to raw candidates, so this endpoint does not 500 on provider errors.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagResponse {
    pub tags: Vec<String>,
}

pub async fn generate_tags(
    State(state): State<AppState>,
    Json(request): Json<TagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    let aggregator = state
        .registry
        .tag_aggregator()
        .ok_or(ApiError::Unavailable("Tag refinement model"))?;

    let tags = aggregator.generate_tags(&request.content).await;
    Ok(Json(TagResponse { tags }))
}
