// POST /cards/cluster: group cards into named categories.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::cards::{Card, ClusterInfo};
use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ClusterRequest {
    pub cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClusterResponse {
    pub clusters: Vec<ClusterInfo>,
}

/// 500 when embedding is missing or fails; naming failures only affect names.
pub async fn cluster_cards(
    State(state): State<AppState>,
    Json(request): Json<ClusterRequest>,
) -> Result<Json<ClusterResponse>, ApiError> {
    let clusters = state
        .registry
        .cluster_engine()
        .cluster(&request.cards)
        .await?;
    Ok(Json(ClusterResponse { clusters }))
}
