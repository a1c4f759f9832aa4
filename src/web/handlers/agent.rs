// POST /agent/invoke: draft an HTML report about a topic from the caller's cards.
//
// The card index is built from this request's payload and dropped with it.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::agent::tools::CardIndex;
use crate::cards::{Card, ClusterInfo};
use crate::web::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub topic: String,
    pub all_tags: Vec<String>,
    pub all_categories: Vec<ClusterInfo>,
    pub all_cards: Vec<Card>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentResponse {
    pub report: String,
}

pub async fn invoke_agent(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let agent = state
        .registry
        .report_agent()
        .ok_or(ApiError::Unavailable("Agent model"))?;

    let index = CardIndex::new(&request.all_cards, &request.all_categories);
    let report = agent
        .write_report(&request.topic, &request.all_tags, &index)
        .await?;

    Ok(Json(AgentResponse { report }))
}
