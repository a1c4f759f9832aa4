// Card and cluster types shared by the pipelines and the HTTP layer.
//
// These are plain request-scoped values. Nothing here is persisted: a card
// lives exactly as long as the request that carried it.

use serde::{Deserialize, Serialize};

/// A unit of user content. Ids are caller-assigned and unique within a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub content: String,
}

impl Card {
    pub fn new(id: i64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }
}

/// A named group of cards, as returned by clustering and accepted by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub category_name: String,
    pub card_ids: Vec<i64>,
}
