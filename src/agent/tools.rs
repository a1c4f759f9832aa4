// The agent's local tools and the request-scoped card index they read from.
//
// A CardIndex is built from the payload of one /agent/invoke call and dropped
// with it. Concurrent invocations never see each other's cards.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::cards::{Card, ClusterInfo};
use crate::providers::traits::ToolDefinition;

pub const SEARCH_CARDS: &str = "search_cards";

/// Card id -> content, plus category name -> card ids.
#[derive(Debug, Default)]
pub struct CardIndex {
    cards: HashMap<i64, String>,
    categories: HashMap<String, Vec<i64>>,
    /// Category names in payload order, for the prompt.
    category_order: Vec<String>,
}

impl CardIndex {
    pub fn new(cards: &[Card], categories: &[ClusterInfo]) -> Self {
        let mut index = Self {
            cards: cards.iter().map(|c| (c.id, c.content.clone())).collect(),
            ..Default::default()
        };

        for category in categories {
            match index.categories.get_mut(&category.category_name) {
                Some(ids) => ids.extend(&category.card_ids),
                None => {
                    index
                        .category_order
                        .push(category.category_name.clone());
                    index
                        .categories
                        .insert(category.category_name.clone(), category.card_ids.clone());
                }
            }
        }

        index
    }

    pub fn category_names(&self) -> &[String] {
        &self.category_order
    }

    /// Cards belonging to any of the given categories.
    ///
    /// Unknown categories and ids missing from the card list are skipped.
    /// Each card appears once, in the order the categories were requested.
    pub fn search_cards(&self, categories: &[String]) -> Vec<Card> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for name in categories {
            let Some(ids) = self.categories.get(name) else {
                continue;
            };
            for id in ids {
                if let Some(content) = self.cards.get(id) {
                    if seen.insert(*id) {
                        found.push(Card::new(*id, content.clone()));
                    }
                }
            }
        }

        found
    }
}

#[derive(Debug, Deserialize)]
struct SearchCardsInput {
    categories: Vec<String>,
}

pub fn search_cards_definition() -> ToolDefinition {
    ToolDefinition {
        name: SEARCH_CARDS.to_string(),
        description: "주어진 카테고리 이름 목록에 속한 카드들의 id와 내용을 반환합니다. \
                      보고서에 인용할 근거 자료가 필요할 때 사용하세요."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "categories": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "검색할 카테고리 이름 목록"
                }
            },
            "required": ["categories"]
        }),
    }
}

/// Every tool the agent may call.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![search_cards_definition()]
}

/// Run one tool call. `Ok` holds the JSON result text; `Err` holds a message
/// to hand back to the model as an error result.
pub fn execute_tool(index: &CardIndex, name: &str, input: &Value) -> Result<String, String> {
    match name {
        SEARCH_CARDS => {
            let args: SearchCardsInput = serde_json::from_value(input.clone())
                .map_err(|e| format!("invalid input for {SEARCH_CARDS}: {e}"))?;
            let cards = index.search_cards(&args.categories);
            serde_json::to_string(&cards).map_err(|e| format!("failed to encode result: {e}"))
        }
        other => Err(format!("unknown tool: {other}")),
    }
}
