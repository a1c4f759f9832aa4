// Report drafting agent: a bounded tool-calling conversation.
//
// The model sees only the topic, the tag vocabulary, and the category names.
// It pulls card contents on demand through `search_cards`, and after at most
// MAX_ROUND_TRIPS calls whatever it last said is the report.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::tools::{execute_tool, tool_definitions, CardIndex};
use crate::providers::traits::{
    AssistantTurn, ChatMessage, ContentBlock, ProviderError, StopReason, ToolChatModel,
};

pub const MAX_ROUND_TRIPS: usize = 3;

/// Returned when the final turn carries no text.
pub const REPORT_PLACEHOLDER: &str = "보고서를 생성하지 못했습니다.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent model call failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Where the conversation stands between steps.
#[derive(Debug)]
enum AgentState {
    AwaitingModel,
    ExecutingTool(Vec<ContentBlock>),
    Done(AssistantTurn),
}

pub struct ReportAgent {
    model: Arc<dyn ToolChatModel>,
    max_round_trips: usize,
}

impl ReportAgent {
    pub fn new(model: Arc<dyn ToolChatModel>) -> Self {
        Self {
            model,
            max_round_trips: MAX_ROUND_TRIPS,
        }
    }

    /// Run the conversation and return the report HTML.
    pub async fn write_report(
        &self,
        topic: &str,
        tags: &[String],
        index: &CardIndex,
    ) -> Result<String, AgentError> {
        let tools = tool_definitions();
        let prompt = build_report_prompt(topic, tags, index.category_names());
        let mut conversation = vec![ChatMessage::user(vec![ContentBlock::text(prompt)])];

        let mut round_trips = 0;
        let mut state = AgentState::AwaitingModel;

        let final_turn = loop {
            state = match state {
                AgentState::AwaitingModel => {
                    round_trips += 1;
                    let turn = self.model.send(None, &conversation, &tools).await?;
                    debug!(round_trips, stop_reason = ?turn.stop_reason, "Agent turn received");
                    conversation.push(ChatMessage::assistant(turn.content.clone()));

                    if turn.stop_reason != StopReason::ToolUse || !has_tool_calls(&turn) {
                        AgentState::Done(turn)
                    } else if round_trips >= self.max_round_trips {
                        warn!(round_trips, "Agent still calling tools at the round-trip cap");
                        AgentState::Done(turn)
                    } else {
                        AgentState::ExecutingTool(turn.content)
                    }
                }
                AgentState::ExecutingTool(blocks) => {
                    let results = run_tool_calls(index, &blocks);
                    conversation.push(ChatMessage::user(results));
                    AgentState::AwaitingModel
                }
                AgentState::Done(turn) => break turn,
            };
        };

        let report = first_text(&final_turn)
            .map(str::to_string)
            .unwrap_or_else(|| REPORT_PLACEHOLDER.to_string());

        info!(round_trips, chars = report.chars().count(), "Report drafted");
        Ok(report)
    }
}

/// One tool-result block per tool-use block, keyed by the call id.
fn run_tool_calls(index: &CardIndex, blocks: &[ContentBlock]) -> Vec<ContentBlock> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some(match execute_tool(index, name, input) {
                    Ok(output) => {
                        debug!(tool = %name, "Tool call succeeded");
                        ContentBlock::tool_result(id.clone(), output)
                    }
                    Err(message) => {
                        warn!(tool = %name, error = %message, "Tool call rejected");
                        ContentBlock::tool_error(id.clone(), message)
                    }
                })
            }
            _ => None,
        })
        .collect()
}

/// A tool_use stop reason with no tool_use block leaves nothing to answer.
fn has_tool_calls(turn: &AssistantTurn) -> bool {
    turn.content
        .iter()
        .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
}

fn first_text(turn: &AssistantTurn) -> Option<&str> {
    turn.content.iter().find_map(|block| match block {
        ContentBlock::Text { text } => Some(text.as_str()),
        _ => None,
    })
}

pub fn build_report_prompt(topic: &str, tags: &[String], categories: &[String]) -> String {
    format!(
        "당신은 사용자가 모아 둔 카드 메모를 바탕으로 보고서를 작성하는 전문 작가입니다.\n\
         \n\
         보고서 주제: {topic}\n\
         사용 가능한 태그: {tags}\n\
         카드 카테고리 목록: {categories}\n\
         \n\
         카테고리에 속한 카드의 실제 내용이 필요하면 search_cards 도구로 해당 카테고리를 검색하세요. \
         주제와 관련 있는 카테고리만 골라 검색하고, 검색한 카드 내용을 근거로 작성하세요.\n\
         \n\
         보고서는 아래 네 개의 섹션으로 구성된 HTML 조각으로 작성해주세요.\n\
         1. <h2>개요</h2>: 주제와 보고서의 목적\n\
         2. <h2>주요 내용</h2>: 카드에서 확인한 핵심 사실과 근거\n\
         3. <h2>분석</h2>: 내용 사이의 연관성과 시사점\n\
         4. <h2>결론</h2>: 요약과 제언\n\
         \n\
         <html>, <head>, <body> 태그는 포함하지 말고, <h2>, <p>, <ul>, <li> 같은 본문 태그만 사용하세요. \
         최종 답변에는 HTML 외의 설명을 덧붙이지 마세요.",
        tags = tags.join(", "),
        categories = categories.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_categories_only() {
        let prompt = build_report_prompt(
            "AI 반도체",
            &["GPU".to_string(), "HBM".to_string()],
            &["반도체".to_string(), "요리".to_string()],
        );
        assert!(prompt.contains("보고서 주제: AI 반도체"));
        assert!(prompt.contains("GPU, HBM"));
        assert!(prompt.contains("반도체, 요리"));
        assert!(prompt.contains("<html>, <head>, <body>"));
    }

    #[test]
    fn test_first_text_skips_tool_use() {
        let turn = AssistantTurn {
            content: vec![
                ContentBlock::ToolUse {
                    id: "t1".to_string(),
                    name: "search_cards".to_string(),
                    input: serde_json::json!({}),
                },
                ContentBlock::text("<h2>개요</h2>"),
            ],
            stop_reason: StopReason::EndTurn,
        };
        assert_eq!(first_text(&turn), Some("<h2>개요</h2>"));
    }

    #[test]
    fn test_tool_calls_map_to_results_by_id() {
        let index = CardIndex::new(&[], &[]);
        let results = run_tool_calls(
            &index,
            &[
                ContentBlock::text("검색합니다"),
                ContentBlock::ToolUse {
                    id: "call-1".to_string(),
                    name: "search_cards".to_string(),
                    input: serde_json::json!({"categories": ["없는 카테고리"]}),
                },
                ContentBlock::ToolUse {
                    id: "call-2".to_string(),
                    name: "unknown".to_string(),
                    input: serde_json::json!({}),
                },
            ],
        );
        assert_eq!(
            results,
            vec![
                ContentBlock::tool_result("call-1", "[]"),
                ContentBlock::tool_error("call-2", "unknown tool: unknown"),
            ]
        );
    }
}
