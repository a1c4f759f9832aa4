// Anthropic Messages API implementation of ToolChatModel.
//
// Only the non-streaming endpoint is used: the agent loop needs the complete
// assistant turn (including every tool_use block) before it can act.
//
// API docs: https://docs.anthropic.com/en/api/messages

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{
    AssistantTurn, ChatMessage, ContentBlock, ProviderError, StopReason, ToolChatModel,
    ToolDefinition,
};

const PROVIDER: &str = "anthropic";

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT_SECS: u64 = 300;

pub struct AnthropicChat {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicChat {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ToolChatModel for AnthropicChat {
    async fn send(
        &self,
        system: Option<&str>,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantTurn, ProviderError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            tools,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|source| ProviderError::Http {
                provider: PROVIDER,
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ProviderError::Http {
            provider: PROVIDER,
            source,
        })?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Status {
                provider: PROVIDER,
                status: status.as_u16(),
                body: detail,
            });
        }

        let turn = parse_response(&body)?;

        debug!(
            model = %self.model,
            blocks = turn.content.len(),
            stop_reason = ?turn.stop_reason,
            "Anthropic turn received"
        );

        Ok(turn)
    }
}

/// Decode a Messages API response body into an AssistantTurn.
pub fn parse_response(body: &str) -> Result<AssistantTurn, ProviderError> {
    let api: MessagesResponse = serde_json::from_str(body).map_err(|e| ProviderError::Malformed {
        provider: PROVIDER,
        detail: e.to_string(),
    })?;

    let content = api
        .content
        .into_iter()
        .filter_map(|block| match block {
            ApiContentBlock::Text { text } => Some(ContentBlock::Text { text }),
            ApiContentBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolUse { id, name, input })
            }
            ApiContentBlock::Other => None,
        })
        .collect();

    let stop_reason = match api.stop_reason.as_deref() {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    };

    Ok(AssistantTurn {
        content,
        stop_reason,
    })
}

// --- Messages API request/response types ---

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ApiContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::traits::Role;

    #[test]
    fn test_parse_tool_use_response() {
        let body = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "카드를 찾아보겠습니다."},
                {"type": "tool_use", "id": "toolu_1", "name": "search_cards",
                 "input": {"categories": ["AI 기술"]}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let turn = parse_response(body).unwrap();
        assert_eq!(turn.stop_reason, StopReason::ToolUse);
        assert_eq!(turn.content.len(), 2);
        match &turn.content[1] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "toolu_1");
                assert_eq!(name, "search_cards");
                assert_eq!(input["categories"][0], "AI 기술");
            }
            other => panic!("expected tool_use, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_skips_unknown_block_types() {
        let body = r#"{
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "<h2>개요</h2>"}
            ],
            "stop_reason": "end_turn"
        }"#;
        let turn = parse_response(body).unwrap();
        assert_eq!(turn.stop_reason, StopReason::EndTurn);
        assert_eq!(turn.content, vec![ContentBlock::text("<h2>개요</h2>")]);
    }

    #[test]
    fn test_parse_malformed_body() {
        assert!(matches!(
            parse_response("not json"),
            Err(ProviderError::Malformed { .. })
        ));
    }

    #[test]
    fn test_request_serializes_tool_result_turn() {
        let messages = vec![ChatMessage::user(vec![ContentBlock::tool_result(
            "toolu_1", "[]",
        )])];
        let request = MessagesRequest {
            model: "m",
            max_tokens: 10,
            system: None,
            messages: &messages,
            tools: &[],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("system").is_none());
        assert!(value.get("tools").is_none());
        let block = &value["messages"][0]["content"][0];
        assert_eq!(block["type"], "tool_result");
        assert_eq!(block["tool_use_id"], "toolu_1");
        assert!(block.get("is_error").is_none());
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
