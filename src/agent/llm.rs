//! Chat-completion client (OpenAI-compatible providers).

use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Chat-completion API client.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

/// A single message on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Tool definition for OpenAI-compatible function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionDefinition,
}

/// Function definition for tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: Value) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Tool call from the model's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub r#type: String,
    pub function: FunctionCall,
}

/// Function call details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// Arguments can arrive as either a JSON string or a raw JSON object
    /// depending on the model. We normalize to a string for downstream use.
    #[serde(default, deserialize_with = "deserialize_arguments")]
    pub arguments: String,
}

/// Deserialize arguments that may be a JSON string or a JSON object/map.
fn deserialize_arguments<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// The assistant message extracted from `choices[0]`.
#[derive(Debug, Clone, Default)]
pub struct CompletionMessage {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl CompletionMessage {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn content_text(&self) -> String {
        self.content
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Plain completion, no tools.
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let message = self.request(model, messages, None, max_tokens).await?;
        Ok(message.content_text())
    }

    /// Completion with function-calling enabled.
    pub async fn complete_with_tools(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        max_tokens: Option<u32>,
    ) -> Result<CompletionMessage> {
        self.request(model, messages, Some(tools), max_tokens).await
    }

    async fn request(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        tools: Option<Vec<ToolDefinition>>,
        max_tokens: Option<u32>,
    ) -> Result<CompletionMessage> {
        tracing::debug!(
            model,
            message_count = messages.len(),
            with_tools = tools.is_some(),
            "chat-completion request"
        );
        let tool_choice = tools.as_ref().map(|_| "auto".to_string());
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            max_tokens,
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to send request to LLM provider")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("LLM API error ({}): {}", status, body);
        }

        // Parse as a raw Value first for provider compatibility; strict
        // struct deserialization breaks on models that add nonstandard
        // fields or return odd types.
        let body = response.text().await.context("Failed to get response text")?;
        let raw: Value =
            serde_json::from_str(body.trim()).context("Failed to parse JSON response")?;
        let message = raw
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| anyhow::anyhow!("No message in response"))?;

        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .map(|s| s.to_string());
        let tool_calls: Vec<ToolCall> = message
            .get("tool_calls")
            .and_then(|tc| tc.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|tc| serde_json::from_value(tc.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        Ok(CompletionMessage {
            content,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_accepts_string_or_object() {
        let from_string: FunctionCall = serde_json::from_str(
            r#"{"name": "create_goal", "arguments": "{\"title\": \"Read\"}"}"#,
        )
        .unwrap();
        assert_eq!(from_string.arguments, "{\"title\": \"Read\"}");

        let from_object: FunctionCall = serde_json::from_str(
            r#"{"name": "create_goal", "arguments": {"title": "Read"}}"#,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&from_object.arguments).unwrap();
        assert_eq!(parsed["title"], "Read");

        let from_null: FunctionCall =
            serde_json::from_str(r#"{"name": "list_goals", "arguments": null}"#).unwrap();
        assert_eq!(from_null.arguments, "");
    }

    #[test]
    fn test_completion_message_content_text_trims() {
        let message = CompletionMessage {
            content: Some("  hello \n".to_string()),
            tool_calls: Vec::new(),
        };
        assert_eq!(message.content_text(), "hello");
    }
}
