//! Anthropic Messages API client. Three capabilities, nothing else:
//! plain chat completion, schema-driven structured extraction, and
//! streamed completion yielding incremental text deltas.

mod client;
pub(crate) mod types;

use anyhow::{anyhow, Result};
use futures::Stream;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use client::AnthropicHttp;
use types::*;

// =============================================================================
// Input messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    fn wire(&self) -> WireMessage {
        match self.role {
            MessageRole::User => WireMessage::user(self.content.clone()),
            MessageRole::Assistant => WireMessage::assistant(self.content.clone()),
        }
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct Anthropic {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl Anthropic {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn http(&self) -> AnthropicHttp {
        let client = AnthropicHttp::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    /// Plain multi-turn completion.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        messages: &[Message],
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .messages(messages.iter().map(Message::wire))
            .temperature(0.0);

        let response = self.http().chat(&request).await?;

        response
            .text()
            .ok_or_else(|| anyhow!("No text in Anthropic response"))
    }

    /// Structured extraction: forces the model through a single tool
    /// whose input schema is derived from `T`, then deserializes the
    /// tool input.
    pub async fn extract<T: DeserializeOwned + JsonSchema>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let schema = serde_json::to_value(
            schemars::gen::SchemaGenerator::default().into_root_schema_for::<T>(),
        )?;

        let tool_name = "structured_response";
        let mut request = ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(WireMessage::user(user_prompt))
            .tool(ToolDefinitionWire {
                name: tool_name.to_string(),
                description: "Extract structured data from the input.".to_string(),
                input_schema: schema,
            });
        request.tool_choice = Some(serde_json::json!({
            "type": "tool",
            "name": tool_name,
        }));

        let response = self.http().chat(&request).await?;

        for block in &response.content {
            if let ContentBlock::ToolUse { input, .. } = block {
                return serde_json::from_value(input.clone())
                    .map_err(|e| anyhow!("Failed to deserialize response: {}", e));
            }
        }

        Err(anyhow!("No structured output in Anthropic response"))
    }

    /// Streamed multi-turn completion. Yields text deltas.
    pub async fn chat_stream(
        &self,
        system: impl Into<String>,
        messages: &[Message],
    ) -> Result<impl Stream<Item = Result<String>>> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .messages(messages.iter().map(Message::wire))
            .temperature(0.7)
            .streaming();

        self.http().chat_stream(&request).await
    }
}
