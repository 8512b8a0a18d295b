//! Anthropic Messages API client.
//!
//! Covers the subset the generation pipeline needs: tool definitions,
//! forced or automatic `tool_choice`, optional extended thinking, and both
//! the blocking and the streaming (`"stream": true`) forms of
//! `POST /v1/messages`.
//!
//! Streaming responses are server-sent events. [`MessageStream`] decodes
//! them with [`SseDecoder`] and yields typed [`StreamEvent`]s:
//!
//! ```text
//! message_start
//! content_block_start  {index, content_block: {type: "tool_use", name, ...}}
//! content_block_delta  {index, delta: {type: "input_json_delta", partial_json}}
//! ...
//! content_block_stop   {index}
//! message_delta        {delta: {stop_reason}}
//! message_stop
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::config::ModelConfig;
use crate::http::send_with_retry;
use crate::sse::SseDecoder;

pub const API_VERSION: &str = "2023-06-01";

// ============ Request ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    Any,
    Tool { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThinkingConfig {
    Enabled { budget_tokens: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl MessagesRequest {
    pub fn new(
        model: impl Into<String>,
        max_tokens: u32,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system: system.into(),
            messages: vec![Message::user(user)],
            tools: None,
            tool_choice: None,
            thinking: None,
            stream: false,
        }
    }

    pub fn with_tools(mut self, tools: serde_json::Value) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Force the model to call `name`.
    pub fn force_tool(mut self, name: &str) -> Self {
        self.tool_choice = Some(ToolChoice::Tool {
            name: name.to_string(),
        });
        self
    }

    /// Enable extended thinking.
    ///
    /// The API rejects forced tool use while thinking, so this also resets
    /// `tool_choice` to `auto`.
    pub fn with_thinking(mut self, budget_tokens: u32) -> Self {
        self.thinking = Some(ThinkingConfig::Enabled { budget_tokens });
        self.tool_choice = Some(ToolChoice::Auto);
        self
    }
}

// ============ Response ============

/// A content block in a response, or the header of a streamed block.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    /// Input of the first `tool_use` block calling `name`.
    pub fn tool_input(&self, name: &str) -> Option<&serde_json::Value> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::ToolUse {
                name: tool, input, ..
            } if tool == name => Some(input),
            _ => None,
        })
    }
}

/// Incremental payload of a `content_block_delta` event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    InputJsonDelta { partial_json: String },
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// One event of a streaming response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart {
        #[serde(default)]
        message: serde_json::Value,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaBody,
    },
    MessageStop,
    Ping,
    Error {
        error: ApiError,
    },
    #[serde(other)]
    Unknown,
}

// ============ Client ============

pub struct MessagesClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    max_retries: u32,
}

impl MessagesClient {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key: api_key.into(),
            max_retries,
        })
    }

    /// Build a client from `[model]`, reading `ANTHROPIC_API_KEY`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;
        Self::new(
            config.api_url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    async fn send(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        send_with_retry("Anthropic", self.max_retries, || {
            self.client
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(request)
        })
        .await
    }

    /// Send a request and wait for the complete response.
    pub async fn create(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let mut request = request.clone();
        request.stream = false;
        let response = self.send(&request).await?;
        response
            .json()
            .await
            .context("Failed to decode Messages API response")
    }

    /// Send a request with `"stream": true`.
    ///
    /// Retries apply only until the response headers arrive; a stream that
    /// fails midway is reported through [`MessageStream::next`].
    pub async fn stream(&self, request: &MessagesRequest) -> Result<MessageStream> {
        let mut request = request.clone();
        request.stream = true;
        let response = self.send(&request).await?;
        Ok(MessageStream::new(response))
    }
}

/// Typed events of an in-flight streaming response.
pub struct MessageStream {
    response: reqwest::Response,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    finished: bool,
}

impl MessageStream {
    fn new(response: reqwest::Response) -> Self {
        Self {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Next event, or `None` once the body is exhausted.
    pub async fn next(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }
            match self.response.chunk().await? {
                Some(bytes) => {
                    for frame in self.decoder.push(&bytes) {
                        self.pending.push_back(parse_event(&frame.data)?);
                    }
                }
                None => {
                    self.finished = true;
                    if let Some(frame) = self.decoder.finish() {
                        self.pending.push_back(parse_event(&frame.data)?);
                    }
                }
            }
        }
    }
}

/// Decode the JSON payload of one SSE frame.
pub fn parse_event(data: &str) -> Result<StreamEvent> {
    match serde_json::from_str(data) {
        Ok(event) => Ok(event),
        Err(e) => bail!("Malformed stream event ({}): {}", e, data),
    }
}
