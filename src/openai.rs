//! Minimal OpenAI-compatible chat.completions client (works with Gemini's
//! OpenAI endpoint by default).
//!
//! Requests always ask for a JSON object. Photos go in as `image_url` parts
//! carrying the data URI. Calls are instrumented and log model names and
//! response sizes, not contents.
//!
//! NOTE: We never log the API key.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ModelConfig;
use crate::error::GatewayError;
use crate::gateway::ModelClient;
use crate::task::ModelTask;
use crate::util::trunc_for_log;

#[derive(Clone)]
pub struct OpenAiClient {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub vision_model: String,
  timeout: std::time::Duration,
}

impl OpenAiClient {
  /// Build from config; `None` when no API key is configured.
  pub fn from_config(cfg: &ModelConfig) -> Result<Option<Self>, reqwest::Error> {
    let Some(api_key) = cfg.api_key.clone() else { return Ok(None) };
    let client = reqwest::Client::builder()
      .timeout(cfg.timeout)
      .build()?;
    Ok(Some(Self {
      client,
      api_key,
      base_url: cfg.base_url.clone(),
      model: cfg.model.clone(),
      vision_model: cfg.vision_model.clone(),
      timeout: cfg.timeout,
    }))
  }

  fn build_request(&self, task: &ModelTask) -> ChatCompletionRequest {
    let user_content = match &task.image {
      Some(image) => MessageContent::Parts(vec![
        ContentPart::Text { text: task.user.clone() },
        ContentPart::ImageUrl { image_url: ImageUrl { url: image.data_uri() } },
      ]),
      None => MessageContent::Text(task.user.clone()),
    };
    let model = if task.image.is_some() { &self.vision_model } else { &self.model };

    ChatCompletionRequest {
      model: model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: MessageContent::Text(task.system.clone()) },
        ChatMessageReq { role: "user".into(), content: user_content },
      ],
      temperature: task.temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    }
  }
}

#[async_trait]
impl ModelClient for OpenAiClient {
  #[instrument(level = "info", skip_all, fields(operation = %task.operation, model = %self.model))]
  async fn complete(&self, task: &ModelTask) -> Result<String, GatewayError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = self.build_request(task);

    let res = self.client.post(&url)
      .header(USER_AGENT, "mathpractice-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req)
      .send()
      .await
      .map_err(|e| self.transport_error(e))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GatewayError::Network(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| GatewayError::MalformedOutput(format!("unexpected completion body: {}", e)))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }

    let choice = body
      .choices
      .into_iter()
      .next()
      .ok_or_else(|| GatewayError::MalformedOutput("completion has no choices".into()))?;

    if let Some(refusal) = choice.message.refusal.filter(|r| !r.trim().is_empty()) {
      return Err(GatewayError::Refusal(refusal));
    }
    if choice.finish_reason.as_deref() == Some("content_filter") {
      return Err(GatewayError::Refusal("content filtered".into()));
    }

    let text = choice.message.content.unwrap_or_default().trim().to_string();
    if text.is_empty() {
      return Err(GatewayError::MalformedOutput("empty completion".into()));
    }
    debug!(reply_len = text.len(), "Model reply received");
    Ok(text)
  }
}

impl OpenAiClient {
  fn transport_error(&self, e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
      GatewayError::Timeout(self.timeout)
    } else {
      GatewayError::Network(e.to_string())
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: MessageContent }
#[derive(Serialize)]
#[serde(untagged)]
enum MessageContent {
  Text(String),
  Parts(Vec<ContentPart>),
}
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  Text { text: String },
  ImageUrl { image_url: ImageUrl },
}
#[derive(Serialize)]
struct ImageUrl { url: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice {
  message: ChatMessageResp,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct ChatMessageResp {
  #[serde(default)] content: Option<String>,
  #[serde(default)] refusal: Option<String>,
}
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
