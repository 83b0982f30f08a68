//! Model gateway: the single place that talks to the generative model.
//!
//! `ModelClient` is the provider seam (see `openai.rs`); `ModelGateway` wraps a
//! client with the timeout bound, the optional retry policy, and strict
//! decoding of the structured reply. Anything that fails to decode or fails
//! the payload's own `check` is reported as `MalformedOutput`, never returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::config::ModelConfig;
use crate::error::GatewayError;
use crate::task::ModelTask;

/// Provider boundary: one task in, raw completion text out.
#[async_trait]
pub trait ModelClient: Send + Sync {
  async fn complete(&self, task: &ModelTask) -> Result<String, GatewayError>;
}

/// A payload the model is asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned {
  /// Shape checks serde cannot express (non-empty lists, non-blank answers).
  fn check(&self) -> Result<(), String> {
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_retries: u32,
  pub base_backoff: Duration,
}

impl RetryPolicy {
  /// One attempt per request.
  pub fn none() -> Self {
    Self { max_retries: 0, base_backoff: Duration::ZERO }
  }

  /// Exponential: base, 2×base, 4×base, ...
  pub fn backoff(&self, retry: u32) -> Duration {
    self.base_backoff.saturating_mul(2u32.saturating_pow(retry))
  }
}

#[derive(Clone)]
pub struct ModelGateway {
  client: Arc<dyn ModelClient>,
  timeout: Duration,
  retry: RetryPolicy,
}

impl ModelGateway {
  pub fn new(client: Arc<dyn ModelClient>, timeout: Duration, retry: RetryPolicy) -> Self {
    Self { client, timeout, retry }
  }

  pub fn from_config(client: Arc<dyn ModelClient>, cfg: &ModelConfig) -> Self {
    let retry = RetryPolicy { max_retries: cfg.max_retries, base_backoff: cfg.retry_backoff };
    Self::new(client, cfg.timeout, retry)
  }

  /// Run `task` and decode the reply into `T`.
  #[instrument(level = "info", name = "model_call", skip_all, fields(operation = %task.operation, has_image = task.image.is_some()))]
  pub async fn run<T: StructuredOutput>(&self, task: &ModelTask) -> Result<T, GatewayError> {
    let mut retry = 0;
    loop {
      let start = Instant::now();
      let outcome = match self.attempt(task).await {
        Ok(raw) => decode::<T>(&raw),
        Err(e) => Err(e),
      };
      let elapsed = start.elapsed();

      match outcome {
        Ok(value) => {
          info!(target: "gateway", ?elapsed, retry, "Model call succeeded");
          return Ok(value);
        }
        Err(e) if e.is_transient() && retry < self.retry.max_retries => {
          let wait = self.retry.backoff(retry);
          warn!(target: "gateway", ?elapsed, retry, ?wait, kind = e.kind(), error = %e, "Model call failed; retrying");
          tokio::time::sleep(wait).await;
          retry += 1;
        }
        Err(e) => {
          warn!(target: "gateway", ?elapsed, retry, kind = e.kind(), error = %e, "Model call failed");
          return Err(e);
        }
      }
    }
  }

  async fn attempt(&self, task: &ModelTask) -> Result<String, GatewayError> {
    match tokio::time::timeout(self.timeout, self.client.complete(task)).await {
      Ok(result) => result,
      Err(_) => Err(GatewayError::Timeout(self.timeout)),
    }
  }
}

/// Strict decode of a model reply. Tolerates a surrounding ```json fence.
pub fn decode<T: StructuredOutput>(raw: &str) -> Result<T, GatewayError> {
  let json = strip_code_fence(raw);
  let value: T = serde_json::from_str(json).map_err(|e| GatewayError::MalformedOutput(format!("JSON parse error: {}", e)))?;
  value.check().map_err(GatewayError::MalformedOutput)?;
  Ok(value)
}

fn strip_code_fence(raw: &str) -> &str {
  let s = raw.trim();
  let Some(rest) = s.strip_prefix("```") else { return s };
  let rest = rest.strip_prefix("json").unwrap_or(rest);
  rest.strip_suffix("```").unwrap_or(rest).trim()
}
