//! Application state: configuration, prompts, and the optional model gateway.
//!
//! Built once at startup and shared read-only across requests. Nothing in
//! here is mutated after construction.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{load_prompts, AppConfig, Prompts};
use crate::gateway::ModelGateway;
use crate::openai::OpenAiClient;

pub struct AppState {
    pub config: AppConfig,
    pub prompts: Prompts,
    /// `None` when no API key is configured; generation then uses local content.
    pub gateway: Option<ModelGateway>,
}

impl AppState {
    /// Build state from config: load prompt overrides and init the model client.
    #[instrument(level = "info", skip_all)]
    pub fn from_config(config: AppConfig) -> Result<Self, reqwest::Error> {
        let prompts = load_prompts(config.prompts_path.as_deref());

        let gateway = match OpenAiClient::from_config(&config.model)? {
            Some(client) => {
                info!(
                    target: "mathpractice_backend",
                    base_url = %client.base_url,
                    model = %client.model,
                    vision_model = %client.vision_model,
                    timeout = ?config.model.timeout,
                    max_retries = config.model.max_retries,
                    "Model gateway enabled."
                );
                Some(ModelGateway::from_config(Arc::new(client), &config.model))
            }
            None => {
                warn!(target: "mathpractice_backend", "No model API key set. Generation uses local content; photo solving is disabled.");
                None
            }
        };

        Ok(Self { config, prompts, gateway })
    }

    /// Assemble state from parts (used by tests and embedding callers).
    pub fn with_gateway(config: AppConfig, prompts: Prompts, gateway: Option<ModelGateway>) -> Self {
        Self { config, prompts, gateway }
    }
}
