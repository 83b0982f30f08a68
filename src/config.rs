//! Process configuration and prompt templates.
//!
//! `AppConfig` is resolved once at startup from the environment and passed by
//! reference afterwards. Prompts have built-in defaults and can be overridden
//! from a TOML file (see `PromptsFile`).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

/// Checked in order; the first non-empty value wins.
pub const API_KEY_VARS: [&str; 4] = ["MODEL_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY", "OPENAI_API_KEY"];

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
  pub port: u16,
  pub body_limit_bytes: usize,
  pub prompts_path: Option<String>,
  pub model: ModelConfig,
}

#[derive(Clone)]
pub struct ModelConfig {
  pub api_key: Option<String>,
  pub base_url: String,
  pub model: String,
  pub vision_model: String,
  pub timeout: Duration,
  pub max_retries: u32,
  pub retry_backoff: Duration,
}

// Never print the key.
impl fmt::Debug for ModelConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ModelConfig")
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("vision_model", &self.vision_model)
      .field("timeout", &self.timeout)
      .field("max_retries", &self.max_retries)
      .field("retry_backoff", &self.retry_backoff)
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  /// Build from any key lookup; blank values count as unset.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let parsed = |key: &str| get(key).and_then(|v| v.parse::<u64>().ok());

    let api_key = API_KEY_VARS.iter().find_map(|k| get(*k));
    let model = get("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL.into());
    let vision_model = get("MODEL_VISION_NAME").unwrap_or_else(|| model.clone());

    Self {
      port: get("PORT").and_then(|p| p.parse::<u16>().ok()).unwrap_or(DEFAULT_PORT),
      body_limit_bytes: parsed("BODY_LIMIT_BYTES").map(|n| n as usize).unwrap_or(DEFAULT_BODY_LIMIT),
      prompts_path: get("PROMPTS_CONFIG_PATH"),
      model: ModelConfig {
        api_key,
        base_url: get("MODEL_BASE_URL")
          .map(|u| u.trim_end_matches('/').to_string())
          .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
        model,
        vision_model,
        timeout: Duration::from_secs(parsed("MODEL_TIMEOUT_SECS").filter(|s| *s > 0).unwrap_or(DEFAULT_TIMEOUT_SECS)),
        max_retries: parsed("MODEL_MAX_RETRIES").map(|n| n.min(5) as u32).unwrap_or(0),
        retry_backoff: Duration::from_millis(parsed("MODEL_RETRY_BACKOFF_MS").unwrap_or(DEFAULT_RETRY_BACKOFF_MS)),
      },
    }
  }
}

/// TOML file layout: a single `[prompts]` table, every key optional.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsFile {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates handed to the model. Placeholders use `{name}` syntax.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub exercises_system: String,
  pub exercises_user_template: String,
  pub single_level_user_template: String,
  pub practice_system: String,
  pub practice_user_template: String,
  pub spelling_system: String,
  pub spelling_user_template: String,
  pub visual_system: String,
  pub visual_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      exercises_system: "Eres un maestro de matemáticas para niños de primaria. Respondes SOLO con JSON estricto.".into(),
      exercises_user_template: "Genera 5 ejercicios de matemáticas sobre '{topic}' con nivel de dificultad '{level}'. Devuelve JSON: {\"exercises\": [{\"problem\": string, \"answer\": string, \"hint\": string}]}. Las respuestas deben ser cortas (un número o una fracción) y exactas.".into(),
      single_level_user_template: "Genera 3 ejemplos resueltos de '{topic}' SOLO para el nivel '{level}'. Instrucciones adicionales: {custom_instructions}. Devuelve JSON: {\"exercises\": [{\"problem\": string, \"answer\": string, \"hint\": string}]}.".into(),
      practice_system: "Eres un tutor de matemáticas amable para niños. Respondes SOLO con JSON estricto.".into(),
      practice_user_template: "Prepara una sesión de práctica para la tarjeta: {card_json}. Genera exactamente {count} ejercicios. Devuelve JSON: {\"introduction\": string, \"exercises\": [{\"problem\": string, \"answer\": string, \"hint\": string}], \"tips\": [string]}.".into(),
      spelling_system: "Corriges la ortografía de textos escritos por niños. No cambies el significado ni los números. Respondes SOLO con JSON.".into(),
      spelling_user_template: "Texto: {text}\nDevuelve JSON: {\"corrected\": string}.".into(),
      visual_system: "Eres un maestro de matemáticas. Lees el problema de la imagen y lo resuelves paso a paso para un niño. Respondes SOLO con JSON.".into(),
      visual_user_template: "Resuelve el problema de matemáticas de la foto. Devuelve JSON: {\"problem\": string, \"steps\": [string], \"answer\": string}.".into(),
    }
  }
}

/// Load prompt overrides from `path`. Any IO/parse error falls back to defaults.
pub fn load_prompts(path: Option<&str>) -> Prompts {
  let Some(path) = path else { return Prompts::default() };
  match std::fs::read_to_string(path) {
    Ok(s) => match toml::from_str::<PromptsFile>(&s) {
      Ok(file) => {
        info!(target: "mathpractice_backend", %path, "Loaded prompt overrides (TOML)");
        file.prompts
      }
      Err(e) => {
        error!(target: "mathpractice_backend", %path, error = %e, "Failed to parse prompts TOML; using defaults");
        Prompts::default()
      }
    },
    Err(e) => {
      error!(target: "mathpractice_backend", %path, error = %e, "Failed to read prompts file; using defaults");
      Prompts::default()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |k| map.get(k).cloned()
  }

  #[test]
  fn defaults_without_environment() {
    let cfg = AppConfig::from_lookup(lookup(&[]));
    assert_eq!(cfg.port, 3000);
    assert!(cfg.model.api_key.is_none());
    assert_eq!(cfg.model.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.model.vision_model, DEFAULT_MODEL);
    assert_eq!(cfg.model.timeout, Duration::from_secs(30));
    assert_eq!(cfg.model.max_retries, 0);
  }

  #[test]
  fn api_key_follows_fallback_order_and_skips_blanks() {
    let cfg = AppConfig::from_lookup(lookup(&[
      ("MODEL_API_KEY", "   "),
      ("GOOGLE_API_KEY", "google"),
      ("OPENAI_API_KEY", "openai"),
    ]));
    assert_eq!(cfg.model.api_key.as_deref(), Some("google"));
  }

  #[test]
  fn numeric_settings_are_parsed_and_bounded() {
    let cfg = AppConfig::from_lookup(lookup(&[
      ("PORT", "8081"),
      ("MODEL_TIMEOUT_SECS", "0"),
      ("MODEL_MAX_RETRIES", "42"),
      ("MODEL_BASE_URL", "http://localhost:9000/v1/"),
      ("MODEL_NAME", "tiny"),
    ]));
    assert_eq!(cfg.port, 8081);
    assert_eq!(cfg.model.timeout, Duration::from_secs(30));
    assert_eq!(cfg.model.max_retries, 5);
    assert_eq!(cfg.model.base_url, "http://localhost:9000/v1");
    assert_eq!(cfg.model.vision_model, "tiny");
  }

  #[test]
  fn debug_output_redacts_key() {
    let cfg = AppConfig::from_lookup(lookup(&[("MODEL_API_KEY", "sk-very-secret")]));
    let printed = format!("{:?}", cfg);
    assert!(!printed.contains("sk-very-secret"));
    assert!(printed.contains("<redacted>"));
  }

  #[test]
  fn partial_toml_overrides_keep_other_defaults() {
    let file: PromptsFile = toml::from_str("[prompts]\nspelling_system = \"custom\"\n").unwrap();
    assert_eq!(file.prompts.spelling_system, "custom");
    assert_eq!(file.prompts.visual_system, Prompts::default().visual_system);
  }

  #[test]
  fn missing_prompts_file_falls_back_to_defaults() {
    let p = load_prompts(Some("/definitely/not/here.toml"));
    assert_eq!(p.exercises_system, Prompts::default().exercises_system);
  }
}
